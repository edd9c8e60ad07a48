use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::GatewayError;

/// Visa requirement for a destination country, as reported by the visa
/// service. Read-only from the gateway's point of view.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaRequirement {
    pub country: String,
    pub requires_visa: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visa_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_days: Option<u32>,
}

/// Lifecycle of a visa application inside the visa service.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

/// A visa application owned by the visa service. The gateway only reads
/// these and, when the matcher finds nothing to reuse, creates one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaApplication {
    pub id: Uuid,
    pub user_id: String,
    pub country: String,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
}

/// Visa state carried on a booking record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BookingVisaStatus {
    None,
    Pending,
    Approved,
}

impl BookingVisaStatus {
    /// Booking-side view of a non-rejected application status. Rejected
    /// applications never reach a booking; the saga aborts first.
    pub fn from_application(status: ApplicationStatus) -> Option<Self> {
        match status {
            ApplicationStatus::Pending => Some(BookingVisaStatus::Pending),
            ApplicationStatus::Approved => Some(BookingVisaStatus::Approved),
            ApplicationStatus::Rejected => None,
        }
    }
}

/// A booking owned by the booking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub user_id: String,
    pub flight_id: String,
    pub destination: String,
    pub visa_application_id: Option<Uuid>,
    pub visa_status: BookingVisaStatus,
    pub created_at: DateTime<Utc>,
}

/// Payload sent to the booking service once the visa phase has resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingPayload {
    pub user_id: String,
    pub flight_id: String,
    pub destination: String,
    pub visa_application_id: Option<Uuid>,
    pub visa_status: BookingVisaStatus,
}

/// Inbound booking request body. Validated at the boundary before any
/// saga step runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub flight_id: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport: Option<String>,
}

impl BookingRequest {
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.destination.trim().is_empty() {
            return Err(GatewayError::ValidationError(
                "destination must not be empty".to_string(),
            ));
        }
        if self.flight_id.trim().is_empty() {
            return Err(GatewayError::ValidationError(
                "flightId must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Answer shape for the visa-status aggregator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingVisaReport {
    /// The booking's destination required no visa.
    NotRequired {
        #[serde(rename = "requiresVisa")]
        requires_visa: bool,
    },
    /// The linked application's status, verbatim from the visa service.
    Application(VisaApplication),
}

impl BookingVisaReport {
    pub fn not_required() -> Self {
        BookingVisaReport::NotRequired {
            requires_visa: false,
        }
    }
}
