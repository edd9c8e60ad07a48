use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{Booking, BookingPayload, VisaApplication, VisaRequirement};
use crate::GatewayResult;

/// Details accompanying a visa submission. Sourced from the traveler's
/// profile, never from hard-coded defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisaApplicationDetails {
    pub name: String,
    pub passport: String,
    pub bank_balance: i64,
    pub criminal_history: bool,
}

/// Typed client for the visa service.
///
/// `submit_application` must always carry the idempotency key: the visa
/// service deduplicates on it, so presenting the same key twice yields the
/// same application instead of a duplicate.
#[async_trait]
pub trait VisaGateway: Send + Sync {
    async fn check_requirement(&self, country: &str) -> GatewayResult<VisaRequirement>;

    async fn list_applications(&self, user_id: &str) -> GatewayResult<Vec<VisaApplication>>;

    async fn submit_application(
        &self,
        user_id: &str,
        country: &str,
        idempotency_key: &str,
        details: &VisaApplicationDetails,
    ) -> GatewayResult<VisaApplication>;

    async fn get_application(&self, id: Uuid) -> GatewayResult<VisaApplication>;
}

/// Typed client for the booking service. `create_booking` is
/// idempotency-key-safe for the same reason as visa submission.
#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn create_booking(
        &self,
        payload: &BookingPayload,
        idempotency_key: &str,
    ) -> GatewayResult<Booking>;

    async fn get_booking(&self, id: Uuid) -> GatewayResult<Booking>;
}

/// Typed client for the flight-search service. Pure single-hop forwarding;
/// the gateway does not interpret the result set.
#[async_trait]
pub trait FlightSearchGateway: Send + Sync {
    async fn search(&self, origin: &str, destination: &str, date: &str) -> GatewayResult<Value>;
}
