use std::sync::Arc;

use uuid::Uuid;

use concourse_core::gateway::{BookingGateway, VisaGateway};
use concourse_core::identity::AuthContext;
use concourse_core::models::BookingVisaReport;
use concourse_core::{GatewayError, GatewayResult};

/// Read path answering "what is the visa state of booking X", with the
/// ownership check before anything about the booking can leak.
pub struct VisaStatusAggregator {
    visa: Arc<dyn VisaGateway>,
    booking: Arc<dyn BookingGateway>,
}

impl VisaStatusAggregator {
    pub fn new(visa: Arc<dyn VisaGateway>, booking: Arc<dyn BookingGateway>) -> Self {
        Self { visa, booking }
    }

    pub async fn get_status(
        &self,
        booking_id: Uuid,
        requester: &AuthContext,
    ) -> GatewayResult<BookingVisaReport> {
        let booking = self.booking.get_booking(booking_id).await?;

        // Non-owners learn nothing, including "no visa required".
        if booking.user_id != requester.user_id {
            return Err(GatewayError::AuthorizationDenied(
                "booking does not belong to the requesting user".to_string(),
            ));
        }

        match booking.visa_application_id {
            None => Ok(BookingVisaReport::not_required()),
            Some(application_id) => {
                // Downstream failure surfaces as-is; it is never converted
                // into a fabricated "no visa required".
                let application = self.visa.get_application(application_id).await?;
                Ok(BookingVisaReport::Application(application))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use concourse_core::gateway::VisaApplicationDetails;
    use concourse_core::models::{
        ApplicationStatus, Booking, BookingPayload, BookingVisaStatus, VisaApplication,
        VisaRequirement,
    };

    struct FixtureBookingGateway {
        booking: Option<Booking>,
    }

    #[async_trait]
    impl BookingGateway for FixtureBookingGateway {
        async fn create_booking(
            &self,
            _payload: &BookingPayload,
            _idempotency_key: &str,
        ) -> GatewayResult<Booking> {
            unimplemented!("not used by the aggregator")
        }

        async fn get_booking(&self, id: Uuid) -> GatewayResult<Booking> {
            self.booking
                .clone()
                .filter(|b| b.id == id)
                .ok_or_else(|| GatewayError::NotFound(format!("booking {}", id)))
        }
    }

    struct FixtureVisaGateway {
        application: GatewayResult<VisaApplication>,
    }

    #[async_trait]
    impl VisaGateway for FixtureVisaGateway {
        async fn check_requirement(&self, _country: &str) -> GatewayResult<VisaRequirement> {
            unimplemented!("not used by the aggregator")
        }

        async fn list_applications(&self, _user_id: &str) -> GatewayResult<Vec<VisaApplication>> {
            unimplemented!("not used by the aggregator")
        }

        async fn submit_application(
            &self,
            _user_id: &str,
            _country: &str,
            _idempotency_key: &str,
            _details: &VisaApplicationDetails,
        ) -> GatewayResult<VisaApplication> {
            unimplemented!("not used by the aggregator")
        }

        async fn get_application(&self, _id: Uuid) -> GatewayResult<VisaApplication> {
            self.application.clone()
        }
    }

    fn owner() -> AuthContext {
        AuthContext {
            user_id: "owner@example.com".to_string(),
            username: "owner".to_string(),
        }
    }

    fn stranger() -> AuthContext {
        AuthContext {
            user_id: "stranger@example.com".to_string(),
            username: "stranger".to_string(),
        }
    }

    fn booking(visa_application_id: Option<Uuid>) -> Booking {
        Booking {
            id: Uuid::new_v4(),
            user_id: owner().user_id,
            flight_id: "FL-100".to_string(),
            destination: "US".to_string(),
            visa_application_id,
            visa_status: if visa_application_id.is_some() {
                BookingVisaStatus::Pending
            } else {
                BookingVisaStatus::None
            },
            created_at: Utc::now(),
        }
    }

    fn application(id: Uuid) -> VisaApplication {
        VisaApplication {
            id,
            user_id: owner().user_id,
            country: "US".to_string(),
            status: ApplicationStatus::Pending,
            submitted_at: Utc::now(),
        }
    }

    fn aggregator(
        booking: Option<Booking>,
        application: GatewayResult<VisaApplication>,
    ) -> VisaStatusAggregator {
        VisaStatusAggregator::new(
            Arc::new(FixtureVisaGateway { application }),
            Arc::new(FixtureBookingGateway { booking }),
        )
    }

    #[tokio::test]
    async fn missing_booking_is_not_found() {
        let agg = aggregator(None, Err(GatewayError::NotFound("unused".to_string())));
        let err = agg.get_status(Uuid::new_v4(), &owner()).await.unwrap_err();
        assert!(matches!(err, GatewayError::NotFound(_)));
    }

    #[tokio::test]
    async fn non_owner_is_denied_regardless_of_visa_state() {
        let fixture = booking(None);
        let id = fixture.id;
        let agg = aggregator(Some(fixture), Err(GatewayError::NotFound("unused".to_string())));

        let err = agg.get_status(id, &stranger()).await.unwrap_err();
        assert!(matches!(err, GatewayError::AuthorizationDenied(_)));
    }

    #[tokio::test]
    async fn visa_less_booking_reports_not_required() {
        let fixture = booking(None);
        let id = fixture.id;
        let agg = aggregator(Some(fixture), Err(GatewayError::NotFound("unused".to_string())));

        let report = agg.get_status(id, &owner()).await.unwrap();
        assert!(matches!(
            report,
            BookingVisaReport::NotRequired {
                requires_visa: false
            }
        ));
    }

    #[tokio::test]
    async fn linked_application_status_is_returned_verbatim() {
        let application_id = Uuid::new_v4();
        let fixture = booking(Some(application_id));
        let id = fixture.id;
        let agg = aggregator(Some(fixture), Ok(application(application_id)));

        let report = agg.get_status(id, &owner()).await.unwrap();
        match report {
            BookingVisaReport::Application(app) => {
                assert_eq!(app.id, application_id);
                assert_eq!(app.status, ApplicationStatus::Pending);
            }
            other => panic!("expected application report, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn visa_service_outage_is_not_masked_as_no_visa() {
        let application_id = Uuid::new_v4();
        let fixture = booking(Some(application_id));
        let id = fixture.id;
        let agg = aggregator(
            Some(fixture),
            Err(GatewayError::DownstreamUnavailable(
                "visa service timed out".to_string(),
            )),
        );

        let err = agg.get_status(id, &owner()).await.unwrap_err();
        assert!(matches!(err, GatewayError::DownstreamUnavailable(_)));
    }
}
