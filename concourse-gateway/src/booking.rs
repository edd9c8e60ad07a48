use std::time::Duration;

use async_trait::async_trait;
use uuid::Uuid;

use concourse_core::gateway::BookingGateway;
use concourse_core::models::{Booking, BookingPayload};
use concourse_core::GatewayResult;

use crate::http::{read_json, transport_error, trim_base_url};
use crate::retry::RetryPolicy;

const SERVICE: &str = "booking service";

/// HTTP client for the booking service.
pub struct HttpBookingGateway {
    client: reqwest::Client,
    base_url: String,
    deadline: Duration,
    retry: RetryPolicy,
}

impl HttpBookingGateway {
    pub fn new(base_url: &str, deadline: Duration, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_base_url(base_url),
            deadline,
            retry,
        }
    }
}

#[async_trait]
impl BookingGateway for HttpBookingGateway {
    async fn create_booking(
        &self,
        payload: &BookingPayload,
        idempotency_key: &str,
    ) -> GatewayResult<Booking> {
        let url = format!("{}/api/v1/bookings", self.base_url);
        let url = url.as_str();
        // Same key on every attempt; the booking service deduplicates.
        self.retry
            .run("booking.create_booking", || async move {
                let response = self
                    .client
                    .post(url)
                    .header("Idempotency-Key", idempotency_key)
                    .json(payload)
                    .timeout(self.deadline)
                    .send()
                    .await
                    .map_err(|e| transport_error(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await
    }

    async fn get_booking(&self, id: Uuid) -> GatewayResult<Booking> {
        let url = format!("{}/bookings/{}", self.base_url, id);
        let url = url.as_str();
        self.retry
            .run("booking.get_booking", || async move {
                let response = self
                    .client
                    .get(url)
                    .timeout(self.deadline)
                    .send()
                    .await
                    .map_err(|e| transport_error(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await
    }
}
