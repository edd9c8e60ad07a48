use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use concourse_core::gateway::FlightSearchGateway;
use concourse_core::GatewayResult;

use crate::http::{read_json, transport_error, trim_base_url};
use crate::retry::RetryPolicy;

const SERVICE: &str = "flight search service";

/// HTTP client for the flight-search service. Single-hop forwarding; the
/// result set passes through untouched.
pub struct HttpFlightSearchGateway {
    client: reqwest::Client,
    base_url: String,
    deadline: Duration,
    retry: RetryPolicy,
}

impl HttpFlightSearchGateway {
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
impl FlightSearchGateway for HttpFlightSearchGateway {
    async fn search(&self, origin: &str, destination: &str, date: &str) -> GatewayResult<Value> {
        let url = format!("{}/api/v1/flights/search", self.base_url);
        let url = url.as_str();
        self.retry
            .run("flights.search", || async move {
                let response = self
                    .client
                    .get(url)
                    .query(&[
                        ("origin", origin),
                        ("destination", destination),
                        ("date", date),
                        ("passengers", "1"),
                        ("cabinClass", "ECONOMY"),
                    ])
                    .timeout(self.deadline)
                    .send()
                    .await
                    .map_err(|e| transport_error(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await
    }
}
