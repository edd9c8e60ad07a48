use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use concourse_core::gateway::{VisaApplicationDetails, VisaGateway};
use concourse_core::models::{VisaApplication, VisaRequirement};
use concourse_core::GatewayResult;

use crate::http::{read_json, transport_error, trim_base_url};
use crate::retry::RetryPolicy;

const SERVICE: &str = "visa service";

/// HTTP client for the visa service.
pub struct HttpVisaGateway {
    client: reqwest::Client,
    base_url: String,
    deadline: Duration,
    retry: RetryPolicy,
}

impl HttpVisaGateway {
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
impl VisaGateway for HttpVisaGateway {
    async fn check_requirement(&self, country: &str) -> GatewayResult<VisaRequirement> {
        let url = format!("{}/check-requirements", self.base_url);
        let url = url.as_str();
        self.retry
            .run("visa.check_requirement", || async move {
                let response = self
                    .client
                    .get(url)
                    .query(&[("country", country)])
                    .timeout(self.deadline)
                    .send()
                    .await
                    .map_err(|e| transport_error(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await
    }

    async fn list_applications(&self, user_id: &str) -> GatewayResult<Vec<VisaApplication>> {
        let url = format!("{}/my-applications/{}", self.base_url, user_id);
        let url = url.as_str();
        self.retry
            .run("visa.list_applications", || async move {
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

    async fn submit_application(
        &self,
        user_id: &str,
        country: &str,
        idempotency_key: &str,
        details: &VisaApplicationDetails,
    ) -> GatewayResult<VisaApplication> {
        let url = format!("{}/apply", self.base_url);
        let body = json!({
            "userId": user_id,
            "country": country,
            "name": details.name,
            "passport": details.passport,
            "bankBalance": details.bank_balance,
            "criminalHistory": details.criminal_history,
        });

        // Safe to retry: the visa service deduplicates on the key.
        let url = url.as_str();
        let body = &body;
        self.retry
            .run("visa.submit_application", || async move {
                let response = self
                    .client
                    .post(url)
                    .header("Idempotency-Key", idempotency_key)
                    .json(body)
                    .timeout(self.deadline)
                    .send()
                    .await
                    .map_err(|e| transport_error(SERVICE, e))?;
                read_json(SERVICE, response).await
            })
            .await
    }

    async fn get_application(&self, id: Uuid) -> GatewayResult<VisaApplication> {
        let url = format!("{}/applications/{}", self.base_url, id);
        let url = url.as_str();
        self.retry
            .run("visa.get_application", || async move {
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
