use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use concourse_core::identity::{AuthContext, AuthProvider, TravelerProfile};
use concourse_core::{GatewayError, GatewayResult};

use crate::http::{body_text, read_json, transport_error, trim_base_url};
use crate::retry::RetryPolicy;

const SERVICE: &str = "auth service";

/// HTTP client for the auth/user service. Token verification is remote;
/// the gateway never decodes tokens itself.
pub struct HttpAuthProvider {
    client: reqwest::Client,
    base_url: String,
    deadline: Duration,
    retry: RetryPolicy,
}

impl HttpAuthProvider {
    pub fn new(base_url: &str, deadline: Duration, retry: RetryPolicy) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: trim_base_url(base_url),
            deadline,
            retry,
        }
    }

    /// Single-hop forwarding without retries: these calls create or
    /// authenticate accounts and carry no idempotency key.
    async fn forward(&self, path: &str, body: Value) -> GatewayResult<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .json(&body)
            .timeout(self.deadline)
            .send()
            .await
            .map_err(|e| transport_error(SERVICE, e))?;
        read_json(SERVICE, response).await
    }
}

#[async_trait]
impl AuthProvider for HttpAuthProvider {
    async fn verify_token(&self, token: &str) -> GatewayResult<AuthContext> {
        let url = format!("{}/verify-token", self.base_url);
        let url = url.as_str();
        self.retry
            .run("auth.verify_token", || async move {
                let response = self
                    .client
                    .post(url)
                    .json(&json!({ "token": token }))
                    .timeout(self.deadline)
                    .send()
                    .await
                    .map_err(|e| transport_error(SERVICE, e))?;

                // A 4xx here means the token itself was refused, not that
                // the request was malformed.
                if response.status().is_client_error() {
                    let detail = body_text(response).await;
                    return Err(GatewayError::AuthError(format!(
                        "token rejected: {}",
                        detail
                    )));
                }
                read_json(SERVICE, response).await
            })
            .await
    }

    async fn fetch_profile(&self, user_id: &str) -> GatewayResult<TravelerProfile> {
        let url = format!("{}/profile/{}", self.base_url, user_id);
        let url = url.as_str();
        self.retry
            .run("auth.fetch_profile", || async move {
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

    async fn register(&self, body: Value) -> GatewayResult<Value> {
        self.forward("/register", body).await
    }

    async fn login(&self, body: Value) -> GatewayResult<Value> {
        self.forward("/login", body).await
    }
}
