use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::GatewayResult;

/// Verified identity for an inbound request. Injected by the auth
/// middleware; no handler runs a saga step without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthContext {
    pub user_id: String,
    pub username: String,
}

/// Traveler profile held by the user service. Supplies the real
/// financial/criminal-history answers a visa submission needs instead of
/// fabricated defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerProfile {
    pub user_id: String,
    pub full_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passport: Option<String>,
    pub bank_balance: i64,
    pub criminal_history: bool,
}

/// External auth/user service. Token verification is mandatory for every
/// protected route; there is no fixed-identity substitute.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verify a bearer token, returning the identity it belongs to.
    async fn verify_token(&self, token: &str) -> GatewayResult<AuthContext>;

    /// Fetch the traveler profile backing visa submissions.
    async fn fetch_profile(&self, user_id: &str) -> GatewayResult<TravelerProfile>;

    /// Single-hop forwarding of account registration.
    async fn register(&self, body: Value) -> GatewayResult<Value>;

    /// Single-hop forwarding of login / token issuance.
    async fn login(&self, body: Value) -> GatewayResult<Value>;
}
