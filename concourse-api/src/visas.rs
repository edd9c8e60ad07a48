use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;

use concourse_core::gateway::VisaApplicationDetails;
use concourse_core::identity::AuthContext;
use concourse_core::models::VisaApplication;
use concourse_core::GatewayError;

use crate::error::AppError;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/visa/apply", post(apply_visa))
        .route("/visa/status", get(my_applications))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VisaApplyRequest {
    country: String,
    #[serde(default)]
    passport: Option<String>,
}

/// POST /visa/apply — stand-alone visa application for the authenticated
/// user, outside any booking saga. Profile data backs the submission.
async fn apply_visa(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
    headers: HeaderMap,
    Json(request): Json<VisaApplyRequest>,
) -> Result<Json<VisaApplication>, AppError> {
    if request.country.trim().is_empty() {
        return Err(GatewayError::ValidationError("country must not be empty".to_string()).into());
    }

    let idempotency_key = headers
        .get("Idempotency-Key")
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| format!("visa:{}:{}", ctx.user_id, request.country));

    let profile = state.auth.fetch_profile(&ctx.user_id).await?;
    let details = VisaApplicationDetails {
        name: profile.full_name,
        passport: request
            .passport
            .or(profile.passport)
            .unwrap_or_default(),
        bank_balance: profile.bank_balance,
        criminal_history: profile.criminal_history,
    };

    let application = state
        .visa
        .submit_application(&ctx.user_id, &request.country, &idempotency_key, &details)
        .await?;
    Ok(Json(application))
}

/// GET /visa/status — the authenticated user's applications.
async fn my_applications(
    State(state): State<AppState>,
    Extension(ctx): Extension<AuthContext>,
) -> Result<Json<Vec<VisaApplication>>, AppError> {
    let applications = state.visa.list_applications(&ctx.user_id).await?;
    Ok(Json(applications))
}
