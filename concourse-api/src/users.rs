use axum::{extract::State, routing::post, Json, Router};
use serde_json::Value;

use crate::error::AppError;
use crate::state::AppState;

/// Public account routes, forwarded to the auth/user service unchanged.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.auth.register(body).await?))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, AppError> {
    Ok(Json(state.auth.login(body).await?))
}
