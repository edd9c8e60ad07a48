use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use concourse_core::GatewayError;

use crate::error::AppError;
use crate::state::AppState;

/// Mandatory authentication for every protected route. The token is
/// verified by the external auth provider on each request; no code path
/// substitutes a fixed identity.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    // 1. Extract token from Authorization header
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| GatewayError::AuthError("missing Authorization header".to_string()))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| GatewayError::AuthError("expected a Bearer token".to_string()))?;

    // 2. Verify remotely and inject the identity into request extensions
    let ctx = state.auth.verify_token(token).await?;
    req.extensions_mut().insert(ctx);

    Ok(next.run(req).await)
}
