use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use concourse_core::GatewayError;
use concourse_saga::SagaError;

#[derive(Debug)]
pub enum AppError {
    Gateway(GatewayError),
    /// A saga with the same idempotency key is in flight; retry later.
    SagaInFlight(String),
    Internal(anyhow::Error),
}

impl AppError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::Gateway(err) => {
                let status = match err {
                    GatewayError::AuthError(_) => StatusCode::UNAUTHORIZED,
                    GatewayError::AuthorizationDenied(_) => StatusCode::FORBIDDEN,
                    GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
                    GatewayError::ValidationError(_) => StatusCode::BAD_REQUEST,
                    GatewayError::VisaRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
                    GatewayError::DownstreamUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    GatewayError::DownstreamRejected(_) | GatewayError::MalformedResponse(_) => {
                        StatusCode::BAD_GATEWAY
                    }
                };
                (status, err.kind())
            }
            AppError::SagaInFlight(_) => (StatusCode::CONFLICT, "saga_in_flight"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let detail = match &self {
            AppError::Gateway(err) => err.to_string(),
            AppError::SagaInFlight(detail) => detail.clone(),
            AppError::Internal(err) => {
                tracing::error!("Internal Server Error: {}", err);
                "Internal Server Error".to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "kind": kind,
                "detail": detail,
            }
        }));

        (status, body).into_response()
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        AppError::Gateway(err)
    }
}

impl From<SagaError> for AppError {
    fn from(err: SagaError) -> Self {
        match err {
            SagaError::Gateway(gateway) => AppError::Gateway(gateway),
            SagaError::InFlight(key) => AppError::SagaInFlight(format!(
                "a booking for this request is already in progress (key {})",
                key
            )),
            SagaError::Record(record) => AppError::Internal(record.into()),
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}
