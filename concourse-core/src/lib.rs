pub mod gateway;
pub mod identity;
pub mod models;
pub mod saga;

/// Shared error taxonomy for everything the gateway can surface.
///
/// Transport failures (`DownstreamUnavailable`) are the only retriable
/// class; semantic errors carry the upstream detail and are surfaced
/// immediately.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Not authorized: {0}")]
    AuthorizationDenied(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Visa application rejected: {0}")]
    VisaRejected(String),

    #[error("Downstream unavailable: {0}")]
    DownstreamUnavailable(String),

    #[error("Downstream rejected request: {0}")]
    DownstreamRejected(String),

    #[error("Malformed downstream response: {0}")]
    MalformedResponse(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl GatewayError {
    /// Stable machine-readable kind for error responses.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::AuthError(_) => "auth_error",
            GatewayError::AuthorizationDenied(_) => "authorization_denied",
            GatewayError::NotFound(_) => "not_found",
            GatewayError::VisaRejected(_) => "visa_rejected",
            GatewayError::DownstreamUnavailable(_) => "downstream_unavailable",
            GatewayError::DownstreamRejected(_) => "downstream_rejected",
            GatewayError::MalformedResponse(_) => "malformed_response",
            GatewayError::ValidationError(_) => "validation_error",
        }
    }

    /// Whether a repeat of the same call may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(self, GatewayError::DownstreamUnavailable(_))
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;
