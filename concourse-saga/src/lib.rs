pub mod coordinator;
pub mod matcher;
pub mod status;

pub use coordinator::BookingSagaCoordinator;
pub use status::VisaStatusAggregator;

use concourse_core::saga::SagaRecordError;
use concourse_core::GatewayError;

#[derive(Debug, Clone, thiserror::Error)]
pub enum SagaError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Another run with the same idempotency key holds the claim; the
    /// caller should retry later instead of re-running side effects.
    #[error("Booking already in progress for this request: {0}")]
    InFlight(String),

    #[error(transparent)]
    Record(#[from] SagaRecordError),
}
