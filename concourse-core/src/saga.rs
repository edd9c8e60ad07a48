use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::BookingVisaStatus;
use crate::GatewayResult;

/// Idempotency key for one saga run, derived from the requesting user,
/// the destination, and a caller-supplied request id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SagaKey(String);

impl SagaKey {
    /// Derive the key. A missing request id defaults deterministically to
    /// `"{user_id}:{destination}"`, so un-keyed retries of the same
    /// (user, destination) collapse onto one saga.
    ///
    /// Segments are length-prefixed, so a separator inside a user id,
    /// destination, or request id cannot make two distinct tuples collide.
    pub fn derive(user_id: &str, destination: &str, request_id: Option<&str>) -> Self {
        let request_id = match request_id {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => format!("{}:{}", user_id, destination),
        };
        SagaKey(format!(
            "{}#{}:{}#{}:{}#{}",
            user_id.len(),
            user_id,
            destination.len(),
            destination,
            request_id.len(),
            request_id
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SagaKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Saga progress. Transitions move strictly forward; failure is recorded
/// as a terminal outcome on the record, not as a state regression.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SagaState {
    Init,
    VisaChecked,
    /// Destination requires no visa; the visa phase was skipped.
    Skipped,
    /// An approved application was reused.
    Matched,
    /// A new application was submitted this run.
    Submitted,
    BookingCreated,
    Done,
}

impl SagaState {
    fn rank(self) -> u8 {
        match self {
            SagaState::Init => 0,
            SagaState::VisaChecked => 1,
            SagaState::Skipped | SagaState::Matched | SagaState::Submitted => 2,
            SagaState::BookingCreated => 3,
            SagaState::Done => 4,
        }
    }

    /// True once the visa phase is resolved and the booking payload can be
    /// built without further visa-service calls.
    pub fn visa_resolved(self) -> bool {
        self.rank() >= 2
    }
}

/// Terminal result of a saga run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "kind", content = "detail")]
pub enum SagaOutcome {
    Completed,
    /// Non-retriable upstream decision; replayed verbatim for retries.
    AbortedVisaRejected(String),
    /// Downstream gave out after bounded retries. Resumable: a retry of
    /// the identical request id picks up from the recorded state.
    FailedDownstream(String),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SagaRecordError {
    #[error("Invalid saga transition from {from:?} to {to:?}")]
    InvalidTransition { from: SagaState, to: SagaState },
}

/// Core-owned record of one saga run, keyed by idempotency key. Retained
/// after terminal states so retries of the same request id are answered
/// from the record instead of re-running side-effecting steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SagaRecord {
    pub key: SagaKey,
    pub state: SagaState,
    pub visa_application_id: Option<Uuid>,
    pub visa_status: Option<BookingVisaStatus>,
    pub booking_id: Option<Uuid>,
    pub outcome: Option<SagaOutcome>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SagaRecord {
    pub fn new(key: SagaKey) -> Self {
        let now = Utc::now();
        Self {
            key,
            state: SagaState::Init,
            visa_application_id: None,
            visa_status: None,
            booking_id: None,
            outcome: None,
            started_at: now,
            updated_at: now,
        }
    }

    /// Advance to a later state. Regressions and same-rank sidesteps are
    /// rejected; a record never moves backwards once advanced.
    pub fn advance(&mut self, to: SagaState) -> Result<(), SagaRecordError> {
        if to.rank() <= self.state.rank() {
            return Err(SagaRecordError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        self.state = to;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn finish(&mut self, outcome: SagaOutcome) {
        self.outcome = Some(outcome);
        self.updated_at = Utc::now();
    }
}

/// Result of the atomic check-then-set on a saga key.
#[derive(Debug)]
pub enum BeginOutcome {
    /// This caller owns the run. For a fresh key the record is at `Init`;
    /// for a resumable downstream failure it carries the prior progress.
    Begun(SagaRecord),
    /// Another run with the same key is in flight; retry later.
    InFlight,
    /// The saga already reached a non-resumable terminal outcome.
    Finished(SagaRecord),
}

/// Store for saga records. `begin` must be atomic on the key so two
/// identical concurrent retries cannot both own a run.
#[async_trait]
pub trait SagaStore: Send + Sync {
    async fn begin(&self, key: &SagaKey) -> GatewayResult<BeginOutcome>;

    /// Persist forward progress for an owned run.
    async fn update(&self, record: &SagaRecord) -> GatewayResult<()>;

    /// Record the terminal outcome and release the in-flight claim.
    async fn complete(&self, record: &SagaRecord) -> GatewayResult<()>;
}
