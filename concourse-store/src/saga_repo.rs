use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use concourse_core::saga::{BeginOutcome, SagaKey, SagaOutcome, SagaRecord, SagaStore};
use concourse_core::GatewayResult;

struct Slot {
    running: bool,
    record: SagaRecord,
}

/// In-memory saga-record store. All claim decisions happen under one lock,
/// so `begin` is an atomic check-then-set on the key: two identical
/// concurrent retries can never both own a run.
pub struct InMemorySagaStore {
    slots: Mutex<HashMap<String, Slot>>,
}

impl InMemorySagaStore {
    pub fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemorySagaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SagaStore for InMemorySagaStore {
    async fn begin(&self, key: &SagaKey) -> GatewayResult<BeginOutcome> {
        let mut slots = self.slots.lock().await;

        match slots.get_mut(key.as_str()) {
            None => {
                let record = SagaRecord::new(key.clone());
                slots.insert(
                    key.as_str().to_string(),
                    Slot {
                        running: true,
                        record: record.clone(),
                    },
                );
                Ok(BeginOutcome::Begun(record))
            }
            Some(slot) if slot.running => Ok(BeginOutcome::InFlight),
            Some(slot) => match slot.record.outcome {
                // Resumable: keep the recorded progress, clear the failure
                // marker, and hand the run to this caller.
                Some(SagaOutcome::FailedDownstream(_)) => {
                    slot.record.outcome = None;
                    slot.running = true;
                    tracing::info!(key = %key, state = ?slot.record.state, "resuming failed saga");
                    Ok(BeginOutcome::Begun(slot.record.clone()))
                }
                Some(_) => Ok(BeginOutcome::Finished(slot.record.clone())),
                // No outcome and not running: the previous owner released
                // without finishing. Hand the run over as-is.
                None => {
                    slot.running = true;
                    Ok(BeginOutcome::Begun(slot.record.clone()))
                }
            },
        }
    }

    async fn update(&self, record: &SagaRecord) -> GatewayResult<()> {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(record.key.as_str()) {
            slot.record = record.clone();
        }
        Ok(())
    }

    async fn complete(&self, record: &SagaRecord) -> GatewayResult<()> {
        let mut slots = self.slots.lock().await;
        if let Some(slot) = slots.get_mut(record.key.as_str()) {
            slot.record = record.clone();
            slot.running = false;
        }
        Ok(())
    }
}
