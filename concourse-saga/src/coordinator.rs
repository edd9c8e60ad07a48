use std::sync::Arc;

use concourse_core::gateway::{BookingGateway, VisaApplicationDetails, VisaGateway};
use concourse_core::identity::{AuthContext, AuthProvider};
use concourse_core::models::{
    ApplicationStatus, Booking, BookingPayload, BookingRequest, BookingVisaStatus,
};
use concourse_core::saga::{BeginOutcome, SagaKey, SagaOutcome, SagaRecord, SagaState, SagaStore};
use concourse_core::GatewayError;

use crate::matcher;
use crate::SagaError;

/// Drives the end-to-end `book_flight` flow: resolve the visa requirement,
/// reuse or submit an application, and conditionally create the booking.
///
/// The saga owns the only multi-step invariant in the system: a booking is
/// never persisted inconsistently with the traveler's visa eligibility.
pub struct BookingSagaCoordinator {
    visa: Arc<dyn VisaGateway>,
    booking: Arc<dyn BookingGateway>,
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn SagaStore>,
}

impl BookingSagaCoordinator {
    pub fn new(
        visa: Arc<dyn VisaGateway>,
        booking: Arc<dyn BookingGateway>,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn SagaStore>,
    ) -> Self {
        Self {
            visa,
            booking,
            auth,
            store,
        }
    }

    pub async fn book_flight(
        &self,
        ctx: &AuthContext,
        request: &BookingRequest,
        request_id: Option<&str>,
    ) -> Result<Booking, SagaError> {
        request.validate().map_err(SagaError::Gateway)?;

        let key = SagaKey::derive(&ctx.user_id, &request.destination, request_id);
        match self.store.begin(&key).await.map_err(SagaError::Gateway)? {
            BeginOutcome::InFlight => {
                tracing::info!(key = %key, "duplicate booking request while saga in flight");
                Err(SagaError::InFlight(key.to_string()))
            }
            BeginOutcome::Finished(record) => self.replay(&record).await,
            BeginOutcome::Begun(record) => self.run(ctx, request, record).await,
        }
    }

    /// Answer a retry of an already-terminal saga from its record, without
    /// re-running any side-effecting step.
    async fn replay(&self, record: &SagaRecord) -> Result<Booking, SagaError> {
        match &record.outcome {
            Some(SagaOutcome::AbortedVisaRejected(detail)) => {
                Err(GatewayError::VisaRejected(detail.clone()).into())
            }
            Some(SagaOutcome::Completed) => {
                let booking_id = record.booking_id.ok_or_else(|| {
                    GatewayError::MalformedResponse(
                        "completed saga record is missing its booking id".to_string(),
                    )
                })?;
                tracing::info!(key = %record.key, %booking_id, "replaying completed saga");
                Ok(self.booking.get_booking(booking_id).await?)
            }
            _ => Err(GatewayError::MalformedResponse(
                "saga record in unexpected terminal shape".to_string(),
            )
            .into()),
        }
    }

    async fn run(
        &self,
        ctx: &AuthContext,
        request: &BookingRequest,
        mut record: SagaRecord,
    ) -> Result<Booking, SagaError> {
        if !record.state.visa_resolved() {
            if let Err(err) = self.resolve_visa(ctx, request, &mut record).await {
                return Err(self.abort(record, err).await);
            }
            self.store.update(&record).await?;
        } else {
            tracing::info!(key = %record.key, state = ?record.state, "visa phase already resolved, resuming at booking");
        }

        let visa_status = record.visa_status.ok_or_else(|| {
            GatewayError::MalformedResponse(
                "saga record resolved visa phase without a status".to_string(),
            )
        })?;
        let payload = BookingPayload {
            user_id: ctx.user_id.clone(),
            flight_id: request.flight_id.clone(),
            destination: request.destination.clone(),
            visa_application_id: record.visa_application_id,
            visa_status,
        };

        // The visa application, if any, is preserved by its idempotency
        // key; only the booking call repeats from here on.
        match self
            .booking
            .create_booking(&payload, record.key.as_str())
            .await
        {
            Ok(booking) => {
                record.advance(SagaState::BookingCreated)?;
                record.booking_id = Some(booking.id);
                self.store.update(&record).await?;

                record.advance(SagaState::Done)?;
                record.finish(SagaOutcome::Completed);
                self.store.complete(&record).await?;

                tracing::info!(
                    key = %record.key,
                    booking_id = %booking.id,
                    visa_status = ?booking.visa_status,
                    "booking saga completed"
                );
                Ok(booking)
            }
            Err(err) => Err(self.abort(record, err.into()).await),
        }
    }

    /// Record the terminal outcome for a failed run and release the claim.
    /// Rejections replay verbatim; everything else stays resumable so a
    /// retry of the identical request id picks up where this run stopped.
    async fn abort(&self, mut record: SagaRecord, err: SagaError) -> SagaError {
        let outcome = match &err {
            SagaError::Gateway(GatewayError::VisaRejected(detail)) => {
                SagaOutcome::AbortedVisaRejected(detail.clone())
            }
            other => SagaOutcome::FailedDownstream(other.to_string()),
        };
        tracing::error!(key = %record.key, state = ?record.state, outcome = ?outcome, "booking saga aborted");
        record.finish(outcome);
        if let Err(store_err) = self.store.complete(&record).await {
            tracing::error!(key = %record.key, "failed to persist saga outcome: {}", store_err);
        }
        err
    }

    /// `INIT → VISA_CHECKED → (SKIPPED | MATCHED | SUBMITTED)`. On success
    /// the record carries the visa fields the booking payload needs.
    async fn resolve_visa(
        &self,
        ctx: &AuthContext,
        request: &BookingRequest,
        record: &mut SagaRecord,
    ) -> Result<(), SagaError> {
        let requirement = self.visa.check_requirement(&request.destination).await?;
        if record.state == SagaState::Init {
            record.advance(SagaState::VisaChecked)?;
            self.store.update(record).await?;
        }

        if !requirement.requires_visa {
            record.advance(SagaState::Skipped)?;
            record.visa_status = Some(BookingVisaStatus::None);
            tracing::info!(key = %record.key, destination = %request.destination, "no visa required");
            return Ok(());
        }

        let applications = self.visa.list_applications(&ctx.user_id).await?;
        if let Some(approved) = matcher::match_application(&applications, &request.destination) {
            record.advance(SagaState::Matched)?;
            record.visa_application_id = Some(approved.id);
            record.visa_status = Some(BookingVisaStatus::Approved);
            tracing::info!(key = %record.key, application_id = %approved.id, "reusing approved visa application");
            return Ok(());
        }

        // Real profile data backs the submission; there is no fabricated
        // default path.
        let profile = self.auth.fetch_profile(&ctx.user_id).await?;
        let details = VisaApplicationDetails {
            name: profile.full_name,
            passport: request
                .passport
                .clone()
                .or(profile.passport)
                .unwrap_or_default(),
            bank_balance: profile.bank_balance,
            criminal_history: profile.criminal_history,
        };
        let application = self
            .visa
            .submit_application(
                &ctx.user_id,
                &request.destination,
                record.key.as_str(),
                &details,
            )
            .await?;
        record.advance(SagaState::Submitted)?;
        record.visa_application_id = Some(application.id);

        if application.status == ApplicationStatus::Rejected {
            // Terminal upstream decision; the application is left as-is.
            return Err(GatewayError::VisaRejected(format!(
                "visa application {} for {} was rejected",
                application.id, application.country
            ))
            .into());
        }

        record.visa_status = BookingVisaStatus::from_application(application.status);
        tracing::info!(key = %record.key, application_id = %application.id, status = ?application.status, "visa application submitted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use concourse_core::models::{VisaApplication, VisaRequirement};
    use concourse_core::identity::TravelerProfile;
    use concourse_core::GatewayResult;
    use concourse_store::InMemorySagaStore;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex;
    use uuid::Uuid;

    struct MockVisaGateway {
        requires_visa: bool,
        existing: Vec<VisaApplication>,
        submit_status: ApplicationStatus,
        check_calls: AtomicUsize,
        list_calls: AtomicUsize,
        submit_calls: AtomicUsize,
        submitted: Mutex<Vec<VisaApplication>>,
    }

    impl MockVisaGateway {
        fn new(requires_visa: bool) -> Self {
            Self {
                requires_visa,
                existing: Vec::new(),
                submit_status: ApplicationStatus::Pending,
                check_calls: AtomicUsize::new(0),
                list_calls: AtomicUsize::new(0),
                submit_calls: AtomicUsize::new(0),
                submitted: Mutex::new(Vec::new()),
            }
        }

        fn with_existing(mut self, application: VisaApplication) -> Self {
            self.existing.push(application);
            self
        }

        fn submitting_as(mut self, status: ApplicationStatus) -> Self {
            self.submit_status = status;
            self
        }
    }

    #[async_trait]
    impl VisaGateway for MockVisaGateway {
        async fn check_requirement(&self, country: &str) -> GatewayResult<VisaRequirement> {
            self.check_calls.fetch_add(1, Ordering::SeqCst);
            Ok(VisaRequirement {
                country: country.to_string(),
                requires_visa: self.requires_visa,
                visa_type: None,
                processing_time_days: None,
            })
        }

        async fn list_applications(&self, _user_id: &str) -> GatewayResult<Vec<VisaApplication>> {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.existing.clone())
        }

        async fn submit_application(
            &self,
            user_id: &str,
            country: &str,
            _idempotency_key: &str,
            _details: &VisaApplicationDetails,
        ) -> GatewayResult<VisaApplication> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            let application = VisaApplication {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                country: country.to_string(),
                status: self.submit_status,
                submitted_at: Utc::now(),
            };
            self.submitted.lock().await.push(application.clone());
            Ok(application)
        }

        async fn get_application(&self, id: Uuid) -> GatewayResult<VisaApplication> {
            self.submitted
                .lock()
                .await
                .iter()
                .chain(self.existing.iter())
                .find(|a| a.id == id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound(format!("application {}", id)))
        }
    }

    struct MockBookingGateway {
        create_calls: AtomicUsize,
        fail_next_creates: AtomicUsize,
        bookings: Mutex<Vec<Booking>>,
    }

    impl MockBookingGateway {
        fn new() -> Self {
            Self {
                create_calls: AtomicUsize::new(0),
                fail_next_creates: AtomicUsize::new(0),
                bookings: Mutex::new(Vec::new()),
            }
        }

        fn failing_next(self, n: usize) -> Self {
            self.fail_next_creates.store(n, Ordering::SeqCst);
            self
        }
    }

    #[async_trait]
    impl BookingGateway for MockBookingGateway {
        async fn create_booking(
            &self,
            payload: &BookingPayload,
            _idempotency_key: &str,
        ) -> GatewayResult<Booking> {
            self.create_calls.fetch_add(1, Ordering::SeqCst);
            if self
                .fail_next_creates
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
            {
                return Err(GatewayError::DownstreamUnavailable(
                    "booking service timed out".to_string(),
                ));
            }
            let booking = Booking {
                id: Uuid::new_v4(),
                user_id: payload.user_id.clone(),
                flight_id: payload.flight_id.clone(),
                destination: payload.destination.clone(),
                visa_application_id: payload.visa_application_id,
                visa_status: payload.visa_status,
                created_at: Utc::now(),
            };
            self.bookings.lock().await.push(booking.clone());
            Ok(booking)
        }

        async fn get_booking(&self, id: Uuid) -> GatewayResult<Booking> {
            self.bookings
                .lock()
                .await
                .iter()
                .find(|b| b.id == id)
                .cloned()
                .ok_or_else(|| GatewayError::NotFound(format!("booking {}", id)))
        }
    }

    struct MockAuthProvider;

    #[async_trait]
    impl AuthProvider for MockAuthProvider {
        async fn verify_token(&self, _token: &str) -> GatewayResult<AuthContext> {
            Ok(traveler())
        }

        async fn fetch_profile(&self, user_id: &str) -> GatewayResult<TravelerProfile> {
            Ok(TravelerProfile {
                user_id: user_id.to_string(),
                full_name: "Ada Traveler".to_string(),
                passport: Some("P1234567".to_string()),
                bank_balance: 25_000,
                criminal_history: false,
            })
        }

        async fn register(&self, body: Value) -> GatewayResult<Value> {
            Ok(body)
        }

        async fn login(&self, body: Value) -> GatewayResult<Value> {
            Ok(body)
        }
    }

    fn traveler() -> AuthContext {
        AuthContext {
            user_id: "traveler@example.com".to_string(),
            username: "traveler".to_string(),
        }
    }

    fn booking_request(destination: &str) -> BookingRequest {
        BookingRequest {
            flight_id: "FL-100".to_string(),
            destination: destination.to_string(),
            passport: None,
        }
    }

    fn approved_application(country: &str) -> VisaApplication {
        VisaApplication {
            id: Uuid::new_v4(),
            user_id: traveler().user_id,
            country: country.to_string(),
            status: ApplicationStatus::Approved,
            submitted_at: Utc::now(),
        }
    }

    fn coordinator(
        visa: Arc<MockVisaGateway>,
        booking: Arc<MockBookingGateway>,
    ) -> BookingSagaCoordinator {
        BookingSagaCoordinator::new(
            visa,
            booking,
            Arc::new(MockAuthProvider),
            Arc::new(InMemorySagaStore::new()),
        )
    }

    #[tokio::test]
    async fn visa_free_destination_skips_visa_calls_entirely() {
        let visa = Arc::new(MockVisaGateway::new(false));
        let booking = Arc::new(MockBookingGateway::new());
        let saga = coordinator(visa.clone(), booking.clone());

        let result = saga
            .book_flight(&traveler(), &booking_request("FR"), None)
            .await
            .unwrap();

        assert_eq!(result.visa_status, BookingVisaStatus::None);
        assert!(result.visa_application_id.is_none());
        assert_eq!(visa.list_calls.load(Ordering::SeqCst), 0);
        assert_eq!(visa.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn approved_application_is_reused_not_resubmitted() {
        let existing = approved_application("US");
        let visa = Arc::new(MockVisaGateway::new(true).with_existing(existing.clone()));
        let booking = Arc::new(MockBookingGateway::new());
        let saga = coordinator(visa.clone(), booking.clone());

        let result = saga
            .book_flight(&traveler(), &booking_request("US"), None)
            .await
            .unwrap();

        assert_eq!(result.visa_application_id, Some(existing.id));
        assert_eq!(result.visa_status, BookingVisaStatus::Approved);
        assert_eq!(visa.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn missing_application_submits_one_pending() {
        let visa = Arc::new(MockVisaGateway::new(true));
        let booking = Arc::new(MockBookingGateway::new());
        let saga = coordinator(visa.clone(), booking.clone());

        let result = saga
            .book_flight(&traveler(), &booking_request("US"), None)
            .await
            .unwrap();

        assert_eq!(visa.submit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.visa_status, BookingVisaStatus::Pending);
        let submitted = visa.submitted.lock().await;
        assert_eq!(result.visa_application_id, Some(submitted[0].id));
    }

    #[tokio::test]
    async fn rejected_submission_aborts_before_any_booking() {
        let visa = Arc::new(MockVisaGateway::new(true).submitting_as(ApplicationStatus::Rejected));
        let booking = Arc::new(MockBookingGateway::new());
        let saga = coordinator(visa.clone(), booking.clone());

        let err = saga
            .book_flight(&traveler(), &booking_request("CA"), Some("req-9"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            SagaError::Gateway(GatewayError::VisaRejected(_))
        ));
        assert_eq!(booking.create_calls.load(Ordering::SeqCst), 0);
        assert!(booking.bookings.lock().await.is_empty());

        // Retrying the identical request id replays the rejection without
        // submitting again.
        let err = saga
            .book_flight(&traveler(), &booking_request("CA"), Some("req-9"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SagaError::Gateway(GatewayError::VisaRejected(_))
        ));
        assert_eq!(visa.submit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn booking_failure_resumes_without_repeating_visa_steps() {
        let visa = Arc::new(MockVisaGateway::new(true));
        let booking = Arc::new(MockBookingGateway::new().failing_next(1));
        let saga = coordinator(visa.clone(), booking.clone());

        let err = saga
            .book_flight(&traveler(), &booking_request("US"), Some("req-5"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SagaError::Gateway(GatewayError::DownstreamUnavailable(_))
        ));
        assert_eq!(visa.submit_calls.load(Ordering::SeqCst), 1);

        let result = saga
            .book_flight(&traveler(), &booking_request("US"), Some("req-5"))
            .await
            .unwrap();
        assert_eq!(visa.submit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(visa.list_calls.load(Ordering::SeqCst), 1);
        assert_eq!(result.visa_status, BookingVisaStatus::Pending);
    }

    #[tokio::test]
    async fn completed_saga_replays_same_booking() {
        let visa = Arc::new(MockVisaGateway::new(false));
        let booking = Arc::new(MockBookingGateway::new());
        let saga = coordinator(visa.clone(), booking.clone());

        let first = saga
            .book_flight(&traveler(), &booking_request("FR"), Some("req-1"))
            .await
            .unwrap();
        let second = saga
            .book_flight(&traveler(), &booking_request("FR"), Some("req-1"))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(booking.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn concurrent_duplicates_create_one_application_and_one_booking() {
        let visa = Arc::new(MockVisaGateway::new(true));
        let booking = Arc::new(MockBookingGateway::new());
        let saga = Arc::new(coordinator(visa.clone(), booking.clone()));

        let mut handles = Vec::new();
        for _ in 0..2 {
            let saga = saga.clone();
            handles.push(tokio::spawn(async move {
                saga.book_flight(&traveler(), &booking_request("US"), Some("req-7"))
                    .await
            }));
        }
        let mut successes = 0;
        let mut parked = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(SagaError::InFlight(_)) => parked += 1,
                Err(other) => panic!("unexpected error: {}", other),
            }
        }

        assert!(successes >= 1);
        assert_eq!(successes + parked, 2);
        assert_eq!(visa.submit_calls.load(Ordering::SeqCst), 1);
        assert_eq!(booking.create_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn blank_destination_is_rejected_before_any_call() {
        let visa = Arc::new(MockVisaGateway::new(true));
        let booking = Arc::new(MockBookingGateway::new());
        let saga = coordinator(visa.clone(), booking.clone());

        let request = BookingRequest {
            flight_id: "FL-100".to_string(),
            destination: "".to_string(),
            passport: None,
        };
        let err = saga.book_flight(&traveler(), &request, None).await.unwrap_err();

        assert!(matches!(
            err,
            SagaError::Gateway(GatewayError::ValidationError(_))
        ));
        assert_eq!(visa.check_calls.load(Ordering::SeqCst), 0);
    }
}
