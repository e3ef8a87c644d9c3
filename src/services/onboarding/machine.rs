use futures::stream::{FuturesUnordered, StreamExt};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::draft::{OnboardingDraft, PersonalInfo, Step};
use super::referral::{ReferralStatus, ReferralValidator};
use super::uploads::{UploadBatchReport, UploadFailure, UploadKind, UploadResult};
use super::OnboardingBackend;
use crate::api::models::{LocalFile, PaymentStatus, SubscriptionPlan};
use crate::api::ApiError;
use crate::config::ReferralConfig;
use crate::session::Session;
use crate::utils::browser::ExternalBrowser;
use crate::utils::latest::Ticket;
use crate::utils::validation::ValidationError;

/// Errors raised while moving through the wizard.
#[derive(Debug, Error)]
pub enum OnboardingError {
    /// A step's input failed a local check; no request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The server refused a request or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// A later step ran without the session step 1 created.
    #[error("Your registration session was lost. Please start again")]
    NoSession,
    /// Confirmation was asked for before the payment page was opened.
    #[error("Payment has not been started yet")]
    PaymentNotStarted,
    /// The payment provider still reports the payment as pending.
    #[error("We have not received your payment yet. Finish paying in your browser, then confirm again")]
    PaymentPending,
    #[error("Your payment was not successful. Please try again")]
    PaymentFailed,
}

impl OnboardingError {
    /// Text suitable for an alert. Server messages are passed through.
    pub fn user_message(&self) -> String {
        match self {
            OnboardingError::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    /// Whether the error came from a local input check.
    pub fn is_validation(&self) -> bool {
        matches!(self, OnboardingError::Validation(_))
    }
}

/// Result of a successful [`OnboardingMachine::advance`].
#[derive(Debug, Clone, PartialEq)]
pub enum AdvanceOutcome {
    /// Moved one step forward. `session` is set when step 1 created the
    /// account; the caller persists it.
    Advanced {
        from: Step,
        to: Step,
        session: Option<Session>,
    },
    /// Step 5: the payment page was handed to the browser.
    PaymentStarted {
        authorization_url: String,
        reference: String,
    },
}

/// Result of [`OnboardingMachine::back`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackOutcome {
    /// Now on the given earlier step. Entered data is kept.
    WentBack(Step),
    /// Back from the first step leaves the wizard.
    Cancelled,
}

/// Drives a provider through registration.
pub struct OnboardingMachine<B> {
    backend: Arc<B>,
    browser: Arc<dyn ExternalBrowser>,
    step: Step,
    draft: OnboardingDraft,
    session: Option<Session>,
    /// Personal details the account was created with.
    registered: Option<PersonalInfo>,
    plans: Option<Vec<SubscriptionPlan>>,
    referral: ReferralValidator,
    referral_status: ReferralStatus,
    completed: bool,
}

impl<B: OnboardingBackend + 'static> OnboardingMachine<B> {
    /// Start a wizard on step 1 with an empty draft.
    ///
    /// # Arguments
    ///
    /// * `backend` - Server calls for registration.
    /// * `browser` - Opens the payment page.
    /// * `referral` - Debounce settings for referral code lookups.
    pub fn new(
        backend: Arc<B>,
        browser: Arc<dyn ExternalBrowser>,
        referral: &ReferralConfig,
    ) -> Self {
        Self {
            backend,
            browser,
            step: Step::PersonalInfo,
            draft: OnboardingDraft::default(),
            session: None,
            registered: None,
            plans: None,
            referral: ReferralValidator::new(referral),
            referral_status: ReferralStatus::Unchecked,
            completed: false,
        }
    }

    /// The step currently shown.
    pub fn step(&self) -> Step {
        self.step
    }

    /// Everything entered so far.
    pub fn draft(&self) -> &OnboardingDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut OnboardingDraft {
        &mut self.draft
    }

    /// The session step 1 created, if it has run.
    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// True once step 1 created the account. Personal details are fixed
    /// from then on.
    pub fn account_created(&self) -> bool {
        self.session.is_some()
    }

    /// Loaded subscription plans; empty until [`Self::load_plans`] runs.
    pub fn plans(&self) -> &[SubscriptionPlan] {
        self.plans.as_deref().unwrap_or_default()
    }

    /// Outcome of the latest referral lookup.
    pub fn referral_status(&self) -> &ReferralStatus {
        &self.referral_status
    }

    /// True once the backend confirmed the payment.
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    fn token(&self) -> Option<String> {
        self.session.as_ref().map(|s| s.token.clone())
    }

    /// Validate and save the current step, then move forward.
    ///
    /// On any error the step is unchanged. Validation errors are raised
    /// before any network call.
    pub async fn advance(&mut self) -> Result<AdvanceOutcome, OnboardingError> {
        let from = self.step;
        let mut created = None;

        match from {
            Step::PersonalInfo => {
                self.draft.personal.validate()?;
                if self.session.is_none() {
                    let signup = self
                        .draft
                        .personal
                        .signup_request(&self.draft.referral_code);
                    let session: Session = self.backend.register_provider(&signup).await?.into();
                    info!("Provider account created for {}", session.user.email);
                    self.session = Some(session.clone());
                    self.registered = Some(self.draft.personal.clone());
                    created = Some(session);
                } else if self.registered.as_ref() != Some(&self.draft.personal) {
                    return Err(ValidationError::AccountDetailsLocked.into());
                } else {
                    debug!("Provider account already exists; not registering again");
                }
            }
            Step::ServiceDetails => {
                self.draft.service.validate()?;
                let data = self.draft.service_payload().map_err(ApiError::from)?;
                self.save_progress(from, data).await?;
            }
            Step::Documents => {
                self.draft.uploads.check_complete()?;
                self.save_progress(from, self.draft.uploads_payload())
                    .await?;
            }
            Step::Subscription => {
                self.validate_plan()?;
                self.save_progress(from, self.draft.subscription_payload())
                    .await?;
            }
            Step::Payment => return self.start_payment().await,
        }

        let to = from.next().unwrap_or(from);
        self.step = to;
        info!("Registration moved to step {} ({})", to.number(), to.title());
        Ok(AdvanceOutcome::Advanced {
            from,
            to,
            session: created,
        })
    }

    async fn save_progress(&self, step: Step, data: Value) -> Result<(), OnboardingError> {
        let token = self.token().ok_or(OnboardingError::NoSession)?;
        self.backend
            .save_progress(&token, step.number(), data)
            .await?;
        debug!("Saved registration step {}", step.number());
        Ok(())
    }

    /// Go back one step. Nothing is sent and nothing entered is lost.
    pub fn back(&mut self) -> BackOutcome {
        match self.step.prev() {
            Some(prev) => {
                self.step = prev;
                BackOutcome::WentBack(prev)
            }
            None => BackOutcome::Cancelled,
        }
    }

    /// Subscription plans, fetched on first use.
    pub async fn load_plans(&mut self) -> Result<&[SubscriptionPlan], OnboardingError> {
        if self.plans.is_none() {
            let plans = self.backend.subscription_plans().await?;
            debug!("Loaded {} subscription plans", plans.len());
            self.plans = Some(plans);
        }
        Ok(self.plans())
    }

    /// Choose a subscription plan.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownPlan`] when plans are loaded and none has
    /// `plan_id`.
    pub fn select_plan(&mut self, plan_id: &str) -> Result<(), ValidationError> {
        if let Some(plans) = &self.plans {
            if !plans.iter().any(|p| p.id == plan_id) {
                return Err(ValidationError::UnknownPlan(plan_id.to_string()));
            }
        }
        self.draft.subscription_plan_id = Some(plan_id.to_string());
        Ok(())
    }

    fn validate_plan(&self) -> Result<(), ValidationError> {
        let plan_id = self
            .draft
            .subscription_plan_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or(ValidationError::NoPlanSelected)?;
        if let Some(plans) = &self.plans {
            if !plans.iter().any(|p| p.id == plan_id) {
                return Err(ValidationError::UnknownPlan(plan_id.to_string()));
            }
        }
        Ok(())
    }

    /// Queue picked files and mark them uploading. Each returned future
    /// uploads one file without borrowing the machine, so it can run on a
    /// spawned task; feed its result to [`Self::finish_upload`]. Until then
    /// the files hold the documents step.
    pub fn begin_uploads(
        &mut self,
        kind: UploadKind,
        files: Vec<LocalFile>,
    ) -> Vec<impl Future<Output = UploadResult> + Send + 'static> {
        let token = self.token();
        let mut uploads = Vec::with_capacity(files.len());

        for file in files {
            let id = self.draft.uploads.enqueue(kind, file.clone());
            self.draft.uploads.start(id);

            let backend = Arc::clone(&self.backend);
            let token = token.clone();
            uploads.push(async move {
                let outcome = backend.upload_file(token.as_deref(), kind, &file).await;
                UploadResult {
                    id,
                    name: file.name,
                    outcome,
                }
            });
        }
        uploads
    }

    /// Apply one finished upload. A failure is kept on the item and
    /// returned for the alert; siblings are unaffected.
    pub fn finish_upload(&mut self, result: UploadResult) -> Option<UploadFailure> {
        let UploadResult { id, name, outcome } = result;
        match outcome {
            Ok(remote_url) => {
                debug!("Uploaded {}", name);
                self.draft.uploads.complete(id, remote_url);
                None
            }
            Err(e) => {
                warn!("Upload of {} failed: {}", name, e);
                let reason = e.user_message();
                self.draft.uploads.fail(id, reason.clone());
                Some(UploadFailure { name, reason })
            }
        }
    }

    /// Upload a batch of picked files concurrently and wait for all of
    /// them. Each file succeeds or fails on its own; failures are listed
    /// in the report.
    pub async fn upload_files(&mut self, kind: UploadKind, files: Vec<LocalFile>) -> UploadBatchReport {
        let mut batch: FuturesUnordered<_> = self.begin_uploads(kind, files).into_iter().collect();

        let mut report = UploadBatchReport::default();
        while let Some(result) = batch.next().await {
            report.record(self.finish_upload(result));
        }
        report
    }

    /// Record an edit of the referral code. The returned ticket identifies
    /// the lookup for this edit.
    pub fn set_referral_code(&mut self, code: String) -> Ticket {
        self.draft.referral_code = code;
        self.referral_status = ReferralStatus::Unchecked;
        self.referral.begin()
    }

    /// Debounced lookup for `ticket`, detached from `self` so it can run
    /// on a spawned task. Feed the result to [`Self::apply_referral`].
    pub fn referral_lookup(
        &self,
        ticket: Ticket,
    ) -> impl Future<Output = (Ticket, Option<ReferralStatus>)> + Send + 'static {
        let validator = self.referral.clone();
        let backend = Arc::clone(&self.backend);
        let code = self.draft.referral_code.clone();
        async move {
            let status = validator.run(backend.as_ref(), ticket, &code).await;
            (ticket, status)
        }
    }

    /// Store a lookup result. Results for superseded edits, and lookups that
    /// were skipped, are dropped.
    pub fn apply_referral(&mut self, ticket: Ticket, status: Option<ReferralStatus>) {
        if let Some(status) = status {
            if self.referral.is_latest(ticket) {
                self.referral_status = status;
            }
        }
    }

    /// Run the lookup for `ticket` in place and apply its result.
    pub async fn check_referral(&mut self, ticket: Ticket) -> &ReferralStatus {
        let (ticket, status) = self.referral_lookup(ticket).await;
        self.apply_referral(ticket, status);
        &self.referral_status
    }

    async fn start_payment(&mut self) -> Result<AdvanceOutcome, OnboardingError> {
        let request = self.draft.payment_request()?;
        let token = self.token();

        let init = self
            .backend
            .initialize_payment(token.as_deref(), &request)
            .await?;
        info!("Payment initialized with reference {}", init.reference);
        self.draft.payment_reference = Some(init.reference.clone());

        if let Some(token) = token.as_deref() {
            if let Err(e) = self
                .backend
                .save_payment_reference(token, &init.reference)
                .await
            {
                warn!("Could not save payment reference: {}", e);
            }
        }

        if let Err(e) = self.browser.open(&init.authorization_url) {
            warn!("Could not open the payment page: {:#}", e);
        }

        Ok(AdvanceOutcome::PaymentStarted {
            authorization_url: init.authorization_url,
            reference: init.reference,
        })
    }

    /// Ask the backend whether the payment went through. Only a confirmed
    /// payment completes registration.
    pub async fn confirm_payment(&mut self) -> Result<(), OnboardingError> {
        let reference = self
            .draft
            .payment_reference
            .clone()
            .ok_or(OnboardingError::PaymentNotStarted)?;
        let token = self.token();

        match self
            .backend
            .verify_payment(token.as_deref(), &reference)
            .await?
        {
            PaymentStatus::Success => {
                self.completed = true;
                info!("Payment {} confirmed; registration complete", reference);
                Ok(())
            }
            PaymentStatus::Pending => Err(OnboardingError::PaymentPending),
            PaymentStatus::Failed => {
                // A new attempt needs a new reference
                self.draft.payment_reference = None;
                Err(OnboardingError::PaymentFailed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::{
        AuthPayload, PaymentInit, PaymentRequest, ProviderSignup, ReferralCheck, Referrer, User,
    };
    use crate::api::ApiResult;
    use crate::services::location_service::ResolvedLocation;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        calls: Mutex<Vec<String>>,
        fail_progress: bool,
        fail_payment_reference: bool,
        payment_status: Mutex<Option<PaymentStatus>>,
    }

    impl FakeBackend {
        fn record(&self, call: impl Into<String>) {
            self.calls.lock().unwrap().push(call.into());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn count(&self, prefix: &str) -> usize {
            self.calls().iter().filter(|c| c.starts_with(prefix)).count()
        }
    }

    #[async_trait]
    impl OnboardingBackend for FakeBackend {
        async fn register_provider(&self, signup: &ProviderSignup) -> ApiResult<AuthPayload> {
            self.record("register");
            Ok(AuthPayload {
                token: "tok-1".to_string(),
                user: User {
                    email: signup.email.clone(),
                    user_type: Some("provider".to_string()),
                    ..User::default()
                },
            })
        }

        async fn save_progress(&self, token: &str, step: u8, _data: Value) -> ApiResult<()> {
            assert_eq!(token, "tok-1");
            self.record(format!("progress:{step}"));
            if self.fail_progress {
                return Err(ApiError::Status {
                    status: 500,
                    message: "Could not save".to_string(),
                });
            }
            Ok(())
        }

        async fn upload_file(
            &self,
            _token: Option<&str>,
            _kind: UploadKind,
            file: &LocalFile,
        ) -> ApiResult<String> {
            self.record(format!("upload:{}", file.name));
            if file.name.contains("bad") {
                return Err(ApiError::Status {
                    status: 413,
                    message: "File too large".to_string(),
                });
            }
            Ok(format!("https://cdn.example.com/{}", file.name))
        }

        async fn subscription_plans(&self) -> ApiResult<Vec<SubscriptionPlan>> {
            self.record("plans");
            Ok(vec![SubscriptionPlan {
                id: "basic".to_string(),
                name: "Basic".to_string(),
                price: 5000.0,
                interval: "monthly".to_string(),
                benefits: vec![],
            }])
        }

        async fn validate_referral(&self, code: &str) -> ApiResult<ReferralCheck> {
            self.record(format!("referral:{code}"));
            if code == "VALID1" {
                Ok(ReferralCheck {
                    valid: true,
                    referrer: Some(Referrer {
                        business_name: "Glow Salon".to_string(),
                        full_name: None,
                    }),
                })
            } else if code == "DOWN99" {
                Err(ApiError::Status {
                    status: 503,
                    message: "Service unavailable".to_string(),
                })
            } else {
                Err(ApiError::Rejected("Invalid referral code".to_string()))
            }
        }

        async fn initialize_payment(
            &self,
            _token: Option<&str>,
            _request: &PaymentRequest,
        ) -> ApiResult<PaymentInit> {
            self.record("payment:init");
            Ok(PaymentInit {
                authorization_url: "https://pay.example.com/abc".to_string(),
                reference: "ref-abc".to_string(),
                access_code: None,
            })
        }

        async fn save_payment_reference(&self, _token: &str, reference: &str) -> ApiResult<()> {
            self.record(format!("payment:reference:{reference}"));
            if self.fail_payment_reference {
                return Err(ApiError::Status {
                    status: 500,
                    message: "boom".to_string(),
                });
            }
            Ok(())
        }

        async fn verify_payment(
            &self,
            _token: Option<&str>,
            _reference: &str,
        ) -> ApiResult<PaymentStatus> {
            self.record("payment:verify");
            Ok(self
                .payment_status
                .lock()
                .unwrap()
                .unwrap_or(PaymentStatus::Pending))
        }
    }

    #[derive(Default)]
    struct RecordingBrowser {
        opened: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ExternalBrowser for RecordingBrowser {
        fn open(&self, url: &str) -> anyhow::Result<()> {
            self.opened.lock().unwrap().push(url.to_string());
            if self.fail {
                anyhow::bail!("no browser");
            }
            Ok(())
        }
    }

    fn machine_with(
        backend: FakeBackend,
        browser: RecordingBrowser,
    ) -> (
        OnboardingMachine<FakeBackend>,
        Arc<FakeBackend>,
        Arc<RecordingBrowser>,
    ) {
        let backend = Arc::new(backend);
        let browser = Arc::new(browser);
        let machine = OnboardingMachine::new(
            Arc::clone(&backend),
            browser.clone(),
            &ReferralConfig::default(),
        );
        (machine, backend, browser)
    }

    fn machine() -> (OnboardingMachine<FakeBackend>, Arc<FakeBackend>) {
        let (machine, backend, _) = machine_with(FakeBackend::default(), RecordingBrowser::default());
        (machine, backend)
    }

    fn fill_personal(machine: &mut OnboardingMachine<FakeBackend>) {
        let personal = &mut machine.draft_mut().personal;
        personal.full_name = "Ada Obi".to_string();
        personal.business_name = "Sparkle Homes".to_string();
        personal.email = "ada@example.com".to_string();
        personal.phone = "08012345678".to_string();
        personal.password = "abc123".to_string();
        personal.confirm_password = "abc123".to_string();
    }

    fn fill_service(machine: &mut OnboardingMachine<FakeBackend>) {
        let service = &mut machine.draft_mut().service;
        service.category = "Cleaning".to_string();
        service.apply_location(&ResolvedLocation::Area("Ikeja, Lagos".to_string()));
    }

    async fn upload_both(machine: &mut OnboardingMachine<FakeBackend>) {
        machine
            .upload_files(UploadKind::Document, vec![LocalFile::from_path("/tmp/cac.pdf")])
            .await;
        machine
            .upload_files(UploadKind::BrandImage, vec![LocalFile::from_path("/tmp/logo.png")])
            .await;
    }

    /// Drive a fresh machine to `target`.
    async fn machine_at(target: Step) -> (OnboardingMachine<FakeBackend>, Arc<FakeBackend>) {
        let (mut machine, backend) = machine();
        fill_personal(&mut machine);
        fill_service(&mut machine);
        upload_both(&mut machine).await;
        machine.load_plans().await.unwrap();
        machine.select_plan("basic").unwrap();
        while machine.step() < target {
            machine.advance().await.unwrap();
        }
        (machine, backend)
    }

    #[tokio::test]
    async fn test_password_mismatch_blocks_account_creation() {
        let (mut machine, backend) = machine();
        fill_personal(&mut machine);
        machine.draft_mut().personal.confirm_password = "abc124".to_string();

        let err = machine.advance().await.unwrap_err();
        assert_eq!(err.user_message(), "Passwords do not match");
        assert_eq!(machine.step(), Step::PersonalInfo);
        assert_eq!(backend.count("register"), 0);
    }

    #[tokio::test]
    async fn test_step_one_creates_session_once() {
        let (mut machine, backend) = machine();
        fill_personal(&mut machine);

        let outcome = machine.advance().await.unwrap();
        let AdvanceOutcome::Advanced { from, to, session } = outcome else {
            panic!("expected to advance");
        };
        assert_eq!((from, to), (Step::PersonalInfo, Step::ServiceDetails));
        assert_eq!(session.unwrap().token, "tok-1");

        // Going back and forward again must not register a second account
        assert_eq!(machine.back(), BackOutcome::WentBack(Step::PersonalInfo));
        let again = machine.advance().await.unwrap();
        assert!(matches!(again, AdvanceOutcome::Advanced { session: None, .. }));
        assert_eq!(backend.count("register"), 1);
    }

    #[tokio::test]
    async fn test_personal_details_locked_after_account_creation() {
        let (mut machine, backend) = machine();
        fill_personal(&mut machine);
        machine.advance().await.unwrap();
        assert!(machine.account_created());

        machine.back();
        machine.draft_mut().personal.email = "other@example.com".to_string();
        let err = machine.advance().await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::Validation(ValidationError::AccountDetailsLocked)
        ));
        assert_eq!(machine.step(), Step::PersonalInfo);
        assert_eq!(backend.count("register"), 1);

        machine.draft_mut().personal.email = "ada@example.com".to_string();
        machine.advance().await.unwrap();
        assert_eq!(machine.step(), Step::ServiceDetails);
    }

    #[tokio::test]
    async fn test_invalid_steps_make_no_save_call() {
        for step in [Step::ServiceDetails, Step::Documents, Step::Subscription] {
            let (mut machine, backend) = machine();
            fill_personal(&mut machine);
            machine.advance().await.unwrap();
            machine.step = step;
            let before = backend.calls().len();

            let err = machine.advance().await.unwrap_err();
            assert!(err.is_validation(), "step {step:?}: {err:?}");
            assert_eq!(machine.step(), step);
            assert_eq!(backend.calls().len(), before);
        }
    }

    #[tokio::test]
    async fn test_save_failure_keeps_step() {
        let (mut machine, backend, _) = machine_with(
            FakeBackend {
                fail_progress: true,
                ..FakeBackend::default()
            },
            RecordingBrowser::default(),
        );
        fill_personal(&mut machine);
        fill_service(&mut machine);
        machine.advance().await.unwrap();

        let err = machine.advance().await.unwrap_err();
        assert_eq!(err.user_message(), "Could not save");
        assert_eq!(machine.step(), Step::ServiceDetails);
        assert_eq!(backend.count("register"), 1);
    }

    #[tokio::test]
    async fn test_documents_step_needs_both_kinds() {
        let (mut machine, backend) = machine_at(Step::ServiceDetails).await;
        machine.draft_mut().uploads = Default::default();
        machine.advance().await.unwrap();
        assert_eq!(machine.step(), Step::Documents);

        machine
            .upload_files(UploadKind::Document, vec![LocalFile::from_path("/tmp/cac.pdf")])
            .await;
        let err = machine.advance().await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::Validation(ValidationError::NoBrandImages)
        ));
        assert_eq!(backend.count("progress:3"), 0);

        machine
            .upload_files(UploadKind::BrandImage, vec![LocalFile::from_path("/tmp/logo.png")])
            .await;
        machine.advance().await.unwrap();
        assert_eq!(machine.step(), Step::Subscription);
        assert_eq!(backend.count("progress:3"), 1);
    }

    #[tokio::test]
    async fn test_partial_batch_failure() {
        let (mut machine, _backend) = machine();
        let report = machine
            .upload_files(
                UploadKind::BrandImage,
                vec![
                    LocalFile::from_path("/tmp/front.jpg"),
                    LocalFile::from_path("/tmp/bad-back.jpg"),
                ],
            )
            .await;

        assert_eq!(report.attached, 1);
        assert_eq!(report.failed.len(), 1);
        assert!(report.alert_message().unwrap().contains("bad-back.jpg"));
        assert_eq!(
            machine.draft().uploads.attached(UploadKind::BrandImage),
            vec!["https://cdn.example.com/front.jpg"]
        );
    }

    #[tokio::test]
    async fn test_documents_step_waits_for_uploads_in_flight() {
        let (mut machine, backend) = machine_at(Step::ServiceDetails).await;
        machine.draft_mut().uploads = Default::default();
        machine.advance().await.unwrap();

        let mut uploads = machine.begin_uploads(
            UploadKind::Document,
            vec![LocalFile::from_path("/tmp/cac.pdf")],
        );
        uploads.extend(machine.begin_uploads(
            UploadKind::BrandImage,
            vec![LocalFile::from_path("/tmp/logo.png")],
        ));
        let err = machine.advance().await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::Validation(ValidationError::UploadsPending(2))
        ));
        assert_eq!(machine.step(), Step::Documents);
        assert_eq!(backend.count("progress:3"), 0);

        for upload in uploads {
            assert!(machine.finish_upload(upload.await).is_none());
        }
        machine.advance().await.unwrap();
        assert_eq!(machine.step(), Step::Subscription);
    }

    #[tokio::test]
    async fn test_failed_upload_result_is_kept_on_item() {
        let (mut machine, _) = machine();
        let uploads = machine.begin_uploads(
            UploadKind::Document,
            vec![LocalFile::from_path("/tmp/bad-scan.pdf")],
        );
        assert_eq!(machine.draft().uploads.in_flight(), 1);

        for upload in uploads {
            let failure = machine.finish_upload(upload.await).expect("upload fails");
            assert_eq!(failure.name, "bad-scan.pdf");
            assert_eq!(failure.reason, "File too large");
        }
        assert_eq!(machine.draft().uploads.in_flight(), 0);
        assert!(machine.draft().uploads.attached(UploadKind::Document).is_empty());
    }

    #[tokio::test]
    async fn test_plan_must_be_known() {
        let (mut machine, _) = machine_at(Step::Subscription).await;
        machine.draft_mut().subscription_plan_id = None;
        assert!(matches!(
            machine.advance().await.unwrap_err(),
            OnboardingError::Validation(ValidationError::NoPlanSelected)
        ));
        assert_eq!(
            machine.select_plan("gold"),
            Err(ValidationError::UnknownPlan("gold".to_string()))
        );
    }

    #[tokio::test]
    async fn test_plans_fetched_once() {
        let (mut machine, backend) = machine();
        machine.load_plans().await.unwrap();
        let plans = machine.load_plans().await.unwrap();
        assert_eq!(plans.len(), 1);
        assert_eq!(backend.count("plans"), 1);
    }

    #[tokio::test]
    async fn test_payment_handoff() {
        let (mut machine, backend) = machine_at(Step::Payment).await;
        let outcome = machine.advance().await.unwrap();

        assert_eq!(
            outcome,
            AdvanceOutcome::PaymentStarted {
                authorization_url: "https://pay.example.com/abc".to_string(),
                reference: "ref-abc".to_string(),
            }
        );
        assert_eq!(backend.count("payment:reference:ref-abc"), 1);
        assert_eq!(machine.step(), Step::Payment);
        assert!(!machine.is_complete());
    }

    #[tokio::test]
    async fn test_payment_reference_and_browser_failures_are_not_fatal() {
        let (mut machine, backend, browser) = machine_with(
            FakeBackend {
                fail_payment_reference: true,
                ..FakeBackend::default()
            },
            RecordingBrowser {
                fail: true,
                ..RecordingBrowser::default()
            },
        );
        fill_personal(&mut machine);
        fill_service(&mut machine);
        machine.advance().await.unwrap();
        machine.step = Step::Payment;

        assert!(matches!(
            machine.advance().await.unwrap(),
            AdvanceOutcome::PaymentStarted { .. }
        ));
        assert_eq!(backend.count("payment:reference"), 1);
        assert_eq!(browser.opened.lock().unwrap().len(), 1);
        assert_eq!(machine.draft().payment_reference.as_deref(), Some("ref-abc"));
    }

    #[tokio::test]
    async fn test_payment_requires_earlier_details() {
        let (mut machine, backend) = machine();
        fill_personal(&mut machine);
        machine.step = Step::Payment;

        let err = machine.advance().await.unwrap_err();
        assert!(matches!(
            err,
            OnboardingError::Validation(ValidationError::PaymentDetailsMissing("Service category"))
        ));
        assert_eq!(backend.count("payment:init"), 0);
    }

    #[tokio::test]
    async fn test_completion_needs_server_confirmation() {
        let (mut machine, backend) = machine_at(Step::Payment).await;
        assert!(matches!(
            machine.confirm_payment().await.unwrap_err(),
            OnboardingError::PaymentNotStarted
        ));

        machine.advance().await.unwrap();
        assert!(matches!(
            machine.confirm_payment().await.unwrap_err(),
            OnboardingError::PaymentPending
        ));
        assert!(!machine.is_complete());

        *backend.payment_status.lock().unwrap() = Some(PaymentStatus::Success);
        machine.confirm_payment().await.unwrap();
        assert!(machine.is_complete());
    }

    #[tokio::test]
    async fn test_back_from_first_step_cancels() {
        let (mut machine, _) = machine();
        assert_eq!(machine.back(), BackOutcome::Cancelled);
        assert_eq!(machine.step(), Step::PersonalInfo);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_referral_code_stays_unchecked() {
        let (mut machine, backend) = machine();
        let ticket = machine.set_referral_code("AB1".to_string());
        let status = machine.check_referral(ticket).await.clone();

        assert_eq!(status, ReferralStatus::Unchecked);
        assert_eq!(backend.count("referral"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_valid_referral_code_shows_referrer() {
        let (mut machine, _) = machine();
        let ticket = machine.set_referral_code("VALID1".to_string());
        let status = machine.check_referral(ticket).await.clone();

        let ReferralStatus::Valid(referrer) = status else {
            panic!("expected a valid referral, got {status:?}");
        };
        assert_eq!(referrer.business_name, "Glow Salon");
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_referral_code() {
        let (mut machine, _) = machine();
        let ticket = machine.set_referral_code("NOPE99".to_string());
        assert_eq!(
            machine.check_referral(ticket).await,
            &ReferralStatus::Invalid
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_referral_outage_leaves_code_unchecked() {
        let (mut machine, backend) = machine();
        let ticket = machine.set_referral_code("DOWN99".to_string());
        assert_eq!(
            machine.check_referral(ticket).await,
            &ReferralStatus::Unchecked
        );
        assert_eq!(backend.count("referral:DOWN99"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_referral_lookup_is_ignored() {
        let (mut machine, backend) = machine();
        let stale = machine.set_referral_code("VALID1".to_string());
        let lookup = machine.referral_lookup(stale);
        let fresh = machine.set_referral_code("VALI".to_string());

        let (ticket, status) = lookup.await;
        assert!(status.is_none());
        machine.apply_referral(ticket, status);
        assert_eq!(machine.referral_status(), &ReferralStatus::Unchecked);
        assert_eq!(backend.count("referral"), 0);

        assert!(machine.referral.is_latest(fresh));
    }
}
