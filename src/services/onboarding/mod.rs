//! Provider onboarding: a five-step registration wizard.
//!
//! ```text
//! PersonalInfo ─▶ ServiceDetails ─▶ Documents ─▶ Subscription ─▶ Payment
//!  (register)     (save progress)   (save)       (save)          (pay)
//! ```
//!
//! A step is left only after its local validation passes and its remote
//! save succeeds. Going back is always allowed; going back from the first
//! step cancels the wizard.

mod draft;
mod machine;
mod referral;
mod uploads;

pub use draft::{OnboardingDraft, PersonalInfo, ServiceDetails, Step};
pub use machine::{AdvanceOutcome, BackOutcome, OnboardingError, OnboardingMachine};
pub use referral::{ReferralStatus, ReferralValidator};
pub use uploads::{
    UploadBatchReport, UploadFailure, UploadId, UploadKind, UploadResult, UploadState,
    UploadTracker, UploadedFile,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::api::models::{
    AuthPayload, LocalFile, PaymentInit, PaymentRequest, PaymentStatus, ProviderSignup,
    ReferralCheck, SubscriptionPlan,
};
use crate::api::{ApiClient, ApiResult};

/// Backend calls made by the wizard.
#[async_trait]
pub trait OnboardingBackend: Send + Sync {
    async fn register_provider(&self, signup: &ProviderSignup) -> ApiResult<AuthPayload>;
    async fn save_progress(&self, token: &str, step: u8, data: Value) -> ApiResult<()>;
    /// Upload one file; returns its remote URL.
    async fn upload_file(
        &self,
        token: Option<&str>,
        kind: UploadKind,
        file: &LocalFile,
    ) -> ApiResult<String>;
    async fn subscription_plans(&self) -> ApiResult<Vec<SubscriptionPlan>>;
    async fn validate_referral(&self, code: &str) -> ApiResult<ReferralCheck>;
    async fn initialize_payment(
        &self,
        token: Option<&str>,
        request: &PaymentRequest,
    ) -> ApiResult<PaymentInit>;
    async fn save_payment_reference(&self, token: &str, reference: &str) -> ApiResult<()>;
    async fn verify_payment(&self, token: Option<&str>, reference: &str) -> ApiResult<PaymentStatus>;
}

#[async_trait]
impl OnboardingBackend for ApiClient {
    async fn register_provider(&self, signup: &ProviderSignup) -> ApiResult<AuthPayload> {
        ApiClient::register_provider(self, signup).await
    }

    async fn save_progress(&self, token: &str, step: u8, data: Value) -> ApiResult<()> {
        self.save_registration_progress(token, step, data).await
    }

    async fn upload_file(
        &self,
        token: Option<&str>,
        kind: UploadKind,
        file: &LocalFile,
    ) -> ApiResult<String> {
        let response = match kind {
            UploadKind::Document => self.upload_document(token, file).await?,
            UploadKind::BrandImage => self.upload_brand_image(token, file).await?,
        };
        Ok(response.url)
    }

    async fn subscription_plans(&self) -> ApiResult<Vec<SubscriptionPlan>> {
        ApiClient::subscription_plans(self).await
    }

    async fn validate_referral(&self, code: &str) -> ApiResult<ReferralCheck> {
        ApiClient::validate_referral(self, code).await
    }

    async fn initialize_payment(
        &self,
        token: Option<&str>,
        request: &PaymentRequest,
    ) -> ApiResult<PaymentInit> {
        ApiClient::initialize_payment(self, token, request).await
    }

    async fn save_payment_reference(&self, token: &str, reference: &str) -> ApiResult<()> {
        ApiClient::save_payment_reference(self, token, reference).await
    }

    async fn verify_payment(&self, token: Option<&str>, reference: &str) -> ApiResult<PaymentStatus> {
        ApiClient::verify_payment(self, token, reference).await
    }
}
