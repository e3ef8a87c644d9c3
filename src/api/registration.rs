//! Provider registration: account creation, step progress, uploads, payment.

use serde_json::{json, Value};

use super::models::{
    AuthPayload, LocalFile, PaymentInit, PaymentRequest, PaymentStatus, PaymentVerification,
    ProgressUpdate, ProviderSignup, ReferralCheck, UploadResponse,
};
use super::{path_segment, single_file_form, ApiClient, ApiResult};

impl ApiClient {
    /// Step 1: creates the account and returns its session.
    pub async fn register_provider(&self, signup: &ProviderSignup) -> ApiResult<AuthPayload> {
        self.post("/providers/register/step/1", signup, None).await
    }

    pub async fn save_registration_progress(
        &self,
        token: &str,
        step: u8,
        data: Value,
    ) -> ApiResult<()> {
        let body = ProgressUpdate { step, data };
        self.put_ack("/providers/register/progress", &body, Some(token))
            .await?;
        Ok(())
    }

    pub async fn upload_document(
        &self,
        token: Option<&str>,
        file: &LocalFile,
    ) -> ApiResult<UploadResponse> {
        let form = single_file_form("document", file).await?;
        self.post_multipart("/providers/upload/document", form, token)
            .await
    }

    pub async fn upload_brand_image(
        &self,
        token: Option<&str>,
        file: &LocalFile,
    ) -> ApiResult<UploadResponse> {
        let form = single_file_form("image", file).await?;
        self.post_multipart("/providers/upload/brand-image", form, token)
            .await
    }

    pub async fn validate_referral(&self, code: &str) -> ApiResult<ReferralCheck> {
        let path = format!("/referrals/validate/{}", path_segment(code));
        self.get(&path, &[]).await
    }

    pub async fn initialize_payment(
        &self,
        token: Option<&str>,
        request: &PaymentRequest,
    ) -> ApiResult<PaymentInit> {
        self.post("/payments/initialize", request, token).await
    }

    pub async fn save_payment_reference(&self, token: &str, reference: &str) -> ApiResult<()> {
        self.put_ack(
            "/providers/register/payment-reference",
            &json!({ "reference": reference }),
            Some(token),
        )
        .await?;
        Ok(())
    }

    pub async fn verify_payment(
        &self,
        token: Option<&str>,
        reference: &str,
    ) -> ApiResult<PaymentStatus> {
        let path = format!("/payments/verify/{}", path_segment(reference));
        let verification: PaymentVerification = self.get_with_token(&path, &[], token).await?;
        Ok(verification.status)
    }
}
