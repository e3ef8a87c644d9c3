use serde_json::json;

use super::models::{AuthPayload, GoogleSignInRequest, LoginRequest, SignupRequest, UserType};
use super::{ApiClient, ApiResult};

impl ApiClient {
    /// Providers and customers sign in through different endpoints.
    pub async fn login(&self, user_type: UserType, request: &LoginRequest) -> ApiResult<AuthPayload> {
        let path = match user_type {
            UserType::Provider => "/providers/login",
            UserType::Customer => "/auth/login",
        };
        self.post(path, request, None).await
    }

    pub async fn register(&self, request: &SignupRequest) -> ApiResult<AuthPayload> {
        self.post("/auth/register", request, None).await
    }

    /// Returns the server's confirmation message, if any.
    pub async fn forgot_password(&self, email: &str) -> ApiResult<Option<String>> {
        self.post_ack("/auth/forgot-password", &json!({ "email": email }))
            .await
    }

    pub async fn google_sign_in(&self, request: &GoogleSignInRequest) -> ApiResult<AuthPayload> {
        self.post("/auth/google", request, None).await
    }

    pub async fn logout(&self) -> ApiResult<()> {
        self.post_ack("/auth/logout", &json!({})).await?;
        Ok(())
    }
}
