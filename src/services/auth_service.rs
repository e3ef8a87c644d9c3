//! Sign-in, sign-up, password reset and Google sign-in.
//!
//! Input is validated locally first; nothing reaches the backend unless it
//! passes. Every successful exchange yields a [`Session`] for the caller to
//! persist.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

use crate::api::models::{
    AuthPayload, GoogleSignInRequest, LoginRequest, SignupRequest, UserType,
};
use crate::api::{ApiClient, ApiError, ApiResult};
use crate::session::Session;
use crate::utils::validation::{
    require, validate_email, validate_password, validate_phone, ValidationError,
};

/// Credential exchange with the backend.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Sign in on the endpoint for `user_type`.
    async fn login(&self, user_type: UserType, request: &LoginRequest) -> ApiResult<AuthPayload>;
    /// Create an account and sign it in.
    async fn register(&self, request: &SignupRequest) -> ApiResult<AuthPayload>;
    /// Ask for a reset email. Returns the server's message, if any.
    async fn forgot_password(&self, email: &str) -> ApiResult<Option<String>>;
    async fn google_sign_in(&self, request: &GoogleSignInRequest) -> ApiResult<AuthPayload>;
    async fn logout(&self) -> ApiResult<()>;
}

#[async_trait]
impl AuthBackend for ApiClient {
    async fn login(&self, user_type: UserType, request: &LoginRequest) -> ApiResult<AuthPayload> {
        ApiClient::login(self, user_type, request).await
    }

    async fn register(&self, request: &SignupRequest) -> ApiResult<AuthPayload> {
        ApiClient::register(self, request).await
    }

    async fn forgot_password(&self, email: &str) -> ApiResult<Option<String>> {
        ApiClient::forgot_password(self, email).await
    }

    async fn google_sign_in(&self, request: &GoogleSignInRequest) -> ApiResult<AuthPayload> {
        ApiClient::google_sign_in(self, request).await
    }

    async fn logout(&self) -> ApiResult<()> {
        ApiClient::logout(self).await
    }
}

/// Errors raised by [`AuthController`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// A form field failed a local check; no request was made.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The server refused the credentials or could not be reached.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// No Google client ID is set in the config file.
    #[error("Google sign-in is not configured for this platform")]
    GoogleNotConfigured,
}

impl AuthError {
    /// Text suitable for an alert. Server messages are passed through.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Api(err) => err.user_message(),
            other => other.to_string(),
        }
    }
}

/// Fields of the sign-up form.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

impl SignupForm {
    /// Check every field. The first failure is returned.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(&self.full_name, "Full name")?;
        validate_email(&self.email)?;
        validate_phone(&self.phone, "phone number")?;
        validate_password(&self.password, &self.confirm_password)
    }
}

/// Login, sign-up, password reset and Google sign-in.
///
/// Every operation validates locally before calling the backend and turns
/// a successful response into a [`Session`]. Storing the session is left
/// to the caller.
pub struct AuthController<B> {
    backend: B,
    google_client_id: Option<String>,
}

impl<B: AuthBackend> AuthController<B> {
    /// Create a controller. Google sign-in is refused when
    /// `google_client_id` is `None`.
    pub fn new(backend: B, google_client_id: Option<String>) -> Self {
        Self {
            backend,
            google_client_id,
        }
    }

    /// Sign in with email and password.
    ///
    /// # Arguments
    ///
    /// * `user_type` - Selects the customer or provider login endpoint.
    /// * `email` - Trimmed before it is sent.
    /// * `password` - Sent as typed.
    ///
    /// # Errors
    ///
    /// [`AuthError::Validation`] for a malformed email or empty password,
    /// without a request. Server refusals come back as [`AuthError::Api`].
    pub async fn login(
        &self,
        user_type: UserType,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        validate_email(email)?;
        require(password, "Password")?;

        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let payload = self.backend.login(user_type, &request).await?;
        info!("Logged in as {:?}", user_type);
        Ok(payload.into())
    }

    /// Create an account from the sign-up form. Text fields are trimmed;
    /// the password is sent as typed.
    pub async fn signup(&self, user_type: UserType, form: &SignupForm) -> Result<Session, AuthError> {
        form.validate()?;

        let request = SignupRequest {
            full_name: form.full_name.trim().to_string(),
            email: form.email.trim().to_string(),
            phone: form.phone.trim().to_string(),
            password: form.password.clone(),
            user_type,
        };
        let payload = self.backend.register(&request).await?;
        info!("Account created ({:?})", user_type);
        Ok(payload.into())
    }

    /// Returns the message to show once the reset email is on its way.
    pub async fn forgot_password(&self, email: &str) -> Result<String, AuthError> {
        validate_email(email)?;
        let email = email.trim();
        let message = self.backend.forgot_password(email).await?;
        Ok(message.unwrap_or_else(|| {
            format!("If an account exists for {email}, a reset link has been sent.")
        }))
    }

    /// Exchange an ID token obtained from Google for a backend session.
    pub async fn google_sign_in(
        &self,
        user_type: UserType,
        id_token: &str,
    ) -> Result<Session, AuthError> {
        let client_id = self
            .google_client_id
            .clone()
            .ok_or(AuthError::GoogleNotConfigured)?;
        require(id_token, "Google ID token")?;

        let request = GoogleSignInRequest {
            id_token: id_token.trim().to_string(),
            client_id,
            user_type,
        };
        let payload = self.backend.google_sign_in(&request).await?;
        Ok(payload.into())
    }

    /// Server-side logout is best-effort; the local session is dropped
    /// by the caller regardless.
    pub async fn logout(&self) {
        if let Err(e) = self.backend.logout().await {
            warn!("Server logout failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::User;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeBackend {
        calls: AtomicUsize,
        last_login: Mutex<Option<(UserType, String)>>,
        reject_with: Option<String>,
    }

    impl FakeBackend {
        fn payload(&self) -> ApiResult<AuthPayload> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(message) = &self.reject_with {
                return Err(ApiError::Rejected(message.clone()));
            }
            Ok(AuthPayload {
                token: "tok".to_string(),
                user: User {
                    email: "ada@example.com".to_string(),
                    ..User::default()
                },
            })
        }
    }

    #[async_trait]
    impl AuthBackend for FakeBackend {
        async fn login(&self, user_type: UserType, request: &LoginRequest) -> ApiResult<AuthPayload> {
            *self.last_login.lock().unwrap() = Some((user_type, request.email.clone()));
            self.payload()
        }

        async fn register(&self, _request: &SignupRequest) -> ApiResult<AuthPayload> {
            self.payload()
        }

        async fn forgot_password(&self, _email: &str) -> ApiResult<Option<String>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(None)
        }

        async fn google_sign_in(&self, _request: &GoogleSignInRequest) -> ApiResult<AuthPayload> {
            self.payload()
        }

        async fn logout(&self) -> ApiResult<()> {
            Err(ApiError::Status {
                status: 401,
                message: "Session expired".to_string(),
            })
        }
    }

    fn controller() -> AuthController<FakeBackend> {
        AuthController::new(FakeBackend::default(), None)
    }

    #[tokio::test]
    async fn test_login_trims_email_and_uses_user_type() {
        let auth = controller();
        let session = auth
            .login(UserType::Provider, "  ada@example.com ", "secret1")
            .await
            .unwrap();

        assert_eq!(session.token, "tok");
        let last = auth.backend.last_login.lock().unwrap().clone();
        assert_eq!(last, Some((UserType::Provider, "ada@example.com".to_string())));
    }

    #[tokio::test]
    async fn test_invalid_login_makes_no_call() {
        let auth = controller();
        let err = auth
            .login(UserType::Customer, "not-an-email", "secret1")
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Validation(ValidationError::InvalidEmail)));
        assert_eq!(auth.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signup_password_mismatch() {
        let auth = controller();
        let form = SignupForm {
            full_name: "Ada Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone: "08012345678".to_string(),
            password: "abc123".to_string(),
            confirm_password: "abc124".to_string(),
        };

        let err = auth.signup(UserType::Customer, &form).await.unwrap_err();
        assert_eq!(err.user_message(), "Passwords do not match");
        assert_eq!(auth.backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_server_rejection_is_surfaced() {
        let auth = AuthController::new(
            FakeBackend {
                reject_with: Some("Invalid credentials".to_string()),
                ..FakeBackend::default()
            },
            None,
        );
        let err = auth
            .login(UserType::Customer, "ada@example.com", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[tokio::test]
    async fn test_google_requires_client_id() {
        let auth = controller();
        let err = auth
            .google_sign_in(UserType::Customer, "id-token")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::GoogleNotConfigured));

        let configured = AuthController::new(FakeBackend::default(), Some("web".to_string()));
        assert!(configured
            .google_sign_in(UserType::Customer, "id-token")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_forgot_password_default_message() {
        let auth = controller();
        let message = auth.forgot_password("ada@example.com").await.unwrap();
        assert!(message.contains("ada@example.com"));
    }

    #[tokio::test]
    async fn test_logout_failure_is_not_fatal() {
        controller().logout().await;
    }
}
