//! The `{success, data, message}` wrapper every backend response uses.

use super::ApiError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    /// Absent on some 2xx responses; treated as success then.
    #[serde(default)]
    pub success: Option<bool>,
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.success.unwrap_or(true)
    }

    fn rejection(message: Option<String>) -> ApiError {
        ApiError::Rejected(message.unwrap_or_else(|| "Request failed".to_string()))
    }

    /// Unwrap the payload, turning `success: false` into [`ApiError::Rejected`].
    pub fn into_data(self) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(Self::rejection(self.message));
        }
        self.data.ok_or(ApiError::MissingData)
    }

    /// For endpoints whose payload is irrelevant; returns the server message.
    pub fn into_message(self) -> Result<Option<String>, ApiError> {
        if self.is_success() {
            Ok(self.message)
        } else {
            Err(Self::rejection(self.message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_success_with_data() {
        let env: Envelope<Vec<String>> =
            serde_json::from_str(r#"{"success":true,"data":["a","b"]}"#).unwrap();
        assert_eq!(env.into_data().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_rejection_carries_server_message() {
        let env: Envelope<Value> =
            serde_json::from_str(r#"{"success":false,"message":"Invalid referral code"}"#)
                .unwrap();
        match env.into_data() {
            Err(ApiError::Rejected(msg)) => assert_eq!(msg, "Invalid referral code"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_missing_data_is_an_error() {
        let env: Envelope<Value> = serde_json::from_str(r#"{"success":true}"#).unwrap();
        assert!(matches!(env.into_data(), Err(ApiError::MissingData)));
    }

    #[test]
    fn test_message_only_response() {
        let env: Envelope<Value> =
            serde_json::from_str(r#"{"message":"Reset link sent"}"#).unwrap();
        assert_eq!(env.into_message().unwrap().as_deref(), Some("Reset link sent"));
    }
}
