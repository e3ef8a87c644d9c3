use thiserror::Error;

/// Failure of a backend call.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(#[from] reqwest::Error),
    /// Non-2xx status; `message` is the envelope message when the body had one.
    #[error("{message}")]
    Status { status: u16, message: String },
    /// 2xx with `success: false`.
    #[error("{0}")]
    Rejected(String),
    #[error("the server response did not include any data")]
    MissingData,
    #[error("unexpected server response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not read {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl ApiError {
    /// Message suitable for an alert dialog.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Transport(_) => {
                "Network error. Please check your connection and try again.".to_string()
            }
            ApiError::Decode(_) | ApiError::MissingData => {
                "Something went wrong. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// True when the server understood the request and said no: a
    /// `success: false` envelope or a 4xx status. Server faults (5xx) and
    /// requests that never completed are not rejections.
    pub fn is_rejection(&self) -> bool {
        match self {
            ApiError::Rejected(_) => true,
            ApiError::Status { status, .. } => (400..500).contains(status),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_message_is_shown_verbatim() {
        let err = ApiError::Status {
            status: 409,
            message: "Email already registered".to_string(),
        };
        assert_eq!(err.user_message(), "Email already registered");
        assert_eq!(err.status(), Some(409));
        assert!(err.is_rejection());
    }

    #[test]
    fn test_decode_errors_get_generic_message() {
        let decode = serde_json::from_str::<u8>("nope").unwrap_err();
        let err = ApiError::from(decode);
        assert_eq!(err.user_message(), "Something went wrong. Please try again.");
        assert!(!err.is_rejection());
    }

    #[test]
    fn test_server_faults_are_not_rejections() {
        let outage = ApiError::Status {
            status: 503,
            message: "Service unavailable".to_string(),
        };
        assert!(!outage.is_rejection());

        let not_found = ApiError::Status {
            status: 404,
            message: "Referral code not found".to_string(),
        };
        assert!(not_found.is_rejection());
        assert!(ApiError::Rejected("Invalid code".to_string()).is_rejection());
    }
}
