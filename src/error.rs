use thiserror::Error;

#[derive(Debug, Error)]
pub enum BotError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Invalid value for `{field}`: expected {expected}")]
    TypeMismatch { field: String, expected: String },
    #[error("Remote call failed: {0}")]
    RemoteCall(String),
    #[error("Request error: {0}")]
    Request(String),
    #[error("Response error: {0}")]
    Response(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BotError {
    /// Errors caused by what the user typed. These are reported back verbatim.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BotError::Validation(_) | BotError::NotFound(_) | BotError::TypeMismatch { .. }
        )
    }

    /// Errors raised by the WebUI backend or the transport in front of it.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            BotError::RemoteCall(_) | BotError::Request(_) | BotError::Response(_)
        )
    }
}

impl From<serde_json::Error> for BotError {
    fn from(e: serde_json::Error) -> Self {
        BotError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for BotError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BotError::Response(e.to_string())
        } else {
            BotError::Request(e.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_error_classification() {
        assert!(BotError::Validation("x".into()).is_user_error());
        assert!(BotError::NotFound("x".into()).is_user_error());
        assert!(BotError::TypeMismatch {
            field: "steps".into(),
            expected: "integer".into()
        }
        .is_user_error());
        assert!(!BotError::RemoteCall("x".into()).is_user_error());
        assert!(BotError::RemoteCall("x".into()).is_remote());
        assert!(!BotError::Config("x".into()).is_remote());
    }

    #[test]
    fn test_type_mismatch_message_names_type() {
        let err = BotError::TypeMismatch {
            field: "steps".into(),
            expected: "integer".into(),
        };
        assert_eq!(err.to_string(), "Invalid value for `steps`: expected integer");
    }
}
