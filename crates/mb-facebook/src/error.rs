//! Error types for mb-facebook

use thiserror::Error;

/// mb-facebook error type
#[derive(Error, Debug)]
pub enum FacebookError {
    #[error("Facebook page access token not set")]
    AccessTokenNotSet,

    #[error("Facebook verify token not set")]
    VerifyTokenNotSet,

    #[error("Facebook API error: {0}")]
    Api(String),

    #[error("Facebook API request failed: {0}")]
    Request(String),

    #[error("Facebook webhook verification failed")]
    WebhookVerificationFailed,

    #[error("Webhook server error: {0}")]
    Webhook(String),
}

impl From<reqwest::Error> for FacebookError {
    fn from(err: reqwest::Error) -> Self {
        FacebookError::Request(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, FacebookError>;
