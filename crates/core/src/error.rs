use thiserror::Error;

pub type MailerResult<T> = Result<T, MailerError>;

#[derive(Error, Debug)]
pub enum MailerError {
    /// A required field was missing or empty. Raised before any network call.
    #[error("{0}")]
    InvalidRequest(String),

    /// The gateway only knows `send` and `status`.
    #[error("'{0}' is not an available method, use 'send' or 'status' instead")]
    UnsupportedMethod(String),

    #[error("SMS gateway unreachable: {0}")]
    GatewayUnreachable(String),

    /// The provider understood the call and refused it. Carries the provider text verbatim.
    #[error("{0}")]
    GatewayRejected(String),

    #[error("Malformed gateway response: {0}")]
    MalformedResponse(String),

    #[error("Mailing store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl MailerError {
    /// Errors the HTTP caller is allowed to see verbatim.
    pub fn is_caller_facing(&self) -> bool {
        matches!(
            self,
            MailerError::InvalidRequest(_) | MailerError::GatewayRejected(_)
        )
    }
}
