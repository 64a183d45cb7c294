use antigenapp_client::{ClientError, ErrorKind};
use antigenapp_core::CoreError;

/// Errors returned by entity store operations.
///
/// Every variant except `Cancelled` is also published as a notification.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The request failed in transport or was rejected by the API.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// The payload failed local validation and was never sent.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// The caller's cancellation token fired before the response arrived.
    #[error("Request cancelled")]
    Cancelled,
}

impl StoreError {
    /// Error class, with local validation failures reported as
    /// `Validation` and cancellation as `None`.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            StoreError::Client(err) => Some(err.kind()),
            StoreError::Invalid(_) => Some(ErrorKind::Validation),
            StoreError::Cancelled => None,
        }
    }

    /// Text for a user notification, or `None` when nothing should be shown.
    pub fn user_message(&self) -> Option<String> {
        match self {
            StoreError::Client(err) => Some(err.user_message()),
            StoreError::Invalid(err) => Some(err.to_string()),
            StoreError::Cancelled => None,
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Client(ClientError::Decode(err))
    }
}
