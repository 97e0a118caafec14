//! Error taxonomy for the generate path.

use thiserror::Error;

/// Everything that can stop a commentary request.
///
/// Store failures never reach callers of
/// [`SlotService::generate`](crate::service::SlotService::generate); the
/// `Storage` variant exists for direct users of the store helpers.
#[derive(Debug, Error)]
pub enum SlotError {
    /// Shared secret missing or wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// A request parameter is missing, non-numeric or out of range.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The session lacks fields its mode requires.
    #[error("missing required parameters: {}", .0.join(", "))]
    MissingParameters(Vec<&'static str>),

    /// The completion API call failed.
    #[error("completion failed: {0}")]
    Upstream(String),

    /// Reading or writing the exchange store failed.
    #[error("storage failed: {0}")]
    Storage(String),

    /// Process configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
}

impl SlotError {
    /// Whether the caller sent a bad request (as opposed to a server fault).
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            SlotError::Unauthorized
                | SlotError::InvalidParameters(_)
                | SlotError::MissingParameters(_)
        )
    }
}
