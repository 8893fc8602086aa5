use thiserror::Error;

/// Failures surfaced by the poller to the user.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerError {
    /// The selected file is missing or not a PDF document. No request was sent.
    #[error("invalid file kind: {reason}")]
    InvalidFileKind { reason: String },
    /// The upload endpoint answered with a non-success response.
    #[error("upload rejected: {reason}")]
    UploadRejected { reason: String },
    /// A status poll failed; polling continues.
    #[error("status fetch failed: {reason}")]
    StatusFetchFailed { reason: String },
    /// The bearer credential is missing or no longer accepted.
    #[error("session expired")]
    SessionExpired,
}

impl PollerError {
    /// Whether the current flow can continue after this error.
    pub fn is_fatal(&self) -> bool {
        matches!(self, PollerError::SessionExpired)
    }
}
