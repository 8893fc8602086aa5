use crate::{JobId, SelectedFile};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Send the file to the upload endpoint.
    Upload { job_id: JobId, file: SelectedFile },
    /// Fetch the processing status once.
    FetchStatus { job_id: JobId },
    /// Start the interval timer that produces `Msg::PollTick`.
    StartPolling { job_id: JobId },
    /// Cancel the interval timer. Emitted at most once per `StartPolling`.
    StopPolling { job_id: JobId },
    Notify(Notification),
    /// The credential is gone; the session store should log the user out.
    SessionExpired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A user-facing toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn new(
        level: NotificationLevel,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            level,
            title: title.into(),
            description: description.into(),
        }
    }
}
