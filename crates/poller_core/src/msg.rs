use serde_json::{Map, Value};

use crate::{JobId, SelectedFile};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// The poller came up; check whether the server already has a job for us.
    Mounted,
    /// User picked a file.
    FileSelected(SelectedFile),
    /// User asked to upload the selected file.
    SubmitClicked,
    /// Engine finished an upload request.
    UploadFinished {
        job_id: JobId,
        outcome: UploadOutcome,
    },
    /// Interval timer fired for a job.
    PollTick { job_id: JobId },
    /// Engine finished a status request.
    StatusReceived {
        job_id: JobId,
        outcome: StatusOutcome,
    },
    /// The poller is going away; nothing may be applied after this.
    TornDown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Accepted { message: Option<String> },
    Rejected { reason: Option<String> },
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StatusOutcome {
    Report(StatusReport),
    Unauthorized,
    Failed { reason: String },
}

/// One status response. Absent fields are a normal case, not an error.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StatusReport {
    pub status: String,
    pub progress: Option<i64>,
    pub latest_data: Option<Map<String, Value>>,
    pub error: Option<String>,
}

impl StatusReport {
    pub fn new(status: impl Into<String>, progress: i64) -> Self {
        Self {
            status: status.into(),
            progress: Some(progress),
            ..Self::default()
        }
    }

    pub fn with_data(mut self, latest_data: Map<String, Value>) -> Self {
        self.latest_data = Some(latest_data);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
