use serde_json::{Map, Value};

use crate::view_model::{JobView, PollerViewModel, ProfileView};
use crate::{ExtractedProfile, PollerError, SelectedFile};

pub type JobId = u64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum JobStatus {
    #[default]
    Idle,
    Uploading,
    Started,
    /// Any non-terminal status string reported by the server.
    Processing(String),
    Completed,
    Error,
}

impl JobStatus {
    /// Interprets a server status string. Unknown strings are non-terminal.
    pub fn from_server(raw: &str) -> Self {
        let normalized = raw.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "started" => JobStatus::Started,
            "completed" => JobStatus::Completed,
            "error" => JobStatus::Error,
            _ => JobStatus::Processing(normalized),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }

    pub fn label(&self) -> &str {
        match self {
            JobStatus::Idle => "idle",
            JobStatus::Uploading => "uploading",
            JobStatus::Started => "started",
            JobStatus::Processing(raw) => raw,
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }
}

/// The single CV-processing attempt the poller drives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadJob {
    pub id: JobId,
    /// `None` when the job was adopted from the server on mount.
    pub file: Option<SelectedFile>,
    pub status: JobStatus,
    pub progress: u8,
    pub error: Option<String>,
    pub polls_issued: u32,
}

impl UploadJob {
    fn new(id: JobId, file: Option<SelectedFile>, status: JobStatus) -> Self {
        Self {
            id,
            file,
            status,
            progress: 0,
            error: None,
            polls_issued: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PollerState {
    next_job_id: JobId,
    selected_file: Option<SelectedFile>,
    job: Option<UploadJob>,
    profile: ExtractedProfile,
    /// Job whose interval timer is running.
    polling: Option<JobId>,
    poll_in_flight: bool,
    /// Job id reserved for the status check issued on mount.
    probe: Option<JobId>,
    transient_notified: bool,
    last_error: Option<PollerError>,
    session_expired: bool,
    torn_down: bool,
    dirty: bool,
}

impl PollerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> PollerViewModel {
        PollerViewModel {
            selected_file: self.selected_file.as_ref().map(|file| file.name.clone()),
            can_submit: self.can_submit(),
            job: self.job.as_ref().map(JobView::from_job),
            polling: self.polling.is_some(),
            profile: ProfileView::from_profile(&self.profile),
            last_error: self.last_error.as_ref().map(ToString::to_string),
            session_expired: self.session_expired,
            dirty: self.dirty,
        }
    }

    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn job(&self) -> Option<&UploadJob> {
        self.job.as_ref()
    }

    pub fn status(&self) -> JobStatus {
        self.job
            .as_ref()
            .map(|job| job.status.clone())
            .unwrap_or_default()
    }

    pub fn profile(&self) -> &ExtractedProfile {
        &self.profile
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    pub fn last_error(&self) -> Option<&PollerError> {
        self.last_error.as_ref()
    }

    pub fn polling_job(&self) -> Option<JobId> {
        self.polling
    }

    pub fn is_poll_in_flight(&self) -> bool {
        self.poll_in_flight
    }

    pub fn is_session_expired(&self) -> bool {
        self.session_expired
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// True once nothing further can happen without user input.
    pub fn is_settled(&self) -> bool {
        if self.torn_down || self.session_expired {
            return true;
        }
        if self.probe.is_some() || self.polling.is_some() {
            return false;
        }
        !matches!(
            self.job.as_ref().map(|job| &job.status),
            Some(JobStatus::Uploading)
        )
    }

    pub(crate) fn can_submit(&self) -> bool {
        !self.torn_down
            && !self.session_expired
            && self.selected_file.is_some()
            && !matches!(self.status(), JobStatus::Uploading)
    }

    pub(crate) fn is_accepting(&self) -> bool {
        !self.torn_down && !self.session_expired
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_selected_file(&mut self, file: SelectedFile) {
        self.selected_file = Some(file);
        self.mark_dirty();
    }

    pub(crate) fn set_error(&mut self, error: PollerError) {
        self.last_error = Some(error);
        self.mark_dirty();
    }

    pub(crate) fn current_job_id(&self) -> Option<JobId> {
        self.job.as_ref().map(|job| job.id)
    }

    pub(crate) fn job_mut(&mut self) -> Option<&mut UploadJob> {
        self.job.as_mut()
    }

    fn allocate_job_id(&mut self) -> JobId {
        self.next_job_id += 1;
        self.next_job_id
    }

    /// Reserves a job id for the mount-time status check.
    pub(crate) fn begin_probe(&mut self) -> Option<JobId> {
        if self.probe.is_some() || self.job.is_some() {
            return None;
        }
        let id = self.allocate_job_id();
        self.probe = Some(id);
        Some(id)
    }

    pub(crate) fn take_probe(&mut self, job_id: JobId) -> bool {
        if self.probe == Some(job_id) {
            self.probe = None;
            true
        } else {
            false
        }
    }

    /// Replaces any previous job with a fresh upload. The caller must have
    /// stopped the previous timer first.
    pub(crate) fn begin_upload(&mut self) -> Option<(JobId, SelectedFile)> {
        let file = self.selected_file.clone()?;
        let id = self.allocate_job_id();
        self.job = Some(UploadJob::new(id, Some(file.clone()), JobStatus::Uploading));
        self.profile = ExtractedProfile::new();
        self.probe = None;
        self.poll_in_flight = false;
        self.transient_notified = false;
        self.last_error = None;
        self.mark_dirty();
        Some((id, file))
    }

    /// Takes over a job the server already knows about.
    pub(crate) fn adopt_job(&mut self, id: JobId, status: JobStatus) {
        self.job = Some(UploadJob::new(id, None, status));
        self.mark_dirty();
    }

    pub(crate) fn clear_selected_file(&mut self) {
        self.selected_file = None;
        self.mark_dirty();
    }

    pub(crate) fn start_polling(&mut self, job_id: JobId) {
        self.polling = Some(job_id);
        self.poll_in_flight = false;
        self.mark_dirty();
    }

    /// Returns the job whose timer must be cancelled, at most once per start.
    pub(crate) fn stop_polling(&mut self) -> Option<JobId> {
        self.poll_in_flight = false;
        let stopped = self.polling.take();
        if stopped.is_some() {
            self.mark_dirty();
        }
        stopped
    }

    /// Marks a poll as outstanding. Returns false when one already is.
    pub(crate) fn begin_poll(&mut self) -> bool {
        if self.poll_in_flight {
            return false;
        }
        self.poll_in_flight = true;
        if let Some(job) = self.job.as_mut() {
            job.polls_issued += 1;
        }
        true
    }

    pub(crate) fn finish_poll(&mut self) {
        self.poll_in_flight = false;
    }

    /// Records a transient failure. Returns true only for the first one since
    /// the last successful poll.
    pub(crate) fn note_transient_failure(&mut self) -> bool {
        !std::mem::replace(&mut self.transient_notified, true)
    }

    pub(crate) fn clear_transient_failure(&mut self) {
        self.transient_notified = false;
    }

    pub(crate) fn merge_fragment(&mut self, fragment: &Map<String, Value>) {
        if self.profile.merge(fragment) > 0 {
            self.mark_dirty();
        }
    }

    pub(crate) fn expire_session(&mut self) {
        self.session_expired = true;
        self.probe = None;
        self.last_error = Some(PollerError::SessionExpired);
        self.mark_dirty();
    }

    pub(crate) fn tear_down(&mut self) {
        self.torn_down = true;
        self.probe = None;
        self.mark_dirty();
    }
}
