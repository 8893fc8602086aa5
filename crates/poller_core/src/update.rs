use crate::{
    validate_document, Effect, JobId, JobStatus, Msg, Notification, NotificationLevel,
    PollerError, PollerState, StatusOutcome, StatusReport, UploadOutcome,
};

const DEFAULT_UPLOAD_FAILURE: &str = "Upload failed";
const DEFAULT_UPLOAD_SUCCESS: &str = "Your CV is being processed";
const DEFAULT_PROCESSING_ERROR: &str = "There was an error processing your CV";

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: PollerState, msg: Msg) -> (PollerState, Vec<Effect>) {
    let effects = match msg {
        Msg::Mounted => {
            if !state.is_accepting() {
                return (state, Vec::new());
            }
            match state.begin_probe() {
                Some(job_id) => vec![Effect::FetchStatus { job_id }],
                None => Vec::new(),
            }
        }
        Msg::FileSelected(file) => {
            if !state.is_accepting() {
                return (state, Vec::new());
            }
            match validate_document(&file) {
                Ok(()) => {
                    state.set_selected_file(file);
                    Vec::new()
                }
                Err(err) => {
                    state.set_error(err);
                    vec![notify(
                        NotificationLevel::Error,
                        "Invalid file type",
                        "Please upload a PDF file",
                    )]
                }
            }
        }
        Msg::SubmitClicked => submit(&mut state),
        Msg::UploadFinished { job_id, outcome } => upload_finished(&mut state, job_id, outcome),
        Msg::PollTick { job_id } => {
            if !state.is_accepting() || state.polling_job() != Some(job_id) {
                return (state, Vec::new());
            }
            // Skip the tick while the previous poll is unresolved.
            if state.begin_poll() {
                vec![Effect::FetchStatus { job_id }]
            } else {
                Vec::new()
            }
        }
        Msg::StatusReceived { job_id, outcome } => status_received(&mut state, job_id, outcome),
        Msg::TornDown => {
            if state.is_torn_down() {
                return (state, Vec::new());
            }
            let effects = stop(&mut state);
            state.tear_down();
            effects
        }
    };

    (state, effects)
}

fn submit(state: &mut PollerState) -> Vec<Effect> {
    if !state.is_accepting() || matches!(state.status(), JobStatus::Uploading) {
        return Vec::new();
    }
    let Some(file) = state.selected_file() else {
        state.set_error(PollerError::InvalidFileKind {
            reason: "no file selected".to_string(),
        });
        return vec![notify(
            NotificationLevel::Warning,
            "No file selected",
            "Please select a PDF file to upload",
        )];
    };
    if let Err(err) = validate_document(file) {
        state.set_error(err);
        state.clear_selected_file();
        return vec![notify(
            NotificationLevel::Error,
            "Invalid file type",
            "Please upload a PDF file",
        )];
    }

    let mut effects = Vec::with_capacity(2);
    if let Some(previous) = state.stop_polling() {
        effects.push(Effect::StopPolling { job_id: previous });
    }
    if let Some((job_id, file)) = state.begin_upload() {
        effects.push(Effect::Upload { job_id, file });
    }
    effects
}

fn upload_finished(state: &mut PollerState, job_id: JobId, outcome: UploadOutcome) -> Vec<Effect> {
    if !state.is_accepting() || state.current_job_id() != Some(job_id) {
        return Vec::new();
    }
    if !matches!(state.status(), JobStatus::Uploading) {
        return Vec::new();
    }

    match outcome {
        UploadOutcome::Accepted { message } => {
            if let Some(job) = state.job_mut() {
                job.status = JobStatus::Started;
                job.progress = 0;
            }
            state.clear_selected_file();
            state.start_polling(job_id);
            vec![
                notify(
                    NotificationLevel::Success,
                    "Upload Successful",
                    non_empty(message).unwrap_or_else(|| DEFAULT_UPLOAD_SUCCESS.to_string()),
                ),
                Effect::StartPolling { job_id },
            ]
        }
        UploadOutcome::Rejected { reason } => {
            let reason = non_empty(reason).unwrap_or_else(|| DEFAULT_UPLOAD_FAILURE.to_string());
            if let Some(job) = state.job_mut() {
                job.status = JobStatus::Idle;
                job.error = Some(reason.clone());
            }
            state.set_error(PollerError::UploadRejected {
                reason: reason.clone(),
            });
            vec![notify(NotificationLevel::Error, "Upload Failed", reason)]
        }
        UploadOutcome::Unauthorized => {
            if let Some(job) = state.job_mut() {
                job.status = JobStatus::Idle;
            }
            session_expired(state)
        }
    }
}

fn status_received(state: &mut PollerState, job_id: JobId, outcome: StatusOutcome) -> Vec<Effect> {
    if state.take_probe(job_id) {
        return probe_received(state, job_id, outcome);
    }
    if !state.is_accepting() || state.polling_job() != Some(job_id) {
        return Vec::new();
    }
    state.finish_poll();

    match outcome {
        StatusOutcome::Unauthorized => session_expired(state),
        StatusOutcome::Failed { reason } => {
            let first = state.note_transient_failure();
            state.set_error(PollerError::StatusFetchFailed {
                reason: reason.clone(),
            });
            if first {
                vec![notify(NotificationLevel::Error, "Status Check Failed", reason)]
            } else {
                Vec::new()
            }
        }
        StatusOutcome::Report(report) => {
            state.clear_transient_failure();
            apply_report(state, &report);
            match state.status() {
                JobStatus::Completed => {
                    let mut effects = stop(state);
                    effects.push(notify(
                        NotificationLevel::Success,
                        "Processing Complete",
                        "Your CV has been successfully processed",
                    ));
                    effects
                }
                JobStatus::Error => {
                    let mut effects = stop(state);
                    effects.push(notify(
                        NotificationLevel::Error,
                        "Processing Error",
                        non_empty(report.error)
                            .unwrap_or_else(|| DEFAULT_PROCESSING_ERROR.to_string()),
                    ));
                    effects
                }
                _ => Vec::new(),
            }
        }
    }
}

/// The mount-time check adopts a server-side job; a terminal report only
/// fills the view.
fn probe_received(state: &mut PollerState, job_id: JobId, outcome: StatusOutcome) -> Vec<Effect> {
    if !state.is_accepting() || state.job().is_some() {
        return Vec::new();
    }
    match outcome {
        StatusOutcome::Unauthorized => session_expired(state),
        StatusOutcome::Failed { reason } => {
            state.note_transient_failure();
            state.set_error(PollerError::StatusFetchFailed {
                reason: reason.clone(),
            });
            vec![notify(NotificationLevel::Error, "Status Check Failed", reason)]
        }
        StatusOutcome::Report(report) => {
            let status = JobStatus::from_server(&report.status);
            state.adopt_job(job_id, status.clone());
            apply_report(state, &report);
            if status.is_terminal() {
                Vec::new()
            } else {
                state.start_polling(job_id);
                vec![Effect::StartPolling { job_id }]
            }
        }
    }
}

fn apply_report(state: &mut PollerState, report: &StatusReport) {
    if let Some(fragment) = report.latest_data.as_ref() {
        state.merge_fragment(fragment);
    }
    let status = JobStatus::from_server(&report.status);
    if let Some(job) = state.job_mut() {
        if let Some(progress) = report.progress {
            // Never move backwards; out-of-range values are clamped.
            let progress = progress.clamp(0, 100) as u8;
            job.progress = job.progress.max(progress);
        }
        if status == JobStatus::Error {
            job.error = report.error.clone();
        }
        job.status = status;
    }
    state.mark_dirty();
}

fn session_expired(state: &mut PollerState) -> Vec<Effect> {
    let mut effects = stop(state);
    state.expire_session();
    effects.push(notify(
        NotificationLevel::Warning,
        "Session Expired",
        "Please log in again",
    ));
    effects.push(Effect::SessionExpired);
    effects
}

fn stop(state: &mut PollerState) -> Vec<Effect> {
    state
        .stop_polling()
        .map(|job_id| vec![Effect::StopPolling { job_id }])
        .unwrap_or_default()
}

fn notify(level: NotificationLevel, title: &str, description: impl Into<String>) -> Effect {
    Effect::Notify(Notification::new(level, title, description))
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.filter(|value| !value.trim().is_empty())
}
