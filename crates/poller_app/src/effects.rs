use std::sync::Arc;

use bytes::Bytes;
use poller_core::{
    Effect, Msg, SelectedFile, StatusOutcome, StatusReport, UploadOutcome,
    PDF_CONTENT_TYPE,
};
use poller_engine::{ApiError, EngineEvent, EngineHandle, StatusResponse, UploadReceipt, UploadRequest};
use poller_logging::{poller_error, poller_info, poller_warn};

use crate::render;
use crate::session::SessionStore;

const CONNECTION_HELP: &str = "Unable to connect to the server. Please check your connection.";

/// Executes core effects against the engine and the session store.
pub struct EffectRunner {
    engine: EngineHandle,
    session: Arc<SessionStore>,
}

impl EffectRunner {
    pub fn new(engine: EngineHandle, session: Arc<SessionStore>) -> Self {
        Self { engine, session }
    }

    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    pub fn run(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Upload { job_id, file } => {
                    poller_info!(
                        "Upload job_id={} file={} bytes={}",
                        job_id,
                        file.name,
                        file.len()
                    );
                    self.engine.upload(job_id, upload_request(&file));
                }
                Effect::FetchStatus { job_id } => self.engine.fetch_status(job_id),
                Effect::StartPolling { job_id } => {
                    poller_info!("Polling started for job_id={}", job_id);
                    self.engine.start_polling(job_id);
                }
                Effect::StopPolling { job_id } => {
                    poller_info!("Polling stopped for job_id={}", job_id);
                    self.engine.stop_polling(job_id);
                }
                Effect::Notify(notification) => {
                    poller_info!("Notify {:?}: {}", notification.level, notification.title);
                    println!("{}", render::notification(&notification));
                }
                Effect::SessionExpired => {
                    poller_warn!("Session expired; clearing stored credential");
                    if let Err(err) = self.session.clear() {
                        poller_error!("Failed to clear session: {}", err);
                    }
                }
            }
        }
    }
}

/// Translates an engine event into the message the state machine expects.
pub fn event_to_msg(event: EngineEvent) -> Msg {
    match event {
        EngineEvent::UploadCompleted { job_id, result } => Msg::UploadFinished {
            job_id,
            outcome: upload_outcome(result),
        },
        EngineEvent::StatusFetched { job_id, result } => Msg::StatusReceived {
            job_id,
            outcome: status_outcome(result),
        },
        EngineEvent::PollTick { job_id } => Msg::PollTick { job_id },
        EngineEvent::Interrupted => Msg::TornDown,
    }
}

fn upload_request(file: &SelectedFile) -> UploadRequest {
    UploadRequest {
        file_name: file.name.clone(),
        content_type: file
            .content_type
            .clone()
            .unwrap_or_else(|| PDF_CONTENT_TYPE.to_string()),
        bytes: Bytes::copy_from_slice(&file.bytes),
    }
}

fn upload_outcome(result: Result<UploadReceipt, ApiError>) -> UploadOutcome {
    match result {
        Ok(receipt) => UploadOutcome::Accepted {
            message: receipt.message,
        },
        Err(err) if err.is_unauthorized() => UploadOutcome::Unauthorized,
        Err(err) => {
            poller_warn!("Upload failed: {}", err);
            let reason = if err.is_connectivity() {
                Some(CONNECTION_HELP.to_string())
            } else {
                err.server_message
            };
            UploadOutcome::Rejected { reason }
        }
    }
}

fn status_outcome(result: Result<StatusResponse, ApiError>) -> StatusOutcome {
    match result {
        Ok(response) => StatusOutcome::Report(StatusReport {
            status: response.status.clone(),
            progress: response.progress,
            error: response.error.clone(),
            latest_data: response.into_fragment(),
        }),
        Err(err) if err.is_unauthorized() => StatusOutcome::Unauthorized,
        Err(err) => {
            poller_warn!("Status check failed: {}", err);
            let reason = if err.is_connectivity() {
                CONNECTION_HELP.to_string()
            } else {
                err.server_message
                    .clone()
                    .unwrap_or_else(|| format!("Failed to fetch processing status ({})", err.kind))
            };
            StatusOutcome::Failed { reason }
        }
    }
}
