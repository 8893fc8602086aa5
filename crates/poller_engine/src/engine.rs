use std::collections::HashMap;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use poller_logging::{poller_debug, poller_info, poller_warn};

use crate::client::{ApiSettings, CvApi, ReqwestCvApi, TokenProvider};
use crate::timer::PollTimer;
use crate::{ApiError, EngineEvent, JobId, UploadRequest};

enum EngineCommand {
    Upload { job_id: JobId, request: UploadRequest },
    FetchStatus { job_id: JobId },
    StartPolling { job_id: JobId },
    StopPolling { job_id: JobId },
    WatchInterrupt,
    Shutdown,
}

/// Runs requests and poll timers on a background tokio runtime and reports
/// their results as `EngineEvent`s. All state decisions stay with the caller.
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: mpsc::Receiver<EngineEvent>,
    worker: Option<thread::JoinHandle<()>>,
}

impl EngineHandle {
    pub fn new(api: Arc<dyn CvApi>, poll_interval: Duration) -> std::io::Result<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let runtime = tokio::runtime::Runtime::new()?;

        let worker = thread::spawn(move || {
            let mut timers: HashMap<JobId, PollTimer> = HashMap::new();
            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::Upload { job_id, request } => {
                        let api = api.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = api.upload(job_id, request).await;
                            let _ = event_tx.send(EngineEvent::UploadCompleted { job_id, result });
                        });
                    }
                    EngineCommand::FetchStatus { job_id } => {
                        let api = api.clone();
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            let result = api.fetch_status(job_id).await;
                            let _ = event_tx.send(EngineEvent::StatusFetched { job_id, result });
                        });
                    }
                    EngineCommand::StartPolling { job_id } => {
                        let timer = PollTimer::spawn(
                            runtime.handle(),
                            job_id,
                            poll_interval,
                            event_tx.clone(),
                        );
                        if let Some(previous) = timers.insert(job_id, timer) {
                            poller_warn!("replacing running poll timer for job_id={}", job_id);
                            previous.cancel();
                        }
                    }
                    EngineCommand::StopPolling { job_id } => match timers.remove(&job_id) {
                        Some(timer) => timer.cancel(),
                        None => poller_debug!("no poll timer for job_id={}", job_id),
                    },
                    EngineCommand::WatchInterrupt => {
                        let event_tx = event_tx.clone();
                        runtime.spawn(async move {
                            if tokio::signal::ctrl_c().await.is_ok() {
                                let _ = event_tx.send(EngineEvent::Interrupted);
                            }
                        });
                    }
                    EngineCommand::Shutdown => break,
                }
            }
            for (_, timer) in timers.drain() {
                timer.cancel();
            }
            runtime.shutdown_background();
        });

        Ok(Self {
            cmd_tx,
            event_rx,
            worker: Some(worker),
        })
    }

    /// Engine backed by the reqwest client.
    pub fn with_reqwest(
        settings: ApiSettings,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ApiError> {
        let poll_interval = settings.poll_interval;
        let api = ReqwestCvApi::new(settings, tokens)?;
        poller_info!(
            "engine targeting {} (poll every {:?})",
            api.settings().base_url,
            poll_interval
        );
        Self::new(Arc::new(api), poll_interval).map_err(|err| {
            ApiError::new(crate::FailureKind::Network, format!("tokio runtime: {err}"))
        })
    }

    pub fn upload(&self, job_id: JobId, request: UploadRequest) {
        self.send(EngineCommand::Upload { job_id, request });
    }

    pub fn fetch_status(&self, job_id: JobId) {
        self.send(EngineCommand::FetchStatus { job_id });
    }

    pub fn start_polling(&self, job_id: JobId) {
        self.send(EngineCommand::StartPolling { job_id });
    }

    pub fn stop_polling(&self, job_id: JobId) {
        self.send(EngineCommand::StopPolling { job_id });
    }

    /// Reports Ctrl-C as `EngineEvent::Interrupted`.
    pub fn watch_interrupt(&self) {
        self.send(EngineCommand::WatchInterrupt);
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.recv_timeout(timeout).ok()
    }

    /// Cancels every timer and stops the worker. Requests still in flight are
    /// abandoned and their results never delivered.
    pub fn shutdown(&mut self) {
        self.send(EngineCommand::Shutdown);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
