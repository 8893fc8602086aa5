use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use poller_core::{update, Effect, JobStatus, Msg, PollerState, PollerViewModel, SelectedFile};
use poller_engine::{EngineEvent, EngineHandle, TokenProvider};
use poller_logging::{poller_debug, poller_info};

use crate::config::AppConfig;
use crate::effects::{event_to_msg, EffectRunner};
use crate::render;
use crate::session::SessionStore;

/// How long the loop waits for an engine event before re-checking state.
const IDLE_WAIT: Duration = Duration::from_millis(250);

/// How a dashboard run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed,
    Failed,
    /// Nothing to follow: no job on the server, or the upload was refused.
    Idle,
    SessionExpired,
    Interrupted,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        match self {
            RunOutcome::Completed | RunOutcome::Idle => 0,
            RunOutcome::Failed => 1,
            RunOutcome::SessionExpired => 2,
            RunOutcome::Interrupted => 130,
        }
    }
}

/// Owns the poller state and feeds it messages one at a time.
pub struct Dashboard {
    state: PollerState,
    runner: EffectRunner,
    last_status: Option<String>,
    interrupted: bool,
}

impl Dashboard {
    pub fn new(runner: EffectRunner) -> Self {
        Self {
            state: PollerState::new(),
            runner,
            last_status: None,
            interrupted: false,
        }
    }

    pub fn view(&self) -> PollerViewModel {
        self.state.view()
    }

    pub fn dispatch(&mut self, msg: Msg) {
        poller_debug!("dispatch {:?}", msg);
        let state = std::mem::take(&mut self.state);
        let (state, effects) = update(state, msg);
        self.state = state;
        self.run_effects(effects);
        if self.state.consume_dirty() {
            self.render_status();
        }
    }

    /// Pumps engine events until the state machine has nothing left to wait for.
    pub fn run_until_settled(&mut self) -> RunOutcome {
        while !self.state.is_settled() {
            if let Some(event) = self.runner.engine().recv_timeout(IDLE_WAIT) {
                self.handle_event(event);
            }
        }
        self.outcome()
    }

    pub fn handle_event(&mut self, event: EngineEvent) {
        let msg = event_to_msg(event);
        self.interrupted |= msg == Msg::TornDown;
        self.dispatch(msg);
    }

    /// Result of the run so far, judged from the current state.
    pub fn outcome(&self) -> RunOutcome {
        if self.interrupted {
            return RunOutcome::Interrupted;
        }
        if self.state.is_session_expired() {
            return RunOutcome::SessionExpired;
        }
        match self.state.status() {
            JobStatus::Completed => RunOutcome::Completed,
            JobStatus::Error => RunOutcome::Failed,
            _ if self.state.last_error().is_some() => RunOutcome::Failed,
            _ => RunOutcome::Idle,
        }
    }

    /// Releases the timer if the loop is left early.
    pub fn tear_down(&mut self) {
        self.dispatch(Msg::TornDown);
    }

    fn run_effects(&mut self, effects: Vec<Effect>) {
        if !effects.is_empty() {
            self.runner.run(effects);
        }
    }

    fn render_status(&mut self) {
        let Some(job) = self.state.view().job else {
            return;
        };
        let line = render::status_line(&job);
        if self.last_status.as_deref() != Some(line.as_str()) {
            println!("{line}");
            self.last_status = Some(line);
        }
    }
}

fn read_cv(path: &Path) -> anyhow::Result<SelectedFile> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("cv.pdf")
        .to_string();
    Ok(SelectedFile::from_name(name, bytes))
}

fn open_dashboard(config: &AppConfig, session: Arc<SessionStore>) -> anyhow::Result<Dashboard> {
    if !session.is_logged_in() {
        bail!("not logged in: run `cv_poller --login <token>` or set CV_POLLER_TOKEN");
    }
    let tokens: Arc<dyn TokenProvider> = session.clone();
    let engine = EngineHandle::with_reqwest(config.api_settings(), tokens)
        .context("failed to start engine")?;
    engine.watch_interrupt();
    Ok(Dashboard::new(EffectRunner::new(engine, session)))
}

/// Uploads `path` and follows processing until a terminal state.
pub fn run_upload(
    config: &AppConfig,
    session: Arc<SessionStore>,
    path: &Path,
) -> anyhow::Result<RunOutcome> {
    let file = read_cv(path)?;
    let mut dashboard = open_dashboard(config, session)?;
    poller_info!("Uploading {} ({} bytes)", file.name, file.len());

    dashboard.dispatch(Msg::FileSelected(file));
    dashboard.dispatch(Msg::SubmitClicked);
    let outcome = dashboard.run_until_settled();
    finish(&mut dashboard);
    Ok(outcome)
}

/// Checks for a job already running on the server and follows it.
pub fn run_status(config: &AppConfig, session: Arc<SessionStore>) -> anyhow::Result<RunOutcome> {
    let mut dashboard = open_dashboard(config, session)?;
    dashboard.dispatch(Msg::Mounted);
    let outcome = dashboard.run_until_settled();
    if dashboard.view().job.is_none() && outcome == RunOutcome::Idle {
        println!("No CV processing job found.");
    }
    finish(&mut dashboard);
    Ok(outcome)
}

fn finish(dashboard: &mut Dashboard) {
    dashboard.tear_down();
    let view = dashboard.view();
    if !view.profile.is_empty() {
        print!("{}", render::profile(&view.profile));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const STATUS_PATH: &str = "/v1/profile/cv/processing-status";

    fn config_for(api_url: &str, dir: &TempDir) -> AppConfig {
        AppConfig {
            api_url: api_url.to_string(),
            poll_interval_ms: 100,
            session_file: dir.path().join(".session.ron"),
            log_file: None,
            ..AppConfig::default()
        }
    }

    fn logged_in(config: &AppConfig) -> Arc<SessionStore> {
        Arc::new(SessionStore::with_token(
            &config.session_file,
            "tok".to_string(),
        ))
    }

    async fn status_server(response: ResponseTemplate) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(STATUS_PATH))
            .respond_with(response)
            .mount(&server)
            .await;
        server
    }

    async fn status_outcome(server: &MockServer) -> RunOutcome {
        let dir = TempDir::new().unwrap();
        let config = config_for(&server.uri(), &dir);
        let session = logged_in(&config);
        tokio::task::spawn_blocking(move || run_status(&config, session))
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn exit_codes_follow_outcome() {
        assert_eq!(RunOutcome::Completed.exit_code(), 0);
        assert_eq!(RunOutcome::Idle.exit_code(), 0);
        assert_eq!(RunOutcome::Failed.exit_code(), 1);
        assert_eq!(RunOutcome::SessionExpired.exit_code(), 2);
        assert_eq!(RunOutcome::Interrupted.exit_code(), 130);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_of_completed_job_exits_cleanly() {
        let server = status_server(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "progress": 100,
            "latest_data": {"skills": ["Go"]}
        })))
        .await;

        let outcome = status_outcome(&server).await;
        assert_eq!(outcome, RunOutcome::Completed);
        assert_eq!(outcome.exit_code(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn status_of_failed_job_is_a_failure() {
        let server = status_server(ResponseTemplate::new(200).set_body_json(json!({
            "status": "error",
            "progress": 30,
            "error": "Unreadable PDF"
        })))
        .await;

        let outcome = status_outcome(&server).await;
        assert_eq!(outcome, RunOutcome::Failed);
        assert_eq!(outcome.exit_code(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unauthorized_status_expires_session() {
        let server = status_server(ResponseTemplate::new(401)).await;

        let outcome = status_outcome(&server).await;
        assert_eq!(outcome, RunOutcome::SessionExpired);
        assert_eq!(outcome.exit_code(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn server_error_on_status_check_is_not_idle() {
        let server = status_server(
            ResponseTemplate::new(500).set_body_json(json!({"error": "database unavailable"})),
        )
        .await;

        let outcome = status_outcome(&server).await;
        assert_eq!(outcome, RunOutcome::Failed);
        assert_ne!(outcome.exit_code(), 0);
    }

    #[test]
    fn unreachable_server_on_status_check_is_not_idle() {
        let dir = TempDir::new().unwrap();
        let config = config_for("http://127.0.0.1:1", &dir);
        let session = logged_in(&config);

        let outcome = run_status(&config, session).unwrap();
        assert_eq!(outcome, RunOutcome::Failed);
        assert_ne!(outcome.exit_code(), 0);
    }

    #[test]
    fn interrupt_ends_the_run() {
        let dir = TempDir::new().unwrap();
        let config = config_for("http://127.0.0.1:1", &dir);
        let mut dashboard = open_dashboard(&config, logged_in(&config)).unwrap();

        dashboard.handle_event(EngineEvent::Interrupted);
        assert_eq!(dashboard.outcome(), RunOutcome::Interrupted);
        assert_eq!(dashboard.outcome().exit_code(), 130);
    }

    #[test]
    fn logged_out_session_refuses_to_start() {
        let dir = TempDir::new().unwrap();
        let config = config_for("http://127.0.0.1:1", &dir);
        let session = Arc::new(SessionStore::load(&config.session_file));

        assert!(run_status(&config, session).is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn upload_follows_processing_to_completion() {
        let server = status_server(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "progress": 100,
            "latest_data": {"skills": ["Go"]}
        })))
        .await;
        Mock::given(method("POST"))
            .and(path("/v1/profile/cv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "queued"})))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let cv = dir.path().join("cv.pdf");
        fs::write(&cv, b"%PDF-1.4\n%test\n").unwrap();
        let config = config_for(&server.uri(), &dir);
        let session = logged_in(&config);

        let outcome = tokio::task::spawn_blocking(move || run_upload(&config, session, &cv))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed);
    }
}
