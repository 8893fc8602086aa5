use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use poller_engine::{
    ApiSettings, EngineEvent, EngineHandle, FailureKind, StaticToken, UploadRequest,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Respond, ResponseTemplate};

const WAIT: Duration = Duration::from_secs(5);

/// Answers successive status requests from a fixed script, repeating the last.
struct Script {
    calls: AtomicUsize,
    bodies: Vec<serde_json::Value>,
}

impl Respond for Script {
    fn respond(&self, _request: &wiremock::Request) -> ResponseTemplate {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies[call.min(self.bodies.len() - 1)].clone();
        ResponseTemplate::new(200).set_body_json(body)
    }
}

fn engine(server: &MockServer, interval: Duration) -> EngineHandle {
    let settings = ApiSettings {
        base_url: server.uri(),
        poll_interval: interval,
        ..ApiSettings::default()
    };
    EngineHandle::with_reqwest(settings, Arc::new(StaticToken::new("tok"))).expect("engine")
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_result_is_reported_for_its_job() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/profile/cv"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "ok"})))
        .mount(&server)
        .await;

    let handle = engine(&server, Duration::from_secs(60));
    handle.upload(
        4,
        UploadRequest {
            file_name: "cv.pdf".to_string(),
            content_type: "application/pdf".to_string(),
            bytes: Bytes::from_static(b"%PDF-1.4"),
        },
    );

    let event = tokio::task::spawn_blocking(move || handle.recv_timeout(WAIT))
        .await
        .unwrap();
    match event {
        Some(EngineEvent::UploadCompleted { job_id, result }) => {
            assert_eq!(job_id, 4);
            assert_eq!(result.unwrap().message.as_deref(), Some("ok"));
        }
        other => panic!("unexpected event {other:?}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn polling_ticks_and_fetches_until_stopped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/profile/cv/processing-status"))
        .respond_with(Script {
            calls: AtomicUsize::new(0),
            bodies: vec![
                json!({"status": "processing", "progress": 45}),
                json!({"status": "completed", "progress": 100, "latest_data": {"skills": ["Go"]}}),
            ],
        })
        .mount(&server)
        .await;

    let handle = engine(&server, Duration::from_millis(30));
    let statuses = tokio::task::spawn_blocking(move || {
        handle.start_polling(7);
        let mut statuses = Vec::new();
        while statuses.len() < 2 {
            match handle.recv_timeout(WAIT).expect("event") {
                EngineEvent::PollTick { job_id } => handle.fetch_status(job_id),
                EngineEvent::StatusFetched { job_id, result } => {
                    assert_eq!(job_id, 7);
                    statuses.push(result.unwrap().status);
                }
                other => panic!("unexpected event {other:?}"),
            }
        }
        handle.stop_polling(7);
        std::thread::sleep(Duration::from_millis(100));
        while handle.try_recv().is_some() {}
        assert!(handle.recv_timeout(Duration::from_millis(150)).is_none());
        statuses
    })
    .await
    .unwrap();

    assert_eq!(statuses, vec!["processing".to_string(), "completed".to_string()]);
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_token_surfaces_as_unauthorized_event() {
    let server = MockServer::start().await;
    let settings = ApiSettings {
        base_url: server.uri(),
        ..ApiSettings::default()
    };
    let handle = EngineHandle::with_reqwest(settings, Arc::new(StaticToken(None))).unwrap();
    handle.fetch_status(1);

    let event = tokio::task::spawn_blocking(move || handle.recv_timeout(WAIT))
        .await
        .unwrap();
    match event {
        Some(EngineEvent::StatusFetched { result: Err(err), .. }) => {
            assert_eq!(err.kind, FailureKind::MissingCredential);
        }
        other => panic!("unexpected event {other:?}"),
    }
}
