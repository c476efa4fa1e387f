//! Task lifecycle integration tests
//!
//! These drive `TaskController` through complete select/upload/detect/poll
//! flows, first against the scripted `MockBackend` with paused time, then
//! against a mock HTTP service over real sockets.

use fallwatch::api::{ApiError, DetectionParams, HttpBackend, MockBackend, MockCall, MockStatus};
use fallwatch::progress::{TaskEvent, TaskObserver};
use fallwatch::task::{Phase, TaskController, TaskError, TaskStatus, VideoFile};
use fallwatch::{RiskLevel, TaskId};
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const TEN_MIB: u64 = 10 * 1024 * 1024;

/// Observer that keeps every event for later assertions
#[derive(Default)]
struct RecordingObserver {
    events: Mutex<Vec<TaskEvent>>,
}

impl RecordingObserver {
    fn events(&self) -> Vec<TaskEvent> {
        self.events.lock().unwrap().clone()
    }

    fn count(&self, pred: impl Fn(&TaskEvent) -> bool) -> usize {
        self.events().iter().filter(|e| pred(e)).count()
    }
}

impl TaskObserver for RecordingObserver {
    fn on_event(&self, event: &TaskEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

fn clip() -> VideoFile {
    VideoFile::new("clip.mp4", TEN_MIB, "video/mp4", "/videos/clip.mp4")
}

fn default_params() -> DetectionParams {
    DetectionParams {
        confidence: 0.5,
        iou_threshold: 0.45,
    }
}

fn setup() -> (Arc<MockBackend>, Arc<RecordingObserver>, TaskController) {
    let backend = Arc::new(MockBackend::new());
    let observer = Arc::new(RecordingObserver::default());
    let controller = TaskController::new(backend.clone()).with_observer(observer.clone());
    (backend, observer, controller)
}

#[tokio::test(start_paused = true)]
async fn test_full_detection_scenario() {
    let (backend, observer, mut controller) = setup();
    backend.add_upload(MockBackend::upload_ok("abc123", "clip.mp4"));
    backend.add_detection(Ok(()));
    backend.add_statuses(vec![
        MockStatus::processing(40.0),
        MockStatus::completed(json!({
            "analysis": {
                "summary": {"total_falls": 2, "risk_level": "high"},
                "confidence_analysis": {"average": 0.87}
            }
        })),
    ]);

    controller.select(clip()).unwrap();
    let id = controller.upload().await.unwrap();
    assert_eq!(id, TaskId::new("abc123"));
    assert_eq!(
        controller.snapshot().status(),
        &TaskStatus::Uploaded {
            id: TaskId::new("abc123")
        }
    );

    controller.start_detection(default_params()).await.unwrap();
    assert_eq!(controller.phase(), Phase::Detecting);
    assert!(controller.is_polling());

    tokio::time::sleep(Duration::from_millis(1050)).await;
    assert_eq!(controller.snapshot().progress(), Some(40));

    let task = controller.wait().await.unwrap();
    assert_eq!(task.phase(), Phase::Completed);
    assert_eq!(task.id(), Some(&TaskId::new("abc123")));

    let quick = task.result().and_then(|r| r.quick_results()).unwrap();
    assert_eq!(quick.total_falls, 2);
    assert_eq!(quick.risk_level, RiskLevel::High);
    assert_eq!(quick.confidence_percent(), 87);

    assert!(!controller.is_polling());
    assert_eq!(backend.status_calls(), 2);
    assert_eq!(
        observer.count(|e| matches!(e, TaskEvent::Completed { .. })),
        1
    );
    assert!(backend.calls().contains(&MockCall::StartDetection {
        id: TaskId::new("abc123"),
        params: default_params(),
    }));
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_clamped() {
    let (backend, observer, mut controller) = setup();
    backend.add_upload(MockBackend::upload_ok("abc123", "clip.mp4"));
    backend.add_detection(Ok(()));
    backend.add_statuses(vec![
        MockStatus::processing(137.0),
        MockStatus::processing(-5.0),
        MockStatus::processing(62.9),
        MockStatus::completed(json!({})),
    ]);

    controller.select(clip()).unwrap();
    controller.upload().await.unwrap();
    controller.start_detection(default_params()).await.unwrap();
    controller.wait().await.unwrap();

    let progress: Vec<u8> = observer
        .events()
        .into_iter()
        .filter_map(|e| match e {
            TaskEvent::Progress { progress, .. } => Some(progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec![100, 0, 62]);
}

#[tokio::test(start_paused = true)]
async fn test_completion_applied_once() {
    let (backend, observer, mut controller) = setup();
    backend.add_upload(MockBackend::upload_ok("abc123", "clip.mp4"));
    backend.add_detection(Ok(()));
    backend.add_statuses(vec![
        MockStatus::completed(json!({"analysis": null})),
        MockStatus::failed("stale"),
        MockStatus::processing(10.0),
    ]);

    controller.select(clip()).unwrap();
    controller.upload().await.unwrap();
    controller.start_detection(default_params()).await.unwrap();

    let task = controller.wait().await.unwrap();
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert_eq!(task.phase(), Phase::Completed);
    assert_eq!(controller.phase(), Phase::Completed);
    assert_eq!(backend.status_calls(), 1);
    assert_eq!(backend.remaining_statuses(), 2);
    assert_eq!(
        observer.count(|e| matches!(
            e,
            TaskEvent::Completed { .. } | TaskEvent::Failed { .. }
        )),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_backend_failure_then_retry_with_new_upload() {
    let (backend, _observer, mut controller) = setup();
    backend.add_upload(MockBackend::upload_ok("first", "clip.mp4"));
    backend.add_detection(Ok(()));
    backend.add_status(MockStatus::failed("Video decode error"));

    controller.select(clip()).unwrap();
    controller.upload().await.unwrap();
    controller.start_detection(default_params()).await.unwrap();
    let err = controller.wait().await.unwrap_err();
    assert_eq!(
        err,
        TaskError::BackendReportedError("Video decode error".to_string())
    );

    // A failed task cannot be re-detected without a fresh upload
    assert_eq!(
        controller.start_detection(default_params()).await.unwrap_err(),
        TaskError::NoActiveTask
    );

    backend.add_upload(MockBackend::upload_ok("second", "clip.mp4"));
    backend.add_detection(Ok(()));
    backend.add_status(MockStatus::completed(json!({})));

    assert_eq!(controller.upload().await.unwrap(), TaskId::new("second"));
    controller.start_detection(default_params()).await.unwrap();
    let task = controller.wait().await.unwrap();
    assert_eq!(task.id(), Some(&TaskId::new("second")));
}

#[tokio::test]
async fn test_local_errors_make_no_calls() {
    let (backend, _observer, mut controller) = setup();

    assert_eq!(
        controller.upload().await.unwrap_err(),
        TaskError::NoFileSelected
    );
    assert_eq!(
        controller
            .start_detection(default_params())
            .await
            .unwrap_err(),
        TaskError::NoActiveTask
    );

    let err = controller
        .select(VideoFile::new("clip.mkv", 10, "video/x-matroska", "/v/clip.mkv"))
        .unwrap_err();
    assert!(matches!(err, TaskError::InvalidFormat { .. }));
    assert!(err.is_local());

    let err = controller
        .select(VideoFile::new(
            "huge.mp4",
            500 * 1024 * 1024 + 1,
            "video/mp4",
            "/v/huge.mp4",
        ))
        .unwrap_err();
    assert!(matches!(err, TaskError::FileTooLarge { .. }));

    assert!(backend.calls().is_empty());
    assert_eq!(controller.phase(), Phase::Idle);
}

#[tokio::test]
async fn test_remote_errors_surface_service_message() {
    let (backend, _observer, mut controller) = setup();
    backend.add_upload(Err(MockBackend::rejected(400, Some("Unsupported file type"))));
    backend.add_upload(Err(MockBackend::rejected(500, None)));
    backend.add_upload(Err(ApiError::Network {
        message: "connection refused".to_string(),
    }));

    controller.select(clip()).unwrap();

    assert_eq!(
        controller.upload().await.unwrap_err(),
        TaskError::UploadFailed("Unsupported file type".to_string())
    );
    assert_eq!(
        controller.upload().await.unwrap_err(),
        TaskError::UploadFailed("Upload failed".to_string())
    );
    assert!(matches!(
        controller.upload().await.unwrap_err(),
        TaskError::Transport(ApiError::Network { .. })
    ));
    assert_eq!(controller.phase(), Phase::Idle);
    assert!(controller.snapshot().file().is_some());
}

/// Records events and lingers on progress, widening the window between a
/// poll transition and its delivery
#[derive(Default)]
struct SlowProgressObserver {
    inner: RecordingObserver,
}

impl TaskObserver for SlowProgressObserver {
    fn on_event(&self, event: &TaskEvent) {
        if matches!(event, TaskEvent::Progress { .. }) {
            std::thread::sleep(Duration::from_micros(200));
        }
        self.inner.on_event(event);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_no_poll_events_after_reset() {
    for run in 0..50 {
        let backend = Arc::new(MockBackend::new());
        backend.add_upload(MockBackend::upload_ok("abc123", "clip.mp4"));
        backend.add_detection(Ok(()));
        backend.add_statuses((0..10_000).map(|_| MockStatus::processing(50.0)));

        let observer = Arc::new(SlowProgressObserver::default());
        let mut controller = TaskController::new(backend.clone())
            .with_observer(observer.clone())
            .with_poll_interval(Duration::from_millis(1));

        controller.select(clip()).unwrap();
        controller.upload().await.unwrap();
        controller.start_detection(default_params()).await.unwrap();

        tokio::time::sleep(Duration::from_millis(3)).await;
        controller.reset();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let events = observer.inner.events();
        let reset_at = events
            .iter()
            .position(|e| matches!(e, TaskEvent::Reset))
            .unwrap();
        assert_eq!(
            reset_at,
            events.len() - 1,
            "run {}: events delivered after Reset: {:?}",
            run,
            &events[reset_at + 1..]
        );
        assert_eq!(controller.phase(), Phase::Idle);
    }
}

#[tokio::test]
async fn test_end_to_end_over_http() {
    let mut server = mockito::Server::new_async().await;
    let upload = server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "task_id": "abc123",
                "message": "File uploaded successfully",
                "filename": "clip.mp4"
            })
            .to_string(),
        )
        .create_async()
        .await;
    let detect = server
        .mock("POST", "/detect/abc123")
        .with_status(200)
        .with_body(r#"{"success": true}"#)
        .create_async()
        .await;

    let ticks = Arc::new(AtomicUsize::new(0));
    let counter = ticks.clone();
    server
        .mock("GET", "/status/abc123")
        .with_status(200)
        .with_body_from_request(move |_| {
            let body = match counter.fetch_add(1, Ordering::SeqCst) {
                0 => json!({"task_id": "abc123", "status": "processing", "progress": 40,
                            "message": "Analyzing frames"}),
                _ => json!({"task_id": "abc123", "status": "completed", "progress": 100,
                            "result": {"analysis": {"summary": {"total_falls": 0,
                                                                "risk_level": "low"}}}}),
            };
            body.to_string().into_bytes()
        })
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clip.mp4");
    std::fs::write(&path, b"not really a video").unwrap();

    let backend = Arc::new(HttpBackend::new(server.url()).unwrap());
    let mut controller =
        TaskController::new(backend).with_poll_interval(Duration::from_millis(50));

    controller.select(VideoFile::from_path(&path).unwrap()).unwrap();
    controller.upload().await.unwrap();
    controller.start_detection(default_params()).await.unwrap();

    let task = tokio::time::timeout(Duration::from_secs(10), controller.wait())
        .await
        .expect("detection should finish")
        .unwrap();

    assert_eq!(task.phase(), Phase::Completed);
    let quick = task.result().and_then(|r| r.quick_results()).unwrap();
    assert_eq!(quick.total_falls, 0);
    assert_eq!(quick.risk_level, RiskLevel::Low);
    assert_eq!(ticks.load(Ordering::SeqCst), 2);

    upload.assert_async().await;
    detect.assert_async().await;
}
