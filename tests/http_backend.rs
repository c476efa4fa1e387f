//! HttpBackend integration tests against a mock HTTP server
//!
//! These tests verify request shapes and response handling for every service
//! endpoint the client uses:
//! - Multipart upload and detect-start bodies
//! - Status, history and tuning decoding
//! - Error bodies and non-JSON failures
//! - Result download streaming

use fallwatch::api::{
    ApiError, DetectionBackend, DetectionParams, HttpBackend, PerformanceUpdate, RemoteStatus,
    RiskLevel, TaskId,
};
use fallwatch::task::VideoFile;
use mockito::Matcher;
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Writes a small fake video and returns its selection record
fn sample_video(dir: &TempDir, name: &str) -> VideoFile {
    let path: PathBuf = dir.path().join(name);
    fs::write(&path, b"fake mp4 payload for upload tests").expect("Failed to write video");
    VideoFile::from_path(&path).expect("Failed to stat video")
}

#[tokio::test]
async fn test_upload_sends_multipart_video_field() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/upload")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=.+".to_string()),
        )
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#"name="video"; filename="clip.mp4""#.to_string()),
            Matcher::Regex("Content-Type: video/mp4".to_string()),
            Matcher::Regex("fake mp4 payload".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
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

    let dir = TempDir::new().unwrap();
    let video = sample_video(&dir, "clip.mp4");
    let backend = HttpBackend::new(server.url()).unwrap();

    let uploaded = backend.upload(&video).await.unwrap();

    assert_eq!(uploaded.task_id, TaskId::new("abc123"));
    assert_eq!(uploaded.filename, "clip.mp4");
    assert_eq!(uploaded.message.as_deref(), Some("File uploaded successfully"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_upload_rejection_carries_service_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(400)
        .with_header("content-type", "application/json")
        .with_body(r#"{"error": "Unsupported file type"}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let video = sample_video(&dir, "clip.mov");
    let backend = HttpBackend::new(server.url()).unwrap();

    let err = backend.upload(&video).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Rejected {
            status: 400,
            message: Some("Unsupported file type".to_string()),
        }
    );
    assert_eq!(err.service_message(), Some("Unsupported file type"));
}

#[tokio::test]
async fn test_upload_missing_file_is_local_error() {
    let backend = HttpBackend::new("http://localhost:5000").unwrap();
    let video = VideoFile::new("gone.mp4", 10, "video/mp4", "/nonexistent/gone.mp4");

    let err = backend.upload(&video).await.unwrap_err();

    assert!(matches!(err, ApiError::LocalFile { .. }));
}

#[tokio::test]
async fn test_start_detection_posts_thresholds() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/detect/abc123")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({
            "confidence": 0.5,
            "iou_threshold": 0.45
        })))
        .with_status(200)
        .with_body(r#"{"success": true, "message": "Detection started"}"#)
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    backend
        .start_detection(
            &TaskId::new("abc123"),
            DetectionParams {
                confidence: 0.5,
                iou_threshold: 0.45,
            },
        )
        .await
        .unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_start_detection_unknown_task() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/detect/missing")
        .with_status(404)
        .with_body(r#"{"error": "Task not found"}"#)
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let err = backend
        .start_detection(&TaskId::new("missing"), DetectionParams::default())
        .await
        .unwrap_err();

    assert!(err.is_rejection());
    assert_eq!(err.service_message(), Some("Task not found"));
}

#[tokio::test]
async fn test_status_decodes_completed_result() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status/abc123")
        .with_status(200)
        .with_body(
            json!({
                "task_id": "abc123",
                "status": "completed",
                "progress": 100,
                "message": "Detection completed",
                "result": {
                    "analysis": {
                        "summary": {"total_falls": 3, "risk_level": "medium"},
                        "confidence_analysis": {"average": 0.71}
                    },
                    "summary": {"processing_time": 8.5},
                    "output_video_path": "outputs/abc123_result.mp4"
                }
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let status = backend.status(&TaskId::new("abc123")).await.unwrap();

    assert_eq!(status.status, RemoteStatus::Completed);
    assert_eq!(status.progress, 100.0);
    let result = status.result.expect("result should be present");
    assert_eq!(result.output_video_path(), Some("outputs/abc123_result.mp4"));

    let quick = result.quick_results().unwrap();
    assert_eq!(quick.total_falls, 3);
    assert_eq!(quick.risk_level, RiskLevel::Medium);
    assert_eq!(quick.confidence_percent(), 71);
    assert_eq!(quick.processing_time_secs, Some(8.5));
}

#[tokio::test]
async fn test_status_unknown_state_and_missing_fields() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status/abc123")
        .with_status(200)
        .with_body(r#"{"status": "queued"}"#)
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let status = backend.status(&TaskId::new("abc123")).await.unwrap();

    assert_eq!(status.status, RemoteStatus::Unknown);
    assert_eq!(status.progress, 0.0);
    assert!(status.message.is_none());
    assert!(status.result.is_none());
}

#[tokio::test]
async fn test_status_null_progress_is_zero() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status/abc123")
        .with_status(200)
        .with_body(r#"{"task_id": "abc123", "status": "pending", "progress": null}"#)
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let status = backend.status(&TaskId::new("abc123")).await.unwrap();

    assert_eq!(status.status, RemoteStatus::Pending);
    assert_eq!(status.progress, 0.0);
}

#[tokio::test]
async fn test_status_malformed_body_is_invalid_response() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status/abc123")
        .with_status(200)
        .with_body("<html>not json</html>")
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let err = backend.status(&TaskId::new("abc123")).await.unwrap_err();

    assert!(matches!(err, ApiError::InvalidResponse { .. }));
}

#[tokio::test]
async fn test_server_error_without_json_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/status/abc123")
        .with_status(500)
        .with_body("Internal Server Error")
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let err = backend.status(&TaskId::new("abc123")).await.unwrap_err();

    assert_eq!(
        err,
        ApiError::Rejected {
            status: 500,
            message: None,
        }
    );
}

#[tokio::test]
async fn test_list_tasks_newest_first() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tasks")
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "tasks": [
                    {"id": "old", "filename": "a.mp4", "status": "completed",
                     "progress": 100, "upload_time": "2024-03-01T08:00:00"},
                    {"id": "new", "filename": "b.mp4", "status": "processing",
                     "progress": 55.5, "upload_time": "2024-03-02T09:30:00.250000"}
                ],
                "performance": {"use_gpu": false, "skip_frames": 3}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let tasks = backend.list_tasks().await.unwrap();

    assert_eq!(tasks.len(), 2);
    assert_eq!(tasks[0].id, TaskId::new("new"));
    assert_eq!(tasks[0].status, RemoteStatus::Processing);
    assert_eq!(tasks[1].id, TaskId::new("old"));
}

#[tokio::test]
async fn test_list_tasks_accepts_bare_list() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/tasks")
        .with_status(200)
        .with_body(
            r#"[{"id": "t1", "filename": "a.avi", "status": "pending", "upload_time": "2024-01-01T00:00:00"}]"#,
        )
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let tasks = backend.list_tasks().await.unwrap();

    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].filename, "a.avi");
}

#[tokio::test]
async fn test_performance_round_trip() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/performance")
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "config": {"use_gpu": true, "skip_frames": 3,
                           "detection_conf": 0.5, "iou_threshold": 0.4},
                "info": {"skip_frames_effect": "Processing every 3 frames",
                         "gpu_status": "GPU available"}
            })
            .to_string(),
        )
        .create_async()
        .await;
    let update_mock = server
        .mock("POST", "/api/performance")
        .match_body(Matcher::Json(json!({"skip_frames": 1})))
        .with_status(200)
        .with_body(
            json!({
                "success": true,
                "message": "Performance config updated",
                "config": {"use_gpu": true, "skip_frames": 1,
                           "detection_conf": 0.5, "iou_threshold": 0.4}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();

    let current = backend.performance().await.unwrap();
    assert!(current.config.use_gpu);
    assert_eq!(current.config.skip_frames, 3);
    assert_eq!(
        current.info.and_then(|i| i.gpu_status).as_deref(),
        Some("GPU available")
    );

    let updated = backend
        .update_performance(&PerformanceUpdate {
            skip_frames: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(updated.config.skip_frames, 1);
    update_mock.assert_async().await;
}

#[tokio::test]
async fn test_performance_unsuccessful_body() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/api/performance")
        .with_status(200)
        .with_body(r#"{"success": false, "error": "Detector not initialized"}"#)
        .create_async()
        .await;

    let backend = HttpBackend::new(server.url()).unwrap();
    let err = backend.performance().await.unwrap_err();

    assert_eq!(err.service_message(), Some("Detector not initialized"));
}

#[tokio::test]
async fn test_download_result_streams_to_file() {
    let payload = vec![7u8; 64 * 1024];
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/download/abc123")
        .with_status(200)
        .with_header("content-type", "video/mp4")
        .with_body(payload.clone())
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("result.mp4");
    let backend = HttpBackend::new(server.url()).unwrap();

    let bytes = backend
        .download_result(&TaskId::new("abc123"), &dest)
        .await
        .unwrap();

    assert_eq!(bytes, payload.len() as u64);
    assert_eq!(fs::read(&dest).unwrap(), payload);
}

#[tokio::test]
async fn test_download_missing_result() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/download/abc123")
        .with_status(404)
        .with_body(r#"{"error": "Result file not found"}"#)
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("result.mp4");
    let backend = HttpBackend::new(server.url()).unwrap();

    let err = backend
        .download_result(&TaskId::new("abc123"), &dest)
        .await
        .unwrap_err();

    assert_eq!(err.service_message(), Some("Result file not found"));
    assert!(!dest.exists());
}

#[tokio::test]
async fn test_interrupted_download_leaves_no_file() {
    // Promises 64 KiB, sends 16 bytes, then hangs up
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = [0u8; 1024];
        let _ = socket.read(&mut request).await.unwrap();
        socket
            .write_all(
                b"HTTP/1.1 200 OK\r\n\
                  content-type: video/mp4\r\n\
                  content-length: 65536\r\n\r\n\
                  0123456789abcdef",
            )
            .await
            .unwrap();
        socket.shutdown().await.unwrap();
    });

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("result.mp4");
    let backend = HttpBackend::new(format!("http://{}", addr)).unwrap();

    let err = backend
        .download_result(&TaskId::new("abc123"), &dest)
        .await
        .unwrap_err();
    server.await.unwrap();

    assert!(!err.is_rejection());
    assert!(!dest.exists());
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_download_replaces_existing_file() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/download/abc123")
        .with_status(200)
        .with_body("fresh")
        .create_async()
        .await;

    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("result.mp4");
    fs::write(&dest, b"stale contents from an earlier run").unwrap();
    let backend = HttpBackend::new(server.url()).unwrap();

    let bytes = backend
        .download_result(&TaskId::new("abc123"), &dest)
        .await
        .unwrap();

    assert_eq!(bytes, 5);
    assert_eq!(fs::read(&dest).unwrap(), b"fresh");
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}
