//! `CropApi` against a scripted HTTP server.
//!
//! Each test mounts the responses it needs on a `wiremock` server and checks
//! both the request the client sent and the `ApiResult` it produced.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::time::Duration;

use crop_api_core::{ApiError, ApiResult, ClientConfig, CropApi, ErrorKind, ImageUpload};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header_regex, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn api_for(server: &MockServer) -> CropApi {
    CropApi::new(&server.uri()).unwrap()
}

fn jpeg() -> ImageUpload {
    ImageUpload::new(vec![0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10]).with_file_name("leaf.jpg")
}

// ---------------------------------------------------------------------------
// checkStatus
// ---------------------------------------------------------------------------

#[tokio::test]
async fn check_status_extracts_status_and_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "message": "running"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = api_for(&server).await.check_status().await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"success": true, "status": "ok", "message": "running"})
    );
}

#[tokio::test]
async fn check_status_does_not_check_http_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"status": "error", "message": "db down"})),
        )
        .mount(&server)
        .await;

    let status = api_for(&server)
        .await
        .check_status()
        .await
        .into_result()
        .unwrap();
    assert_eq!(status.status_str(), Some("error"));
    assert_eq!(status.message_str(), Some("db down"));
}

#[tokio::test]
async fn check_status_non_json_body_is_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>Service waking up</html>"))
        .mount(&server)
        .await;

    let result = api_for(&server).await.check_status().await;
    assert!(!result.is_success());
    assert_eq!(result.error().unwrap().kind(), ErrorKind::Parse);
}

// ---------------------------------------------------------------------------
// analyzeImage
// ---------------------------------------------------------------------------

#[tokio::test]
async fn analyze_image_sends_multipart_file_only() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(header_regex("content-type", "^multipart/form-data; boundary=.+$"))
        .and(body_string_contains("name=\"file\"; filename=\"leaf.jpg\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"id": "d1", "prediction": "leaf_blast"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let result = api_for(&server).await.analyze_image(&jpeg()).await;
    let payload = result.into_result().unwrap();
    assert_eq!(payload.data["prediction"], "leaf_blast");

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(!body.contains("crop_name"));
}

#[tokio::test]
async fn analyze_image_sends_crop_name_when_given() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .and(body_string_contains("name=\"crop_name\"\r\n\r\nrice\r\n"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "d2"})))
        .expect(1)
        .mount(&server)
        .await;

    let result = api_for(&server)
        .await
        .analyze_image(&jpeg().with_crop_name("rice"))
        .await;
    assert!(result.is_success());
}

#[tokio::test]
async fn analyze_image_server_error_names_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/upload"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"id": "not-a-result"})))
        .mount(&server)
        .await;

    let result = api_for(&server).await.analyze_image(&jpeg()).await;
    let err = result.error().unwrap();
    assert!(matches!(err, ApiError::HttpStatus { status: 500, .. }));
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"success": false, "error": "HTTP error! status: 500"})
    );
}

// ---------------------------------------------------------------------------
// getHistory
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_history_preserves_server_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "3", "prediction": "aphids"},
            {"id": "1", "prediction": "healthy"},
            {"id": "2", "prediction": "brown_spot"}
        ])))
        .mount(&server)
        .await;

    let payload = api_for(&server)
        .await
        .get_history()
        .await
        .into_result()
        .unwrap();
    let ids: Vec<&str> = payload
        .data
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, ["3", "1", "2"]);
}

#[tokio::test]
async fn get_history_passes_non_array_body_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": [], "total": 0})))
        .mount(&server)
        .await;

    let result = api_for(&server).await.get_history().await;
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"success": true, "data": {"items": [], "total": 0}})
    );
}

#[tokio::test]
async fn get_history_non_json_is_parse_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_string("oops"))
        .mount(&server)
        .await;

    let result = api_for(&server).await.get_history().await;
    assert_eq!(result.error().map(ApiError::kind), Some(ErrorKind::Parse));
}

// ---------------------------------------------------------------------------
// getDetection
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_detection_uses_literal_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/detections/abc123"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": "abc123", "confidence": 0.91})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let payload = api_for(&server)
        .await
        .get_detection("abc123")
        .await
        .into_result()
        .unwrap();
    assert_eq!(payload.data["id"], "abc123");
}

#[tokio::test]
async fn get_detection_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/detections/abc123"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"detail": "Detection not found"})),
        )
        .mount(&server)
        .await;

    let result = api_for(&server).await.get_detection("abc123").await;
    let err = result.error().unwrap();
    assert_eq!(err.status(), Some(404));
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn get_detection_escapes_slashes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let _ = api_for(&server).await.get_detection("a/../b").await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/api/detections/a%2F..%2Fb");
}

// ---------------------------------------------------------------------------
// Configuration and transport failures
// ---------------------------------------------------------------------------

#[tokio::test]
async fn explicit_base_url_is_used_for_api_paths() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let api = CropApi::new(&format!("{}/", server.uri())).unwrap();
    assert_eq!(api.config().api_url(), format!("{}/api", server.uri()));
    assert!(api.get_history().await.is_success());
}

#[tokio::test]
async fn timeout_surfaces_as_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([]))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let config = ClientConfig::new(&server.uri()).with_timeout(Duration::from_millis(100));
    let api = CropApi::with_config(config).unwrap();
    let result = api.get_history().await;
    assert_eq!(result.error().map(ApiError::kind), Some(ErrorKind::Transport));
}

/// Serve one request with a 500 head that promises more body than it sends,
/// then hang up.
fn serve_truncated_error() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut head = Vec::new();
        let mut buf = [0u8; 1024];
        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => head.extend_from_slice(&buf[..n]),
            }
        }
        let _ = stream.write_all(
            b"HTTP/1.1 500 Internal Server Error\r\n\
              content-type: application/json\r\n\
              content-length: 100\r\n\r\n\
              {\"detail\":\"par",
        );
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn truncated_error_body_still_reports_http_status() {
    let api = CropApi::new(&serve_truncated_error()).unwrap();

    let result = api.get_history().await;
    let err = result.error().unwrap();
    assert_eq!(err.kind(), ErrorKind::HttpStatus);
    assert_eq!(err.status(), Some(500));
    assert_eq!(
        serde_json::to_value(&result).unwrap(),
        json!({"success": false, "error": "HTTP error! status: 500"})
    );
}

#[tokio::test]
async fn unreachable_server_never_escapes_the_envelope() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let api = CropApi::new(&format!("http://127.0.0.1:{port}")).unwrap();

    let status = api.check_status().await;
    let upload = api.analyze_image(&jpeg()).await;
    let history = api.get_history().await;
    let detection = api.get_detection("abc123").await;

    for err in [status.error(), upload.error(), history.error(), detection.error()] {
        let err = err.expect("expected a failure result");
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(!err.to_string().is_empty());
    }

    let json = serde_json::to_value(&history).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["error"].is_string());
    assert!(json.get("data").is_none());
}

#[tokio::test]
async fn concurrent_calls_share_one_client() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/history"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"status": "ok", "message": "up"})),
        )
        .mount(&server)
        .await;

    let api = api_for(&server).await;
    let (history, status) = tokio::join!(api.get_history(), api.check_status());
    assert!(matches!(history, ApiResult::Success(ref p) if p.data == json!([{"id": "1"}])));
    assert!(status.is_success());
}
