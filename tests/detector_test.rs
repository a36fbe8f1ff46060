//! Marker Detection Service Testing
//!
//! Exercises the HTTP detector against a local mock service:
//! - Multipart upload and response parsing
//! - Error statuses and malformed bodies
//! - Health check
//! - A live session arming through the HTTP path

use aquacapture::config::{FiducialConfig, ReadinessConfig};
use aquacapture::detector::HttpMarkerDetector;
use aquacapture::interfaces::{MarkerDetector, MotionSensor};
use aquacapture::session::{CaptureSession, SessionEvent};
use aquacapture::testing::{level_samples, synthetic_card_still, MockActuator, ScriptedSensor};
use aquacapture::types::CornerLabel;
use aquacapture::CaptureError;
use mockito::Matcher;
use std::sync::Arc;
use std::time::Duration;

const READY_BODY: &str = r#"{
    "detected": 4,
    "corners": {
        "tl": {"cx": 40.5, "cy": 38.0, "x": 30, "y": 28, "size": 21},
        "tr": {"cx": 600.0, "cy": 39.5, "x": 590, "y": 29, "size": 21},
        "bl": {"cx": 41.0, "cy": 598.0, "x": 31, "y": 588, "size": 20},
        "br": {"cx": 599.5, "cy": 600.0, "x": 589, "y": 590, "size": 21}
    },
    "quality": 0.82,
    "ready": true
}"#;

fn detector_for(server: &mockito::ServerGuard) -> HttpMarkerDetector {
    let config = FiducialConfig {
        service_url: server.url(),
        ..FiducialConfig::default()
    };
    HttpMarkerDetector::new(&config).unwrap()
}

async fn mock_validate(
    server: &mut mockito::ServerGuard,
    status: usize,
    body: &str,
) -> mockito::Mock {
    server
        .mock("POST", "/fiducial/validate")
        .match_header(
            "content-type",
            Matcher::Regex("^multipart/form-data; boundary=".to_string()),
        )
        .with_status(status)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create_async()
        .await
}

#[tokio::test]
async fn test_detect_parses_service_response() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_validate(&mut server, 200, READY_BODY).await;
    let detector = detector_for(&server);

    let result = detector.detect(synthetic_card_still(216, 248)).await.unwrap();

    assert_eq!(result.detected_count, 4);
    assert!(result.ready);
    assert!((result.quality - 0.82).abs() < 1e-6);
    assert_eq!(result.corners.len(), 4);
    let tl = result.corners[&CornerLabel::TopLeft];
    assert_eq!(tl.size, 21);
    assert!((tl.cx - 40.5).abs() < 1e-6);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_detect_uploads_large_still() {
    let mut server = mockito::Server::new_async().await;
    let mock = mock_validate(
        &mut server,
        200,
        r#"{"detected": 2, "quality": 0.3, "ready": false}"#,
    )
    .await;
    let detector = detector_for(&server);

    let result = detector.detect(synthetic_card_still(1080, 1240)).await.unwrap();

    assert_eq!(result.detected_count, 2);
    assert!(result.corners.is_empty());
    assert!(!result.ready);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_detect_reports_error_status() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/fiducial/validate")
        .with_status(503)
        .with_body("detector warming up")
        .create_async()
        .await;
    let detector = detector_for(&server);

    let err = detector.detect(synthetic_card_still(216, 248)).await.unwrap_err();
    match err {
        CaptureError::DetectionError(message) => {
            assert!(message.contains("503"), "{}", message);
            assert!(message.contains("detector warming up"), "{}", message);
        }
        other => panic!("unexpected error: {:?}", other),
    }
    mock.assert_async().await;
}

#[tokio::test]
async fn test_detect_rejects_malformed_body() {
    let mut server = mockito::Server::new_async().await;
    let _mock = mock_validate(&mut server, 200, r#"{"corners": "nope"}"#).await;
    let detector = detector_for(&server);

    let result = detector.detect(synthetic_card_still(216, 248)).await;
    assert!(matches!(result, Err(CaptureError::DetectionError(_))));
}

#[tokio::test]
async fn test_detect_rejects_non_image_still() {
    let server = mockito::Server::new_async().await;
    let detector = detector_for(&server);

    let result = detector.detect(bytes::Bytes::from_static(b"not a jpeg")).await;
    assert!(matches!(result, Err(CaptureError::ImageError(_))));
}

#[tokio::test]
async fn test_health_check() {
    let mut server = mockito::Server::new_async().await;
    let ok = server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"ok"}"#)
        .create_async()
        .await;
    let detector = detector_for(&server);

    detector.health().await.unwrap();
    ok.assert_async().await;
}

#[tokio::test]
async fn test_health_check_rejects_degraded_service() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/health")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"status":"degraded"}"#)
        .create_async()
        .await;
    let detector = detector_for(&server);

    let err = detector.health().await.unwrap_err();
    assert!(err.to_string().contains("degraded"));
}

#[tokio::test]
async fn test_unreachable_service_is_an_error() {
    let config = FiducialConfig {
        service_url: "http://127.0.0.1:1".to_string(),
        request_timeout_ms: 500,
        ..FiducialConfig::default()
    };
    let detector = HttpMarkerDetector::new(&config).unwrap();

    assert!(detector.health().await.is_err());
    assert!(detector.detect(synthetic_card_still(216, 248)).await.is_err());
}

#[tokio::test]
async fn test_session_arms_through_http_detector() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/fiducial/validate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(READY_BODY)
        .expect_at_least(1)
        .create_async()
        .await;

    let mut config = ReadinessConfig::default();
    config.fiducial.service_url = server.url();
    let detector = Arc::new(HttpMarkerDetector::new(&config.fiducial).unwrap());
    let actuator = Arc::new(MockActuator::new());
    let sensor: Box<dyn MotionSensor> = Box::new(ScriptedSensor::new(level_samples(1)));

    let mut session =
        CaptureSession::open(config, actuator.clone(), detector, Some(sensor)).unwrap();

    let event = tokio::time::timeout(Duration::from_secs(5), session.next_event())
        .await
        .expect("session should arm")
        .expect("event stream ended");
    assert!(matches!(event, SessionEvent::Armed));
    assert_eq!(session.snapshot().fiducial_count, 4);

    session.close().await.unwrap();
    mock.assert_async().await;
}
