//! Integration tests for the narration server

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use serde_json::json;

use common::*;

#[tokio::test]
async fn test_health_check() {
    let (app, _) = create_test_app();
    let (status, headers, body) = send(&app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"ok");
    assert!(headers.contains_key("x-request-id"));
}

#[tokio::test]
async fn test_load_narration_returns_playable_url() {
    let (app, _) = create_test_app();
    let (status, body) = send_json(
        &app,
        "POST",
        "/narration",
        Some(json!({ "text": "Welcome to the tour.", "voice_id": "narrator" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["mime_type"], "audio/wav");
    assert_eq!(body["duration_ms"], 4 * 350);
    let url = body["url"].as_str().unwrap().to_string();
    assert_eq!(url, format!("/narration/audio/{}", body["id"].as_str().unwrap()));

    let (status, headers, audio) = send(&app, "GET", &url, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(headers["content-type"], "audio/wav");
    assert_eq!(audio.len() as u64, body["size_bytes"].as_u64().unwrap());
    assert_eq!(&audio[..4], b"RIFF");
}

#[tokio::test]
async fn test_same_request_resolves_to_same_audio() {
    let (app, state) = create_test_app();
    let request = json!({ "text": "Step one.", "voice_id": "narrator" });

    let (_, first) = send_json(&app, "POST", "/narration", Some(request.clone())).await;
    let (_, second) = send_json(&app, "POST", "/api/narration", Some(request)).await;

    assert_eq!(first["id"], second["id"]);
    let stats = state.loader.stats();
    assert_eq!(stats.generations_started, 1);
    assert_eq!(stats.cache_hits, 1);
}

#[tokio::test]
async fn test_invalid_narration_requests_are_rejected() {
    let (app, state) = create_test_app();

    for body in [
        json!({ "text": "   ", "voice_id": "narrator" }),
        json!({ "text": "Hello", "voice_id": "" }),
        json!({ "text": "Hello", "voice_id": "bad voice!" }),
        json!({ "text": "x".repeat(5001), "voice_id": "narrator" }),
    ] {
        let (status, error) = send_json(&app, "POST", "/narration", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(error["code"], 400);
    }
    assert_eq!(state.loader.stats().generations_started, 0);
}

#[tokio::test]
async fn test_unknown_audio_is_not_found() {
    let (app, _) = create_test_app();
    let (status, _) = send_json(&app, "GET", "/narration/audio/deadbeef", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_generation_failure_maps_to_bad_gateway() {
    let app = create_failing_app();
    let (status, error) = send_json(
        &app,
        "POST",
        "/narration",
        Some(json!({ "text": "Hello", "voice_id": "narrator" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(error["error"].as_str().unwrap().contains("upstream returned 503"));
}

#[tokio::test]
async fn test_preload_can_be_cancelled_by_token() {
    let (app, state) = create_test_app();
    let (status, body) = send_json(
        &app,
        "POST",
        "/narration/preload",
        Some(json!({ "text": "Next step.", "voice_id": "narrator", "delay_ms": 10_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delay_ms"], 10_000);
    let token = body["token"].as_str().unwrap().to_string();

    let (status, body) = send_json(&app, "DELETE", &format!("/narration/preload/{token}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], true);
    assert!(!state.loader.is_pending("Next step.", "narrator"));
}

#[tokio::test]
async fn test_superseded_preload_token_is_unknown() {
    let (app, _) = create_test_app();
    let schedule = |text: &str| json!({ "text": text, "voice_id": "narrator", "delay_ms": 10_000 });

    let (_, first) = send_json(&app, "POST", "/narration/preload", Some(schedule("Branch A"))).await;
    let (_, _second) = send_json(&app, "POST", "/narration/preload", Some(schedule("Branch B"))).await;

    let uri = format!("/narration/preload/{}", first["token"].as_str().unwrap());
    let (status, _) = send_json(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_preload_warms_the_cache() {
    let (app, state) = create_test_app();
    let (status, _) = send_json(
        &app,
        "POST",
        "/narration/preload",
        Some(json!({ "text": "Coming up next.", "voice_id": "narrator", "delay_ms": 10 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let token = state.scheduler.current().unwrap();
    let outcome = tokio::time::timeout(Duration::from_secs(5), token.outcome()).await.unwrap();
    assert_eq!(outcome, narration_core::PreloadOutcome::Loaded);
    assert!(state.loader.is_cached("Coming up next.", "narrator"));
}

#[tokio::test]
async fn test_preload_delay_is_bounded() {
    let (app, _) = create_test_app();
    let (status, _) = send_json(
        &app,
        "POST",
        "/narration/preload",
        Some(json!({ "text": "Later.", "voice_id": "narrator", "delay_ms": 3_600_000 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_release_clears_cached_audio() {
    let (app, _) = create_test_app();
    let (_, loaded) = send_json(
        &app,
        "POST",
        "/narration",
        Some(json!({ "text": "Goodbye.", "voice_id": "narrator" })),
    )
    .await;

    let (status, body) = send_json(&app, "POST", "/api/narration/release", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["released"], 1);

    let (status, _) = send_json(&app, "GET", loaded["url"].as_str().unwrap(), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_metrics_report_loader_and_endpoints() {
    let (app, _) = create_test_app();
    let request = json!({ "text": "Count me.", "voice_id": "narrator" });
    send_json(&app, "POST", "/narration", Some(request.clone())).await;
    send_json(&app, "POST", "/narration", Some(request)).await;

    let (status, metrics) = send_json(&app, "GET", "/metrics", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(metrics["loader"]["generations_started"], 1);
    assert_eq!(metrics["loader"]["cache_hits"], 1);
    assert_eq!(metrics["loader"]["cached_entries"], 1);
    assert_eq!(metrics["endpoints"]["narration"]["request_count"], 2);
}

#[tokio::test]
async fn test_preload_uses_configured_default_delay() {
    let (app, state) = create_test_app();
    let (status, body) = send_json(
        &app,
        "POST",
        "/narration/preload",
        Some(json!({ "text": "Default delay.", "voice_id": "narrator" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["delay_ms"], state.config.preload_delay_ms);
}

#[tokio::test]
async fn test_cancelling_twice_reports_nothing_left_to_cancel() {
    let (app, _) = create_test_app();
    let (_, body) = send_json(
        &app,
        "POST",
        "/narration/preload",
        Some(json!({ "text": "Next step.", "voice_id": "narrator", "delay_ms": 10_000 })),
    )
    .await;
    let uri = format!("/narration/preload/{}", body["token"].as_str().unwrap());

    let (_, first) = send_json(&app, "DELETE", &uri, None).await;
    let (status, second) = send_json(&app, "DELETE", &uri, None).await;

    assert_eq!(first["cancelled"], true);
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["cancelled"], false);
}
