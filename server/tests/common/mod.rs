//! Common utilities for server integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use narration_core::{AudioGenerationClient, GeneratedAudio, NarrationLoader, NarrationServices};
use serde_json::Value;
use server::{config::ServerConfig, create_app, AppState};
use speech_client::SilenceClient;
use tower::ServiceExt;

/// Backend that always fails, standing in for an unreachable TTS provider.
pub struct FailingClient;

#[async_trait]
impl AudioGenerationClient for FailingClient {
    async fn generate(&self, _text: &str, _voice_id: &str) -> anyhow::Result<GeneratedAudio> {
        anyhow::bail!("upstream returned 503")
    }
}

pub fn test_state(client: Arc<dyn AudioGenerationClient>) -> AppState {
    let loader = NarrationLoader::new(NarrationServices::new(), client);
    AppState::new(loader, ServerConfig::default())
}

/// Full app over the local silence backend, with isolated services.
pub fn create_test_app() -> (Router, AppState) {
    let state = test_state(Arc::new(SilenceClient::default()));
    let app = create_app(state.clone()).expect("app builds with default config");
    (app, state)
}

pub fn create_failing_app() -> Router {
    create_app(test_state(Arc::new(FailingClient))).expect("app builds with default config")
}

pub async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, axum::http::HeaderMap, Vec<u8>) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, headers, bytes.to_vec())
}

pub async fn send_json(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let (status, _, bytes) = send(app, method, uri, body).await;
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}
