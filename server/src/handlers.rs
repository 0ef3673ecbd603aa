use std::time::{Duration, Instant};

use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use narration_core::AudioHandle;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::metrics::{EndpointMetricsResponse, MetricsResponse, SystemMetrics};
use crate::validation::{validate_narration_request, validate_preload_delay};
use crate::AppState;

#[derive(Deserialize)]
pub struct NarrationRequest {
    pub text: String,
    pub voice_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NarrationResponse {
    pub id: String,
    pub url: String,
    pub mime_type: String,
    pub size_bytes: usize,
    pub duration_ms: Option<u64>,
}

impl From<&AudioHandle> for NarrationResponse {
    fn from(handle: &AudioHandle) -> Self {
        Self {
            id: handle.id().to_string(),
            url: handle.url(),
            mime_type: handle.mime_type().to_string(),
            size_bytes: handle.len(),
            duration_ms: handle.duration_ms(),
        }
    }
}

#[derive(Deserialize)]
pub struct PreloadRequest {
    pub text: String,
    pub voice_id: String,
    pub delay_ms: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PreloadResponse {
    pub token: Uuid,
    pub delay_ms: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CancelResponse {
    pub cancelled: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ReleaseResponse {
    pub released: usize,
}

pub async fn health_check() -> &'static str {
    "ok"
}

/// Resolve narration audio, generating it on a miss.
pub async fn load_narration(
    State(state): State<AppState>,
    Json(req): Json<NarrationRequest>,
) -> Result<Json<NarrationResponse>, ApiError> {
    let start = Instant::now();
    let result = async {
        validate_narration_request(&req.text, &req.voice_id)?;
        let handle = state.loader.load(&req.text, &req.voice_id).await?;
        Ok::<_, ApiError>(Json(NarrationResponse::from(&handle)))
    }
    .await;

    state.metrics.narration.record_request(start.elapsed().as_millis() as u64);
    if result.is_err() {
        state.metrics.narration.record_error();
    }
    result
}

/// Serve cached audio bytes by content id.
pub async fn narration_audio(State(state): State<AppState>, Path(id): Path<String>) -> Result<Response, ApiError> {
    let start = Instant::now();
    let result = state
        .loader
        .lookup_by_id(&id)
        .ok_or_else(|| ApiError::NotFound(format!("No cached narration with id {id}")));

    state.metrics.audio.record_request(start.elapsed().as_millis() as u64);
    let handle = result.inspect_err(|_| state.metrics.audio.record_error())?;

    Ok((
        [
            (header::CONTENT_TYPE, handle.mime_type().to_string()),
            // Content-addressed: the bytes behind an id never change.
            (header::CACHE_CONTROL, "private, max-age=31536000, immutable".to_string()),
        ],
        handle.bytes(),
    )
        .into_response())
}

/// Schedule a next-step preload, replacing any pending one.
pub async fn schedule_preload(
    State(state): State<AppState>,
    Json(req): Json<PreloadRequest>,
) -> Result<Json<PreloadResponse>, ApiError> {
    let start = Instant::now();
    let delay = req
        .delay_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| state.config.preload_delay());
    let delay_ms = delay.as_millis() as u64;
    let result = validate_narration_request(&req.text, &req.voice_id)
        .and_then(|()| validate_preload_delay(delay_ms))
        .map(|()| {
            let token = state
                .scheduler
                .schedule_preload(&req.text, &req.voice_id, delay);
            debug!(token = %token.id(), delay_ms, "Preload scheduled");
            Json(PreloadResponse {
                token: token.id(),
                delay_ms,
            })
        });

    state.metrics.preload.record_request(start.elapsed().as_millis() as u64);
    if result.is_err() {
        state.metrics.preload.record_error();
    }
    result
}

/// Cancel the pending preload identified by `token`.
pub async fn cancel_preload(
    State(state): State<AppState>,
    Path(token): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    match state.scheduler.current() {
        Some(current) if current.id() == token => Ok(Json(CancelResponse {
            cancelled: current.cancel(),
        })),
        _ => Err(ApiError::NotFound(format!("No scheduled preload with token {token}"))),
    }
}

/// Session teardown: drop the pending preload and every cached narration.
pub async fn release_narration(State(state): State<AppState>) -> Json<ReleaseResponse> {
    state.scheduler.cancel_pending();
    let released = state.loader.release_all();
    info!(released, "Narration session released");
    Json(ReleaseResponse { released })
}

pub async fn metrics_endpoint(State(state): State<AppState>) -> Json<MetricsResponse> {
    let mut system = sysinfo::System::new();
    system.refresh_memory();

    Json(MetricsResponse {
        timestamp: chrono::Utc::now(),
        system: SystemMetrics {
            memory_used_mb: system.used_memory() / 1024 / 1024,
            memory_total_mb: system.total_memory() / 1024 / 1024,
            uptime_seconds: state.started_at.elapsed().as_secs(),
        },
        loader: state.loader.stats(),
        endpoints: EndpointMetricsResponse {
            narration: state.metrics.narration.snapshot(),
            audio: state.metrics.audio.snapshot(),
            preload: state.metrics.preload.snapshot(),
        },
    })
}
