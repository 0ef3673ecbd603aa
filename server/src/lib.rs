//! HTTP surface for the narration loader: on-demand narration, cached
//! audio delivery, next-step preloading and session release.

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod validation;

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use narration_core::{NarrationLoader, PreloadScheduler};
use tower::ServiceBuilder;
use tower_governor::{governor::GovernorConfigBuilder, key_extractor::GlobalKeyExtractor, GovernorLayer};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::handlers::{
    cancel_preload, health_check, load_narration, metrics_endpoint, narration_audio, release_narration,
    schedule_preload,
};
use crate::metrics::AppMetrics;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

#[derive(Clone)]
pub struct AppState {
    pub loader: NarrationLoader,
    pub scheduler: Arc<PreloadScheduler>,
    pub metrics: AppMetrics,
    pub config: ServerConfig,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(loader: NarrationLoader, config: ServerConfig) -> Self {
        Self {
            scheduler: Arc::new(PreloadScheduler::new(loader.clone())),
            loader,
            metrics: AppMetrics::default(),
            config,
            started_at: Instant::now(),
        }
    }
}

/// Routes without middleware, served both at the root and under `/api`.
pub fn build_router(state: AppState) -> Router {
    let narration_api = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/narration", post(load_narration))
        .route("/narration/audio/{id}", get(narration_audio))
        .route("/narration/preload", post(schedule_preload))
        .route("/narration/preload/{token}", delete(cancel_preload))
        .route("/narration/release", post(release_narration));

    // Metrics endpoint - consider adding authentication in production
    let metrics_api = Router::new().route("/metrics", get(metrics_endpoint));

    let api = Router::new().merge(narration_api).merge(metrics_api);

    Router::new()
        .merge(api.clone())
        .nest("/api", api)
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    let Some(allowed_origins) = &config.cors_allowed_origins else {
        warn!("CORS_ALLOWED_ORIGINS not set, allowing all origins (development mode)");
        return base.allow_origin(Any);
    };

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| origin.parse::<HeaderValue>().ok())
        .collect();

    if origins.is_empty() {
        warn!("CORS_ALLOWED_ORIGINS is empty, falling back to permissive CORS");
        base.allow_origin(Any)
    } else {
        info!("CORS configured for {} origin(s)", origins.len());
        base.allow_origin(AllowOrigin::list(origins))
    }
}

async fn add_request_id(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        request.headers_mut().insert(REQUEST_ID_HEADER, value.clone());
        let mut response = next.run(request).await;
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
        response
    } else {
        next.run(request).await
    }
}

/// Wrap the router in the request-id, tracing, rate limit, timeout and CORS layers.
pub fn apply_middleware(router: Router, config: &ServerConfig) -> anyhow::Result<Router> {
    let per_minute = config.rate_limit_per_minute.max(1);

    // Global key: every client shares one bucket, which behaves the same behind proxies.
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_millisecond(u64::from(60_000 / per_minute).max(1))
            .burst_size(per_minute)
            .key_extractor(GlobalKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limit configuration: {per_minute} per minute"))?,
    );
    info!("Rate limiting: {} requests per minute", per_minute);

    let middleware_stack = ServiceBuilder::new()
        .layer(TraceLayer::new_for_http())
        .layer(GovernorLayer::new(governor_conf))
        .layer(TimeoutLayer::new(config.request_timeout()))
        .layer(cors_layer(config))
        .into_inner();

    Ok(router
        .layer(axum::middleware::from_fn(add_request_id))
        .layer(middleware_stack))
}

/// Full application: routes plus middleware.
pub fn create_app(state: AppState) -> anyhow::Result<Router> {
    let config = state.config.clone();
    apply_middleware(build_router(state), &config)
}
