use narration_core::NarrationLoader;
use server::{config::ServerConfig, create_app, AppState};
use speech_client::{client_from_config, SpeechClientConfig};
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting narration server...");

    let speech_config = SpeechClientConfig::from_env();
    info!(?speech_config, "Speech client configuration loaded");
    let client = client_from_config(&speech_config)?;
    let loader = NarrationLoader::with_global_services(client);

    let config = ServerConfig::from_env();
    let state = AppState::new(loader.clone(), config.clone());
    let scheduler = state.scheduler.clone();
    let app = create_app(state)?;

    let addr = config.socket_addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {addr}: {e}. Try a different PORT."))?;

    info!("Server listening on http://{addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    scheduler.cancel_pending();
    let released = loader.release_all();
    info!(released, "Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
