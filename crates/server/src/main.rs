use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use dotenv::dotenv;
use portada_core::{FetchConfig, LoggingConfig, ServerConfig, WhatsAppConfig};
use portada_server::{AppState, GraphClient, app, load_settings};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    let defaults = env_path("PORTADA_DEFAULTS", "configs/defaults.json");
    let overrides = env_path("PORTADA_SETTINGS", "configs/settings.json");

    let settings = load_settings(&defaults, &overrides);

    let logging: LoggingConfig = settings.section("logging");
    let server: ServerConfig = settings.section("server");
    let default_level = if server.debug { "debug" } else { logging.level.as_str() };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(false)
        .init();

    let whatsapp: WhatsAppConfig = settings.section("whatsapp");
    let missing = whatsapp.missing_credentials();
    if !missing.is_empty() {
        tracing::warn!(?missing, "WhatsApp credentials missing; set WHATSAPP_TOKEN, WHATSAPP_PHONE_ID and WHATSAPP_VERIFY_TOKEN");
    }

    let state = AppState {
        editions_dir: server.editions_dir.clone(),
        fetch: FetchConfig::default(),
        verify_token: whatsapp.verify_token.clone(),
        messenger: Arc::new(GraphClient::new(&whatsapp)),
        settings: Arc::new(settings),
    };

    let addr = server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;

    eprintln!("Portada server v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Webhook: http://{addr}/webhook");
    eprintln!("   Health:  http://{addr}/health");
    tracing::info!(%addr, editions = %server.editions_dir.display(), "server started");

    axum::serve(listener, app(state)).await.context("Server error")?;
    Ok(())
}

fn env_path(variable: &str, default: &str) -> PathBuf {
    std::env::var_os(variable).map(PathBuf::from).unwrap_or_else(|| PathBuf::from(default))
}
