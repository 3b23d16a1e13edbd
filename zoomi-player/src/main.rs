//! Zoomi Exercise Player - headless playback service
//!
//! Opens playback sessions against the local exercise catalog and exposes
//! them to a host screen over HTTP and SSE.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zoomi_common::config::{default_database_path, load_toml_or_default, resolve_config_path};
use zoomi_common::db::init_database;
use zoomi_common::events::EventBus;
use zoomi_common::Locale;
use zoomi_player::catalog::SqliteCatalog;
use zoomi_player::config::{TomlConfig, DEFAULT_PORT};
use zoomi_player::media::{HttpNarrationBackend, TracingAnimationSurface};
use zoomi_player::playback::{AudioUrlBuilder, ExerciseResolver, PlayerDeps};
use zoomi_player::progress::progress_logger_from_config;
use zoomi_player::SharedState;

const NARRATION_FETCH_TIMEOUT_SECS: u64 = 30;

#[derive(Parser, Debug)]
#[command(name = "zoomi-player")]
#[command(about = "Exercise playback service for Zoomi")]
#[command(version)]
struct Args {
    /// HTTP port (overrides the config file)
    #[arg(short, long, env = "ZOOMI_PORT")]
    port: Option<u16>,

    /// SQLite catalog path (overrides the config file)
    #[arg(short, long, env = "ZOOMI_DATABASE")]
    database: Option<PathBuf>,

    /// Config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Initial display locale ("he" or "en")
    #[arg(short, long)]
    locale: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = resolve_config_path(args.config.as_deref(), "ZOOMI_CONFIG");
    let mut config: TomlConfig =
        load_toml_or_default(config_path.as_deref()).context("Failed to load configuration")?;

    let level = config.logging.level.clone();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("zoomi_player={level},zoomi_common={level},tower_http={level}").into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match &config_path {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }

    if let Some(tag) = &args.locale {
        config.player.locale = Locale::from_language_tag(tag);
    }
    let port = args.port.or(config.port).unwrap_or(DEFAULT_PORT);
    let database_path = args
        .database
        .or_else(|| config.database_path.clone())
        .unwrap_or_else(default_database_path);

    info!("Starting Zoomi Exercise Player on port {}", port);
    info!("Catalog: {}", database_path.display());
    info!("Display locale: {}", config.player.locale);

    let db = init_database(&database_path)
        .await
        .context("Failed to open exercise catalog")?;

    let catalog = Arc::new(SqliteCatalog::new(db));
    let resolver = ExerciseResolver::new(catalog, AudioUrlBuilder::from_config(&config.backend));

    let audio = HttpNarrationBackend::new(std::time::Duration::from_secs(NARRATION_FETCH_TIMEOUT_SECS))
        .context("Failed to build narration client")?;
    let progress = progress_logger_from_config(&config.backend, config.player.progress_timeout())
        .context("Failed to build progress client")?;
    if config.backend.api_base_url.is_none() {
        info!("No backend configured; completions credit the fallback award");
    }

    let deps = PlayerDeps {
        resolver: Arc::new(resolver),
        audio: Arc::new(audio),
        animation: Arc::new(TracingAnimationSurface),
        progress: Arc::from(progress),
        events: Arc::new(EventBus::new(config.player.event_capacity)),
        config: config.player.clone(),
    };

    let state = Arc::new(SharedState::new(deps));

    zoomi_player::api::run(port, state, shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
