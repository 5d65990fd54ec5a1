//! Bazaar server binary.

use anyhow::{Context, Result};
use bazaar_core::config::AppConfig;
use bazaar_server::bootstrap::ensure_admin_token;
use bazaar_server::repair::{RepairTrigger, run_repair, spawn_scheduler};
use bazaar_server::{AppState, create_router};
use clap::Parser;
use figment::Figment;
use figment::providers::{Env, Format, Toml};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Bazaar - marketplace API server
#[derive(Parser, Debug)]
#[command(name = "bazaard")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "BAZAAR_CONFIG",
        default_value = "config/server.toml"
    )]
    config: String,
}

/// Load configuration from an optional TOML file overlaid with `BAZAAR_` env vars.
fn load_config(config_path: &str) -> Result<AppConfig> {
    let path = std::path::Path::new(config_path);
    let mut figment = Figment::new();
    let has_config_file = path.exists();

    if has_config_file {
        tracing::info!(config_path = %config_path, "Loading configuration from file");
        figment = figment.merge(Toml::file(config_path));
    } else {
        tracing::debug!("No config file found at {}", config_path);
    }

    // BAZAAR_CONFIG is only the path
    let has_env_config =
        std::env::vars().any(|(key, _)| key.starts_with("BAZAAR_") && key != "BAZAAR_CONFIG");

    if !has_config_file && !has_env_config {
        anyhow::bail!(
            "No configuration provided.\n\n\
             Provide configuration via one of:\n  \
             1. Config file: bazaard --config /path/to/config.toml\n  \
             2. Environment variables: BAZAAR_SERVER__BIND=0.0.0.0:8080 \
             BAZAAR_ADMIN__TOKEN_HASH=sha256:YOUR_TOKEN_HASH_HERE bazaard\n\n\
             See config/server.example.toml for example configuration."
        );
    }

    if !has_config_file {
        tracing::info!("Using environment variables for configuration");
    }

    let config: AppConfig = figment
        .merge(Env::prefixed("BAZAAR_").split("__"))
        .extract()
        .context("failed to load configuration")?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("invalid configuration: {e}"))?;

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Bazaar v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&args.config)?;

    bazaar_server::metrics::register_metrics();
    tracing::info!("Prometheus metrics registered");

    let metadata = bazaar_metadata::from_config(&config.metadata)
        .await
        .context("failed to initialize metadata store")?;
    tracing::info!("Metadata store initialized");

    ensure_admin_token(metadata.as_ref(), &config.admin).await?;

    let state = AppState::new(config.clone(), metadata);

    if config.repair.repair_on_startup {
        // A failed startup pass is logged and recorded, not fatal.
        if let Err(e) = run_repair(&state, RepairTrigger::Startup, None).await {
            tracing::warn!(error = %e, "Startup repair run failed");
        }
    }

    if config.repair.auto_repair_enabled {
        let _scheduler = spawn_scheduler(state.clone());
    } else {
        tracing::info!("Automatic repair disabled");
    }

    let app = create_router(state);

    let addr: SocketAddr = config.server.bind.parse().context("invalid bind address")?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}
