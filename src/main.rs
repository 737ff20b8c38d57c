//! webapp: health check service entry point.
//!
//! Initializes tracing, loads configuration, connects to Postgres, serves
//! `/healthz` until SIGTERM/SIGINT, then closes the pool. A configuration or
//! initial connection failure is logged and exits with a non-zero status.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use webapp::config::{AppConfig, DEFAULT_LOG_FILTER};
use webapp::db::{Database, HealthStore};
use webapp::http::start_server;
use webapp::routes::create_router;
use webapp::state::AppState;

/// Log output format
#[derive(Clone, Copy, Debug, ValueEnum)]
enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// webapp: HTTP health check service with a database write probe
#[derive(Parser, Debug)]
#[command(name = "webapp", version, about)]
struct Args {
    /// Optional TOML configuration file; environment variables take precedence
    #[arg(short, long, env = "WEBAPP_CONFIG")]
    config: Option<PathBuf>,

    /// Log level filter (e.g., "webapp=debug,sqlx=warn")
    #[arg(short, long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn init_tracing(args: &Args) {
    // Priority: CLI > env > default
    let log_filter = args
        .log_level
        .clone()
        .or_else(|| std::env::var("RUST_LOG").ok())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

    let registry =
        tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(&log_filter));

    match args.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_tracing(&args);

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            return Err(e.into());
        }
    };
    tracing::info!(
        http_port = config.http.port,
        db_host = %config.database.host,
        db_port = config.database.port,
        db_name = %config.database.name,
        db_user = %config.database.user,
        has_password = config.database.has_password(),
        "Loaded configuration"
    );

    let database = match Database::connect(&config.database).await {
        Ok(database) => database,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize database");
            return Err(e.into());
        }
    };
    tracing::info!("Initialized database pool");

    let store: Arc<dyn HealthStore> = Arc::new(database.clone());
    let app = create_router(AppState::new(Some(store)));

    let served = start_server(app, &config.http).await;

    // Release the pool on every exit path once the server is done with it.
    database.close().await;

    if let Err(e) = served {
        tracing::error!(error = %e, "Server failed");
        return Err(e.into());
    }

    Ok(())
}
