//! Tidepool API Server
//!
//! Main entry point for the Tidepool backend service.

use anyhow::Context;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use tidepool_api::{AppState, create_router};
use tidepool_core::storage::{StorageBindings, provider_name};
use tidepool_db::{AuthRepository, connect_with_config};
use tidepool_shared::AppConfig;
use tidepool_shared::config::{LogConfig, LogFormat};

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{level},tower_http={level},sqlx=warn",
            level = log.level
        ))
    });
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json().with_current_span(false))
            .init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// How often expired session rows are deleted.
const SESSION_SWEEP_PERIOD: Duration = Duration::from_secs(3600);

/// Deletes expired sessions now and then once per period.
fn spawn_session_sweep(repo: AuthRepository, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            match repo.cleanup_expired().await {
                Ok(0) => {}
                Ok(removed) => info!(removed, "pruned expired sessions"),
                Err(e) => warn!(error = %e, "session sweep failed"),
            }
        }
    })
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => warn!(error = %e, "failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("received SIGINT"),
        () = terminate => info!("received SIGTERM"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log);

    let db = connect_with_config(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let storage = StorageBindings::from_settings(&config.storage)
        .context("invalid storage configuration")?;
    match &config.storage.bucket {
        Some(bucket) => {
            let (provider, name) = provider_name(bucket);
            info!(provider, bucket = name, "object bucket storage configured");
        }
        None => info!(root = %config.storage.local_root, "local filesystem storage configured"),
    }

    let sweep = spawn_session_sweep(AuthRepository::new(db.clone()), SESSION_SWEEP_PERIOD);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let environment = config.environment.clone();
    let state = AppState::new(config, db.clone(), storage);
    let app = create_router(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(environment = %environment, "Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweep.abort();
    info!("Server stopped; closing database pool");
    db.close().await?;
    Ok(())
}
