//! # mailflowd — mailflow daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Parse configuration (config file, env vars)
//! - Install the `tracing` subscriber
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct adapters and the automation engine
//! - Spawn the delay sweeper and the event recorder
//! - Bind to a TCP port and serve the HTTP API
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer. No domain logic belongs here.

mod config;
mod sweeper;
mod wiring;

use std::sync::Arc;

use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use mailflow_adapter_http_axum::state::AppState;
use mailflow_adapter_storage_sqlite_sqlx::SqliteEventStore;
use mailflow_adapter_storage_sqlite_sqlx::pool::Config as DatabaseConfig;
use mailflow_adapter_virtual::VirtualMailer;
use mailflow_app::automation_engine::AutomationEngine;
use mailflow_app::event_bus::{InProcessEventBus, persist_events};

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&config.logging.filter)?)
        .init();

    // Database
    let db = DatabaseConfig {
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
    }
    .build()
    .await?;

    // Adapters
    let event_bus = Arc::new(InProcessEventBus::new(config.events.capacity));
    let mailer = Arc::new(VirtualMailer::new().with_bounces(&config.mailer.bounce));
    let ports = wiring::adapters(&db, mailer, Arc::clone(&event_bus));
    let engine = Arc::new(AutomationEngine::new(
        ports.clone(),
        config.engine_config(),
    ));

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let recorder = tokio::spawn(persist_events(
        event_bus.subscribe(),
        SqliteEventStore::new(db.pool().clone()),
    ));
    let sweeper = config.scheduler.enabled.then(|| {
        tokio::spawn(sweeper::run(
            Arc::clone(&engine),
            config.sweep_interval(),
            config.scheduler.batch_size,
            shutdown_rx,
        ))
    });

    // HTTP
    let state = AppState::new(
        ports,
        engine,
        SqliteEventStore::new(db.pool().clone()),
        Arc::clone(&event_bus),
    );
    let app = mailflow_adapter_http_axum::router::build(state);

    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "mailflowd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The sweeper stops between ticks, never mid-claim.
    let _ = shutdown_tx.send(true);
    if let Some(sweeper) = sweeper {
        sweeper.await?;
    }
    recorder.abort();
    tracing::info!("mailflowd stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
