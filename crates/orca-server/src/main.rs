use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing_subscriber::EnvFilter;

use orca_consumer::KafkaConsumer;
use orca_content::{parse_rule_content_dir, ContentCache, ContentUpdater, RuleContentDirectory};
use orca_server::app::build_app;
use orca_server::config::Config;
use orca_server::state::AppState;
use orca_storage::Storage;

/// Normal shutdown.
const EXIT_STATUS_OK: i32 = 0;
/// Consumer (or anything before it: config, storage) failed to start, or
/// failed fatally while running.
const EXIT_STATUS_CONSUMER_ERROR: i32 = 1;
/// HTTP server failed to start.
const EXIT_STATUS_SERVER_ERROR: i32 = 2;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/server.toml".to_string());
    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(path = %config_path, error = %err, "cannot load configuration");
            return EXIT_STATUS_CONSUMER_ERROR;
        }
    };

    // Storage first: both serving loops depend on it being migrated, so
    // readiness is established by construction rather than by polling.
    let storage = match Storage::new(&config.storage).await {
        Ok(storage) => storage,
        Err(err) => {
            tracing::error!(error = %err, "cannot connect to storage");
            return EXIT_STATUS_CONSUMER_ERROR;
        }
    };
    if let Err(err) = storage.init().await {
        tracing::error!(error = %err, "cannot initialize storage schema");
        return EXIT_STATUS_CONSUMER_ERROR;
    }
    let storage = Arc::new(storage);

    let catalog = match parse_rule_content_dir(&config.content.path) {
        Ok(catalog) => {
            tracing::info!(rules = catalog.len(), path = %config.content.path, "rule content loaded");
            catalog
        }
        Err(err) => {
            tracing::warn!(
                path = %config.content.path,
                error = %err,
                "cannot load rule content, starting with an empty catalog"
            );
            RuleContentDirectory::new()
        }
    };
    let content = Arc::new(ContentCache::new(catalog));
    if config.content.refresh_interval_secs > 0 {
        let updater = ContentUpdater::new(
            content.clone(),
            PathBuf::from(&config.content.path),
            Duration::from_secs(config.content.refresh_interval_secs),
        );
        tokio::spawn(updater.run());
    } else {
        tracing::info!("rule content refresh is disabled");
    }

    let consumer = Arc::new(KafkaConsumer::new(config.broker.clone(), storage.clone()));
    let consumer_runner = consumer.clone();
    let mut consumer_task = tokio::spawn(async move { consumer_runner.serve().await });

    let state = AppState {
        storage: storage.clone(),
        content,
    };
    let app = build_app(state, &config.server.api_prefix, config.server.debug);
    let listener = match tokio::net::TcpListener::bind(&config.server.address).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(address = %config.server.address, error = %err, "cannot bind HTTP server");
            return EXIT_STATUS_SERVER_ERROR;
        }
    };
    tracing::info!(address = %config.server.address, "HTTP server listening");

    let (shutdown_tx, mut shutdown_rx) = tokio::sync::watch::channel(false);
    let mut server_task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
    });

    let mut consumer_failed = false;
    let mut consumer_done = false;
    tokio::select! {
        _ = signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
        result = &mut consumer_task => {
            consumer_done = true;
            match result {
                Ok(Ok(())) => tracing::info!("consumer finished"),
                Ok(Err(err)) => {
                    tracing::error!(error = %err, "consumer failed, shutting the service down");
                    consumer_failed = true;
                }
                Err(err) => {
                    tracing::error!(error = %err, "consumer task panicked");
                    consumer_failed = true;
                }
            }
        }
    }

    // Stop taking new work, then give each subsystem a bounded grace window
    // to drain. Every failed shutdown bumps the exit code.
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    let mut failed_shutdowns: i32 = 0;

    consumer.close();
    let _ = shutdown_tx.send(true);

    if !consumer_done {
        match tokio::time::timeout(grace, &mut consumer_task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(err))) => {
                tracing::error!(error = %err, "error during closing consumer");
                failed_shutdowns += 1;
            }
            Ok(Err(err)) => {
                tracing::error!(error = %err, "consumer task panicked during shutdown");
                failed_shutdowns += 1;
            }
            Err(_) => {
                tracing::error!("consumer did not stop within the grace window");
                consumer_task.abort();
                failed_shutdowns += 1;
            }
        }
    }

    match tokio::time::timeout(grace, &mut server_task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(err))) => {
            tracing::error!(error = %err, "error during closing HTTP server");
            failed_shutdowns += 1;
        }
        Ok(Err(err)) => {
            tracing::error!(error = %err, "HTTP server task panicked during shutdown");
            failed_shutdowns += 1;
        }
        Err(_) => {
            tracing::error!("HTTP server did not drain within the grace window");
            server_task.abort();
            failed_shutdowns += 1;
        }
    }

    if let Err(err) = storage.close().await {
        tracing::error!(error = %err, "error during closing storage connection");
        failed_shutdowns += 1;
    }

    if consumer_failed {
        return EXIT_STATUS_CONSUMER_ERROR;
    }
    if failed_shutdowns == 0 {
        EXIT_STATUS_OK
    } else {
        failed_shutdowns
    }
}
