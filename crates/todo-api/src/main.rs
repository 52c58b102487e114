//! todo-api バイナリのエントリポイント

use anyhow::Context;
use infrastructure::{DynamoDbClient, DynamoTodoRepository, InMemoryTodoRepository};
use shared::{init_telemetry, shutdown_telemetry, Config, StoreKind};
use todo_api::{app, routes, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env は任意
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_telemetry(&config)?;

    let state = match config.store {
        StoreKind::Memory => {
            info!("using in-memory todo store");
            AppState::with_repository(InMemoryTodoRepository::new())
        }
        StoreKind::DynamoDb => {
            let db = DynamoDbClient::new(&config).await;
            if config.dynamodb_endpoint.is_some() {
                db.ensure_table().await?;
            }
            info!(table = %db.table_name(), "using DynamoDB todo store");
            AppState::with_repository(DynamoTodoRepository::new(db))
        }
    };

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    for (method, path) in routes() {
        info!(%method, path, "route registered");
    }
    info!(%addr, app_name = %config.app_name, "server starting");

    let router = app(state, config.request_timeout);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    shutdown_telemetry();
    Ok(())
}

/// Ctrl-C または SIGTERM を待つ
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("shutdown signal received");
}
