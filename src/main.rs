use std::sync::Arc;

use anyhow::Result;
use axum::http::StatusCode;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use user_service::{create_router, AppConfig, RecoveryLayer, UserRepository};

#[tokio::main]
async fn main() -> Result<()> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "user_service=debug,tower_http=debug".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");

    let repository = Arc::new(UserRepository::from_config(&config.database).await?);
    info!("Database connection pool initialized");

    sqlx::migrate!("./migrations").run(repository.pool()).await?;
    info!("Database migrations applied");

    let not_found_status = StatusCode::from_u16(config.server.not_found_status)
        .unwrap_or(StatusCode::NOT_FOUND);
    let router = create_router(Arc::clone(&repository), not_found_status)
        .layer(RecoveryLayer::new().with_backtrace(config.recovery.print_stack));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(host = %config.server.host, port = %config.server.port, "API server listening");

    let server_handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!(error = %e, "API server error");
        }
    });

    signal::ctrl_c().await?;
    info!("Shutdown signal received");

    server_handle.abort();
    info!("Application stopped");
    Ok(())
}
