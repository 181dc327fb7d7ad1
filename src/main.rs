use std::net::SocketAddr;
use std::sync::Arc;

use axum::{serve, Extension};
use caixa_service::{
    api,
    infrastructure::{config::Config, db, state::AppState},
    telemetry,
};
use dotenvy::dotenv;
use tokio::signal;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init();
    let config = Arc::new(Config::from_env()?);
    let pool = db::connect(&config.database).await?;
    db::run_migrations(&pool).await?;
    info!("database migrations completed successfully");
    let state = Arc::new(AppState::new(Arc::clone(&config), pool));

    if config.auth.bypass_auth {
        warn!(
            login = config.auth.bypass_login.as_deref().unwrap_or_default(),
            "authentication bypass is enabled"
        );
    }

    let router = api::build_router(Arc::clone(&config)).layer(Extension(Arc::clone(&state)));

    let addr: SocketAddr = config.bind_address().parse()?;
    info!(%addr, "starting caixa service");

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| {
            warn!(error = ?err, "server exited with error");
            err
        })?;

    state.pool.close().await;
    info!("caixa service stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
