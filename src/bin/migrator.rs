use dotenvy::dotenv;
use caixa_service::{
    infrastructure::{config::Config, db},
    telemetry,
};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    telemetry::init();

    let config = Config::from_env()?;
    let pool = db::connect(&config.database).await?;
    db::run_migrations(&pool).await?;
    pool.close().await;

    info!(database_max_connections = config.database.max_connections, "caixa database migrations completed");

    Ok(())
}
