mod api;
mod db;
mod error;
mod models;
mod policy;
mod scheduler;

use api::ApiState;
use db::Db;
use policy::Strategy;
use scheduler::Scheduler;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://reviews.db?mode=rwc".to_string());
    let strategy = match std::env::var("SCHEDULER_STRATEGY") {
        Ok(value) => value
            .parse::<Strategy>()
            .map_err(|e| anyhow::anyhow!("SCHEDULER_STRATEGY: {e}"))?,
        Err(_) => Strategy::StreakTable,
    };
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());

    let db = Db::new(&database_url).await?;
    let scheduler = Scheduler::new(db, strategy);
    log::info!("scheduling strategy: {:?}", scheduler.strategy());

    let state = ApiState {
        scheduler: Arc::new(scheduler),
    };
    let router = api::app_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    log::info!("listening on {bind_addr}");
    axum::serve(listener, router).await?;

    Ok(())
}
