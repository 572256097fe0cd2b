use chrono::Duration;
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::sync::Arc;
use tracing::info;

use crate::{
    access::{AccessGate, CapabilityTokenAuthority, PgSharedLinkStore},
    api::handlers::AppState,
    config::Config,
    directory::PgUserDirectory,
    error::AppResult,
    ledger::{LedgerMutator, PgLedgerStore, ReconciliationEngine},
    timelog::{PgTimeLogStore, TimeLogAggregator},
};

pub async fn initialize_app_state(config: Config) -> AppResult<AppState> {
    info!("Initializing application components ...");

    let pool = initialize_database(&config.database_url).await?;

    let timelog = Arc::new(PgTimeLogStore::new(pool.clone()));
    let directory = Arc::new(PgUserDirectory::new(pool.clone()));
    let ledger = Arc::new(PgLedgerStore::new(pool.clone()));
    let links = Arc::new(PgSharedLinkStore::new(pool.clone()));

    let aggregator = Arc::new(TimeLogAggregator::new(timelog));

    let engine = Arc::new(ReconciliationEngine::new(
        aggregator.clone(),
        directory.clone(),
        ledger.clone(),
    ));
    let mutator = Arc::new(LedgerMutator::new(ledger, aggregator, directory.clone()));

    let link_ttl = config.shared_link_ttl_days.map(Duration::days);
    let authority = Arc::new(CapabilityTokenAuthority::new(links, link_ttl));
    let gate = Arc::new(AccessGate::new(authority.clone()));

    info!("✅ Application components ready");

    Ok(AppState {
        engine,
        mutator,
        authority,
        gate,
        sessions: directory,
        config: Arc::new(config),
    })
}

async fn initialize_database(database_url: &str) -> AppResult<PgPool> {
    info!("Connecting to database ...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await?;

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("✅ Database ready");

    Ok(pool)
}
