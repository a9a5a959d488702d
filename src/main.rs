mod app;
mod codec;
mod config;
mod dispatch;
mod error;
mod hello;
mod sites;
mod store;

use std::sync::Arc;

use lambda_http::{run, tracing, Error};

use crate::app::{create_app, AppState};
use crate::config::{Backend, Config};
use crate::error::ServerError;
use crate::store::{DynamoDbStore, InMemoryStore, SiteStore};

async fn build_store(config: &Config) -> Result<Arc<dyn SiteStore>, ServerError> {
    match config.backend {
        Backend::Memory => {
            tracing::warn!("using the in-memory store, visits are not persisted");
            Ok(Arc::new(InMemoryStore::new()))
        }
        Backend::DynamoDb => {
            let store = DynamoDbStore::connect(config).await;
            if config.ensure_table {
                let status = store.ensure_table().await?;
                tracing::info!(table = store.table_name(), %status, "visits table ready");
            }
            Ok(Arc::new(store))
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .json()
        .with_max_level(config.log_level)
        .with_current_span(false)
        .with_ansi(false)
        .without_time()
        .with_target(true)
        .init();

    tracing::info!(
        backend = ?config.backend,
        table = %config.table_name,
        region = %config.region,
        "starting visit counter"
    );

    let store = build_store(&config).await?;
    let app = create_app(AppState { store });

    run(app).await
}
