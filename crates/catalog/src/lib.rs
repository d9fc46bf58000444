//! Site table catalog for tabula.
//!
//! This crate owns everything that touches the relational backend:
//! - Sites and the registry of logical tables
//! - Provisioning and dropping physical tables
//! - Schema introspection and per-operation schema changes
//! - Record reads and writes on site tables

pub mod error;
pub mod models;
pub mod postgres;
pub mod repos;
pub mod sql;
pub mod store;

pub use error::{CatalogError, CatalogResult};
pub use models::{Record, SiteRow, TableRow};
pub use postgres::PostgresStore;
pub use repos::{RecordRepo, SchemaRepo, SiteRepo, TableRepo, apply_schema_ops};
pub use store::{CatalogStore, SqliteStore};

use std::sync::Arc;
use tabula_core::config::DatabaseConfig;

/// Create a catalog store from configuration.
pub async fn from_config(config: &DatabaseConfig) -> CatalogResult<Arc<dyn CatalogStore>> {
    match config {
        DatabaseConfig::Sqlite { path } => {
            let store = SqliteStore::new(path).await?;
            Ok(Arc::new(store) as Arc<dyn CatalogStore>)
        }
        DatabaseConfig::Postgres {
            url,
            host,
            port,
            username,
            password,
            database,
            ssl_mode,
            max_connections,
            statement_timeout_ms,
        } => {
            let store = if let Some(url) = url {
                tracing::info!("Connecting to PostgreSQL using connection URL");
                PostgresStore::from_url(url, *max_connections, *statement_timeout_ms).await?
            } else if let (Some(host), Some(database)) = (host.as_ref(), database.as_ref()) {
                PostgresStore::from_params(
                    host,
                    port.unwrap_or(5432),
                    username.as_deref(),
                    password.as_deref(),
                    database,
                    *ssl_mode,
                    *max_connections,
                    *statement_timeout_ms,
                )
                .await?
            } else {
                return Err(CatalogError::Config(
                    "postgres config requires either 'url' or 'host' + 'database'".to_string(),
                ));
            };
            Ok(Arc::new(store) as Arc<dyn CatalogStore>)
        }
    }
}
