//! Postgres access for the product catalog: pool setup, schema migrations,
//! product CRUD, and reference data.

use std::time::Duration;

use catalog_core::AppConfig;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

pub mod products;
pub mod reference;

pub use products::{
    create_product, get_product, list_products, load_snapshot, soft_delete_product,
    update_product, PgCatalog, ProductRow,
};
pub use reference::{list_brand_ids, list_category_ids, seed_reference_data};

// Relative to crates/catalog-db/Cargo.toml.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

// Postgres `undefined_table`.
const UNDEFINED_TABLE: &str = "42P01";

/// Pool sizing taken from the `CATALOG_DB_*` settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_connections: config.db_max_connections,
            min_connections: config.db_min_connections,
            acquire_timeout_secs: config.db_acquire_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    /// A product write the catalog refuses before touching the database.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Opens the catalog pool.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if no connection can be established within the
/// acquire timeout.
pub async fn connect_pool(database_url: &str, config: PoolConfig) -> Result<PgPool, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs))
        .connect(database_url)
        .await?;
    Ok(pool)
}

/// Brings the products, categories, and brands schema up to date.
///
/// Returns how many migrations were pending before the run.
///
/// # Errors
///
/// Returns [`DbError::Migration`] if a migration fails, or
/// [`DbError::Sqlx`] if the applied versions cannot be read.
pub async fn run_migrations(pool: &PgPool) -> Result<usize, DbError> {
    let pending = pending_migrations(pool).await?;
    MIGRATOR.run(pool).await?;
    if pending > 0 {
        tracing::info!(applied = pending, "catalog schema migrated");
    }
    Ok(pending)
}

async fn pending_migrations(pool: &PgPool) -> Result<usize, DbError> {
    let applied: Vec<i64> =
        match sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
        {
            Ok(versions) => versions,
            // Fresh database: the ledger table is created by the first run.
            Err(sqlx::Error::Database(e)) if e.code().as_deref() == Some(UNDEFINED_TABLE) => {
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

    Ok(MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .count())
}

/// Round-trips `SELECT 1`; used by `db ping` and `/api/v1/health`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the database does not answer.
pub async fn ping(pool: &PgPool) -> Result<(), DbError> {
    sqlx::query_scalar::<_, i32>("SELECT 1")
        .fetch_one(pool)
        .await?;
    Ok(())
}
