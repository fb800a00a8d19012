//! Category and brand reference tables.

use catalog_core::{ReferenceData, ReferenceEntry};
use sqlx::PgPool;

use crate::DbError;

/// Upserts categories and brands from reference data, keyed by id.
///
/// Returns `(categories, brands)` processed. Everything runs in one
/// transaction; any failure rolls the whole seed back.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any database operation fails.
pub async fn seed_reference_data(
    pool: &PgPool,
    data: &ReferenceData,
) -> Result<(usize, usize), DbError> {
    let mut tx = pool.begin().await?;

    for entry in &data.categories {
        upsert_entry(&mut tx, "categories", entry).await?;
    }
    for entry in &data.brands {
        upsert_entry(&mut tx, "brands", entry).await?;
    }

    tx.commit().await?;
    Ok((data.categories.len(), data.brands.len()))
}

async fn upsert_entry(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    table: &'static str,
    entry: &ReferenceEntry,
) -> Result<(), DbError> {
    sqlx::query(&format!(
        "INSERT INTO {table} (id, name) VALUES ($1, $2) \
         ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = NOW()"
    ))
    .bind(entry.id)
    .bind(entry.name.trim())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Ids of every category, ascending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_category_ids(pool: &PgPool) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM categories ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}

/// Ids of every brand, ascending.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_brand_ids(pool: &PgPool) -> Result<Vec<i64>, DbError> {
    let ids = sqlx::query_scalar::<_, i64>("SELECT id FROM brands ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(ids)
}
