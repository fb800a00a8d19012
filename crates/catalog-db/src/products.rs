//! Database operations for the `products` table.

use catalog_core::{CatalogWriter, GatewayError, NewProduct, Product, ProductChanges};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::DbError;

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from `products`, joined with its category and brand names.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProductRow {
    pub id: i64,
    pub description: String,
    pub detailed_description: Option<String>,
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
    pub brand_id: Option<i64>,
    pub brand_name: Option<String>,
    pub featured: bool,
    pub applies_all_plans: bool,
    pub image_url_1: Option<String>,
    pub image_url_2: Option<String>,
    pub image_url_3: Option<String>,
    pub image_url_4: Option<String>,
    pub image_url_5: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: row.id,
            description: row.description,
            detailed_description: row.detailed_description,
            price: row.price,
            category_id: row.category_id,
            category_name: row.category_name,
            brand_id: row.brand_id,
            brand_name: row.brand_name,
            featured: row.featured,
            applies_all_plans: row.applies_all_plans,
            images: [
                row.image_url_1,
                row.image_url_2,
                row.image_url_3,
                row.image_url_4,
                row.image_url_5,
            ],
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// Selects a `ProductRow` from any relation aliased `p`.
const PRODUCT_COLUMNS: &str = "p.id, p.description, p.detailed_description, p.price, \
     p.category_id, c.name AS category_name, p.brand_id, b.name AS brand_name, \
     p.featured, p.applies_all_plans, \
     p.image_url_1, p.image_url_2, p.image_url_3, p.image_url_4, p.image_url_5, \
     p.created_at, p.updated_at";

const PRODUCT_JOINS: &str = "LEFT JOIN categories c ON c.id = p.category_id \
     LEFT JOIN brands b ON b.id = p.brand_id";

// ---------------------------------------------------------------------------
// Queries
// ---------------------------------------------------------------------------

/// Returns live products ordered by description, optionally filtered by a
/// case-insensitive substring of the description.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_products(
    pool: &PgPool,
    search: Option<&str>,
    limit: i64,
) -> Result<Vec<ProductRow>, DbError> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p {PRODUCT_JOINS} \
         WHERE p.deleted_at IS NULL \
           AND ($1::TEXT IS NULL OR p.description ILIKE '%' || $1 || '%') \
         ORDER BY p.description, p.id \
         LIMIT $2"
    ))
    .bind(search)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Returns a single live product, or `None` if it does not exist or was deleted.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_product(pool: &PgPool, id: i64) -> Result<Option<ProductRow>, DbError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p {PRODUCT_JOINS} \
         WHERE p.id = $1 AND p.deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Loads every live product, ordered by id, as the point-in-time view an
/// import run reconciles against.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn load_snapshot(pool: &PgPool) -> Result<Vec<Product>, DbError> {
    let rows = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products p {PRODUCT_JOINS} \
         WHERE p.deleted_at IS NULL \
         ORDER BY p.id"
    ))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Product::from).collect())
}

/// Inserts a product and returns the stored row.
///
/// # Errors
///
/// Returns [`DbError::InvalidInput`] for a blank description or a
/// non-positive price, and [`DbError::Sqlx`] if the insert fails (including
/// unknown category or brand ids).
pub async fn create_product(pool: &PgPool, product: &NewProduct) -> Result<ProductRow, DbError> {
    let description = product.description.trim();
    if description.is_empty() {
        return Err(DbError::InvalidInput("description must not be empty".to_string()));
    }
    if product.price <= Decimal::ZERO {
        return Err(DbError::InvalidInput("price must be positive".to_string()));
    }
    let [img1, img2, img3, img4, img5] = &product.images;

    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "WITH p AS ( \
             INSERT INTO products \
               (description, detailed_description, price, category_id, brand_id, featured, \
                applies_all_plans, image_url_1, image_url_2, image_url_3, image_url_4, image_url_5) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
             RETURNING * \
         ) \
         SELECT {PRODUCT_COLUMNS} FROM p {PRODUCT_JOINS}"
    ))
    .bind(description)
    .bind(product.detailed_description.as_deref())
    .bind(product.price)
    .bind(product.category_id)
    .bind(product.brand_id)
    .bind(product.featured)
    .bind(product.applies_all_plans)
    .bind(img1.as_deref())
    .bind(img2.as_deref())
    .bind(img3.as_deref())
    .bind(img4.as_deref())
    .bind(img5.as_deref())
    .fetch_one(pool)
    .await?;
    Ok(row)
}

/// Applies a sparse update to a live product and returns the updated row,
/// or `None` when no live product has `id`.
///
/// Non-null columns use `COALESCE($n, col)`. Nullable columns take a
/// "supplied" flag plus a value so `Some(None)` can clear them.
///
/// # Errors
///
/// Returns [`DbError::InvalidInput`] for a blank description or a
/// non-positive price, and [`DbError::Sqlx`] if the update fails.
pub async fn update_product(
    pool: &PgPool,
    id: i64,
    changes: &ProductChanges,
) -> Result<Option<ProductRow>, DbError> {
    let description = changes.description.as_deref().map(str::trim);
    if description.is_some_and(str::is_empty) {
        return Err(DbError::InvalidInput("description must not be empty".to_string()));
    }
    if changes.price.is_some_and(|p| p <= Decimal::ZERO) {
        return Err(DbError::InvalidInput("price must be positive".to_string()));
    }

    let image = |slot: usize| {
        let change = changes.images[slot].as_ref();
        (change.is_some(), change.and_then(|v| v.as_deref()))
    };
    let (img1_supplied, img1) = image(0);
    let (img2_supplied, img2) = image(1);
    let (img3_supplied, img3) = image(2);
    let (img4_supplied, img4) = image(3);
    let (img5_supplied, img5) = image(4);

    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "WITH p AS ( \
             UPDATE products \
             SET description          = COALESCE($2, description), \
                 detailed_description = CASE WHEN $3::BOOL THEN $4 ELSE detailed_description END, \
                 price                = COALESCE($5, price), \
                 category_id          = CASE WHEN $6::BOOL THEN $7 ELSE category_id END, \
                 brand_id             = CASE WHEN $8::BOOL THEN $9 ELSE brand_id END, \
                 featured             = COALESCE($10, featured), \
                 applies_all_plans    = COALESCE($11, applies_all_plans), \
                 image_url_1          = CASE WHEN $12::BOOL THEN $13 ELSE image_url_1 END, \
                 image_url_2          = CASE WHEN $14::BOOL THEN $15 ELSE image_url_2 END, \
                 image_url_3          = CASE WHEN $16::BOOL THEN $17 ELSE image_url_3 END, \
                 image_url_4          = CASE WHEN $18::BOOL THEN $19 ELSE image_url_4 END, \
                 image_url_5          = CASE WHEN $20::BOOL THEN $21 ELSE image_url_5 END, \
                 updated_at           = NOW() \
             WHERE id = $1 AND deleted_at IS NULL \
             RETURNING * \
         ) \
         SELECT {PRODUCT_COLUMNS} FROM p {PRODUCT_JOINS}"
    ))
    .bind(id)
    .bind(description)
    .bind(changes.detailed_description.is_some())
    .bind(changes.detailed_description.clone().flatten())
    .bind(changes.price)
    .bind(changes.category_id.is_some())
    .bind(changes.category_id.flatten())
    .bind(changes.brand_id.is_some())
    .bind(changes.brand_id.flatten())
    .bind(changes.featured)
    .bind(changes.applies_all_plans)
    .bind(img1_supplied)
    .bind(img1)
    .bind(img2_supplied)
    .bind(img2)
    .bind(img3_supplied)
    .bind(img3)
    .bind(img4_supplied)
    .bind(img4)
    .bind(img5_supplied)
    .bind(img5)
    .fetch_optional(pool)
    .await?;
    Ok(row)
}

/// Soft-deletes a product by setting `deleted_at = NOW()`.
///
/// Returns `false` when no live product has `id`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn soft_delete_product(pool: &PgPool, id: i64) -> Result<bool, DbError> {
    let result = sqlx::query(
        "UPDATE products \
         SET deleted_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------------
// Import gateway
// ---------------------------------------------------------------------------

/// [`CatalogWriter`] backed by the Postgres pool.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CatalogWriter for PgCatalog {
    async fn update_product(
        &self,
        id: i64,
        changes: &ProductChanges,
    ) -> Result<Option<Product>, GatewayError> {
        update_product(&self.pool, id, changes)
            .await
            .map(|row| row.map(Product::from))
            .map_err(|e| GatewayError::new(format!("update product {id}"), e))
    }

    async fn create_product(&self, product: &NewProduct) -> Result<Product, GatewayError> {
        create_product(&self.pool, product)
            .await
            .map(Product::from)
            .map_err(|e| GatewayError::new(format!("create product '{}'", product.description), e))
    }
}
