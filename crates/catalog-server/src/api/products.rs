//! Product CRUD handlers.
//!
//! - `GET    /api/v1/products`       list, optional `search` and `limit`
//! - `POST   /api/v1/products`       create
//! - `GET    /api/v1/products/{id}`  fetch one
//! - `PATCH  /api/v1/products/{id}`  sparse update
//! - `DELETE /api/v1/products/{id}`  soft delete

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use catalog_core::{NewProduct, ProductChanges, IMAGE_SLOTS};
use catalog_db::ProductRow;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::middleware::RequestId;

use super::{map_db_error, normalize_limit, ApiError, ApiResponse, AppState, ResponseMeta};

const MAX_DESCRIPTION_CHARS: usize = 500;

// ---------------------------------------------------------------------------
// Request / response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub(super) struct ProductItem {
    id: i64,
    description: String,
    detailed_description: Option<String>,
    price: Decimal,
    category_id: Option<i64>,
    category_name: Option<String>,
    brand_id: Option<i64>,
    brand_name: Option<String>,
    featured: bool,
    applies_all_plans: bool,
    image_urls: [Option<String>; IMAGE_SLOTS],
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for ProductItem {
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
            image_urls: [
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

#[derive(Debug, Deserialize)]
pub(super) struct ProductQuery {
    pub search: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateProductRequest {
    pub description: String,
    pub detailed_description: Option<String>,
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub brand_id: Option<i64>,
    #[serde(default)]
    pub featured: bool,
    #[serde(default)]
    pub applies_all_plans: bool,
    #[serde(default)]
    pub image_urls: Vec<Option<String>>,
}

// Option<Option<T>>: outer None = "not in request" (keep current),
// Some(None) = "explicitly cleared", Some(Some(v)) = "set to value".
#[allow(clippy::option_option)]
#[derive(Debug, Default, Deserialize)]
pub(super) struct UpdateProductRequest {
    pub description: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub detailed_description: Option<Option<String>>,
    pub price: Option<Decimal>,
    #[serde(default, deserialize_with = "present")]
    pub category_id: Option<Option<i64>>,
    #[serde(default, deserialize_with = "present")]
    pub brand_id: Option<Option<i64>>,
    pub featured: Option<bool>,
    pub applies_all_plans: Option<bool>,
    #[serde(default, deserialize_with = "present")]
    pub image_url_1: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image_url_2: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image_url_3: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image_url_4: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image_url_5: Option<Option<String>>,
}

/// Keeps an explicit JSON `null` as `Some(None)`; a missing field falls
/// back to `#[serde(default)]`.
#[allow(clippy::option_option)]
fn present<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

fn validate_description(req_id: &str, value: &str) -> Result<String, ApiError> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed.chars().count() > MAX_DESCRIPTION_CHARS {
        return Err(ApiError::new(
            req_id,
            "validation_error",
            format!("description must be 1-{MAX_DESCRIPTION_CHARS} characters"),
        ));
    }
    Ok(trimmed.to_owned())
}

fn validate_price(req_id: &str, value: Decimal) -> Result<(), ApiError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ApiError::new(
            req_id,
            "validation_error",
            format!("price must be positive, got {value}"),
        ))
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn map_write_error(req_id: &str, e: &catalog_db::DbError) -> ApiError {
    if let catalog_db::DbError::Sqlx(sqlx::Error::Database(db_err)) = e {
        if db_err.code().as_deref() == Some("23503") {
            return ApiError::new(
                req_id,
                "validation_error",
                "category_id or brand_id does not exist",
            );
        }
    }
    map_db_error(req_id.to_owned(), e)
}

impl UpdateProductRequest {
    fn into_changes(self, req_id: &str) -> Result<ProductChanges, ApiError> {
        let description = self
            .description
            .as_deref()
            .map(|d| validate_description(req_id, d))
            .transpose()?;
        if let Some(price) = self.price {
            validate_price(req_id, price)?;
        }

        let images = [
            self.image_url_1,
            self.image_url_2,
            self.image_url_3,
            self.image_url_4,
            self.image_url_5,
        ]
        .map(|slot| slot.map(blank_to_none));

        Ok(ProductChanges {
            description,
            detailed_description: self.detailed_description.map(blank_to_none),
            price: self.price,
            category_id: self.category_id,
            brand_id: self.brand_id,
            featured: self.featured,
            applies_all_plans: self.applies_all_plans,
            images,
        })
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

pub(super) async fn list_products(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ProductQuery>,
) -> Result<Json<ApiResponse<Vec<ProductItem>>>, ApiError> {
    let rows = catalog_db::list_products(
        &state.pool,
        query.search.as_deref(),
        normalize_limit(query.limit),
    )
    .await
    .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse {
        data: rows.into_iter().map(ProductItem::from).collect(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn get_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let row = catalog_db::get_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(&req_id.0, "not_found", format!("product {id} not found")))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/products: create a product.
pub(super) async fn create_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProductItem>>), ApiError> {
    let rid = &req_id.0;

    let description = validate_description(rid, &body.description)?;
    validate_price(rid, body.price)?;
    if body.image_urls.len() > IMAGE_SLOTS {
        return Err(ApiError::new(
            rid,
            "validation_error",
            format!("at most {IMAGE_SLOTS} image_urls are allowed"),
        ));
    }

    let mut images: [Option<String>; IMAGE_SLOTS] = Default::default();
    for (slot, url) in images.iter_mut().zip(body.image_urls) {
        *slot = blank_to_none(url);
    }

    let product = NewProduct {
        description,
        detailed_description: blank_to_none(body.detailed_description),
        price: body.price,
        category_id: body.category_id,
        brand_id: body.brand_id,
        featured: body.featured,
        applies_all_plans: body.applies_all_plans,
        images,
    };

    let row = catalog_db::create_product(&state.pool, &product)
        .await
        .map_err(|e| map_write_error(rid, &e))?;
    tracing::info!(product_id = row.id, "product created");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: row.into(),
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/products/{id}: sparse update.
pub(super) async fn update_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<ApiResponse<ProductItem>>, ApiError> {
    let rid = &req_id.0;
    let changes = body.into_changes(rid)?;
    if changes.is_empty() {
        return Err(ApiError::new(rid, "validation_error", "no fields to update"));
    }

    let row = catalog_db::update_product(&state.pool, id, &changes)
        .await
        .map_err(|e| map_write_error(rid, &e))?
        .ok_or_else(|| ApiError::new(rid, "not_found", format!("product {id} not found")))?;

    Ok(Json(ApiResponse {
        data: row.into(),
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/products/{id}: soft delete.
pub(super) async fn delete_product(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<serde_json::Value>>, ApiError> {
    let rid = &req_id.0;
    let deleted = catalog_db::soft_delete_product(&state.pool, id)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    if !deleted {
        return Err(ApiError::new(rid, "not_found", format!("product {id} not found")));
    }
    tracing::info!(product_id = id, "product deleted");

    Ok(Json(ApiResponse {
        data: serde_json::json!({ "deleted": true }),
        meta: ResponseMeta::new(req_id.0),
    }))
}
