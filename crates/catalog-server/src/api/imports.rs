//! Batch import handlers.
//!
//! - `POST /api/v1/imports/{kind}?file_name=..&dry_run=..`  raw spreadsheet body
//! - `POST /api/v1/imports/image-files?dry_run=..`          multipart image files
//! - `GET  /api/v1/imports/price-template`                  xlsx download

use axum::{
    body::Bytes,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::IntoResponse,
    Extension, Json,
};
use catalog_import::{
    CatalogSnapshot, ImportError, ImportReport, Importer, PipelineKind, Progress, UploadedFile,
};
use serde::Deserialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, ApiResponse, AppState, ResponseMeta};

const XLSX_CONTENT_TYPE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Deserialize)]
pub(super) struct ImportQuery {
    pub file_name: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
}

async fn load_snapshot(state: &AppState, req_id: &str) -> Result<CatalogSnapshot, ApiError> {
    let pool = &state.pool;
    let map = |e: catalog_db::DbError| map_db_error(req_id.to_owned(), &e);

    let products = catalog_db::load_snapshot(pool).await.map_err(map)?;
    let category_ids = catalog_db::list_category_ids(pool).await.map_err(map)?;
    let brand_ids = catalog_db::list_brand_ids(pool).await.map_err(map)?;
    Ok(CatalogSnapshot::new(products, category_ids, brand_ids))
}

fn map_import_error(req_id: &str, e: &ImportError) -> ApiError {
    tracing::warn!(error = %e, "import rejected before any row was applied");
    ApiError::new(req_id, "validation_error", e.to_string())
}

fn log_progress(progress: Progress) {
    tracing::debug!(
        processed = progress.processed,
        total = progress.total,
        percent = progress.percent(),
        "import progress"
    );
}

/// POST /api/v1/imports/{kind}: import a CSV or XLSX sent as the raw body.
pub(super) async fn import_sheet(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(kind): Path<String>,
    Query(query): Query<ImportQuery>,
    body: Bytes,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let rid = &req_id.0;
    let kind: PipelineKind = kind
        .parse()
        .map_err(|message: String| ApiError::new(rid, "bad_request", message))?;
    if kind.takes_files() {
        return Err(ApiError::new(
            rid,
            "bad_request",
            "image-files imports take multipart uploads at /api/v1/imports/image-files",
        ));
    }
    let file_name = query
        .file_name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| {
            ApiError::new(
                rid,
                "validation_error",
                "file_name query parameter is required (e.g. precios.xlsx)",
            )
        })?;

    let snapshot = load_snapshot(&state, rid).await?;
    let writer = catalog_db::PgCatalog::new(state.pool.clone());
    let report = Importer::new(&snapshot, state.import)
        .dry_run(query.dry_run)
        .run_sheet(kind, &file_name, body.to_vec(), &writer, log_progress)
        .await
        .map_err(|e| map_import_error(rid, &e))?;

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/imports/image-files: upload `CODE_N.ext` files as multipart parts.
///
/// Storage is only required when `dry_run` is off.
pub(super) async fn import_image_files(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<ImportQuery>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<ImportReport>>, ApiError> {
    let rid = &req_id.0;
    let storage = state.storage.clone();
    if storage.is_none() && !query.dry_run {
        return Err(ApiError::new(
            rid,
            "unavailable",
            "image storage is not configured",
        ));
    }

    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::new(rid, "bad_request", e.body_text()))?
    {
        let Some(name) = field.file_name().map(str::to_owned) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::new(rid, "bad_request", e.body_text()))?;
        files.push(UploadedFile {
            name,
            bytes: bytes.to_vec(),
        });
    }
    if files.is_empty() {
        return Err(ApiError::new(
            rid,
            "validation_error",
            "no files in upload",
        ));
    }

    let snapshot = load_snapshot(&state, rid).await?;
    let importer = Importer::new(&snapshot, state.import);
    let report = match storage {
        Some(storage) if !query.dry_run => {
            let writer = catalog_db::PgCatalog::new(state.pool.clone());
            importer
                .run_files(files, &writer, storage.as_ref(), log_progress)
                .await
        }
        _ => importer.preview_files(files, log_progress).await,
    };

    Ok(Json(ApiResponse {
        data: report,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/imports/price-template: xlsx seeded with sample products.
pub(super) async fn price_template(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<impl IntoResponse, ApiError> {
    let rid = &req_id.0;
    let products = catalog_db::load_snapshot(&state.pool)
        .await
        .map_err(|e| map_db_error(rid.clone(), &e))?;
    let bytes = catalog_import::price_template(&products).map_err(|e| {
        tracing::error!(error = %e, "failed to build price template");
        ApiError::new(rid, "internal_error", "failed to build price template")
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, XLSX_CONTENT_TYPE),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"plantilla_precios.xlsx\"",
            ),
        ],
        bytes,
    ))
}
