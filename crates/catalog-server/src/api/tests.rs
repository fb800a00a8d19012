use std::sync::Arc;

use super::*;
use axum::body::{to_bytes, Body};
use axum::http::Request;
use catalog_core::parse_reference_data;
use tower::ServiceExt;

fn test_settings() -> ImportSettings {
    ImportSettings {
        batch_delay_ms: 0,
        ..ImportSettings::default()
    }
}

fn app(pool: sqlx::PgPool) -> Router {
    build_app(AppState {
        pool,
        storage: None,
        import: test_settings(),
    })
}

async fn seed_reference(pool: &sqlx::PgPool) {
    let data = parse_reference_data(
        "
categories:
  - id: 1
    name: Herramientas
brands:
  - id: 10
    name: Acme
",
    )
    .expect("reference data");
    catalog_db::seed_reference_data(pool, &data)
        .await
        .expect("seed reference data");
}

async fn insert_product(pool: &sqlx::PgPool, description: &str, price: &str) -> i64 {
    sqlx::query_scalar(
        "INSERT INTO products (description, price, category_id, brand_id) \
         VALUES ($1, $2::NUMERIC, 1, 10) RETURNING id",
    )
    .bind(description)
    .bind(price)
    .fetch_one(pool)
    .await
    .expect("insert product")
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.oneshot(request).await.expect("response");
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .body(Body::empty())
        .expect("request")
}

// ---------------------------------------------------------------------------
// Unit tests (no DB)
// ---------------------------------------------------------------------------

#[test]
fn normalize_limit_applies_defaults_and_bounds() {
    assert_eq!(normalize_limit(None), 50);
    assert_eq!(normalize_limit(Some(0)), 1);
    assert_eq!(normalize_limit(Some(1_000)), 200);
    assert_eq!(normalize_limit(Some(25)), 25);
}

#[test]
fn api_error_codes_map_to_statuses() {
    let cases = [
        ("validation_error", StatusCode::BAD_REQUEST),
        ("bad_request", StatusCode::BAD_REQUEST),
        ("not_found", StatusCode::NOT_FOUND),
        ("unavailable", StatusCode::SERVICE_UNAVAILABLE),
        ("internal_error", StatusCode::INTERNAL_SERVER_ERROR),
    ];
    for (code, status) in cases {
        let response = ApiError::new("req-1", code, "x").into_response();
        assert_eq!(response.status(), status, "code {code}");
    }
}

#[test]
fn invalid_input_db_error_is_a_validation_error() {
    let err = map_db_error(
        "req-1".to_string(),
        &catalog_db::DbError::InvalidInput("price must be positive".to_string()),
    );
    assert_eq!(err.error.code, "validation_error");
    assert_eq!(err.error.message, "price must be positive");
}

// ---------------------------------------------------------------------------
// Health
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn health_reports_database_and_storage(pool: sqlx::PgPool) {
    let (status, json) = send(app(pool), get("/api/v1/health")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["status"], "ok");
    assert_eq!(json["data"]["storage"], "disabled");
    assert!(json["meta"]["request_id"].is_string());
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn product_crud_round_trip(pool: sqlx::PgPool) {
    seed_reference(&pool).await;

    let (status, created) = send(
        app(pool.clone()),
        json_request(
            "POST",
            "/api/v1/products",
            &serde_json::json!({
                "description": "  Taladro percutor  ",
                "price": "12500",
                "category_id": 1,
                "brand_id": 10,
                "image_urls": ["https://cdn.example.com/t1.jpg"]
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["data"]["description"], "Taladro percutor");
    assert_eq!(created["data"]["category_name"], "Herramientas");
    assert_eq!(created["data"]["image_urls"][0], "https://cdn.example.com/t1.jpg");
    let id = created["data"]["id"].as_i64().expect("id");

    let (status, patched) = send(
        app(pool.clone()),
        json_request(
            "PATCH",
            &format!("/api/v1/products/{id}"),
            &serde_json::json!({ "price": "13000", "brand_id": null }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["data"]["price"], "13000.00");
    assert!(patched["data"]["brand_id"].is_null());
    assert_eq!(patched["data"]["category_id"], 1);

    let (status, listed) = send(app(pool.clone()), get("/api/v1/products?search=taladro")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed["data"].as_array().map(Vec::len), Some(1));

    let delete = Request::builder()
        .method("DELETE")
        .uri(format!("/api/v1/products/{id}"))
        .body(Body::empty())
        .expect("request");
    let (status, _) = send(app(pool.clone()), delete).await;
    assert_eq!(status, StatusCode::OK);

    let (status, json) = send(app(pool), get(&format!("/api/v1/products/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "not_found");
}

#[sqlx::test(migrations = "../../migrations")]
async fn create_product_rejects_unknown_category(pool: sqlx::PgPool) {
    seed_reference(&pool).await;

    let (status, json) = send(
        app(pool),
        json_request(
            "POST",
            "/api/v1/products",
            &serde_json::json!({ "description": "Pala", "price": "900", "category_id": 99 }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn empty_patch_is_rejected(pool: sqlx::PgPool) {
    seed_reference(&pool).await;
    let id = insert_product(&pool, "Pala", "900").await;

    let (status, json) = send(
        app(pool),
        json_request("PATCH", &format!("/api/v1/products/{id}"), &serde_json::json!({})),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["message"], "no fields to update");
}

// ---------------------------------------------------------------------------
// Imports
// ---------------------------------------------------------------------------

fn csv_import(uri: &str, csv: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "text/csv")
        .body(Body::from(csv.to_owned()))
        .expect("request")
}

#[sqlx::test(migrations = "../../migrations")]
async fn price_import_updates_and_reports(pool: sqlx::PgPool) {
    seed_reference(&pool).await;
    let id = insert_product(&pool, "Martillo", "1450").await;

    let csv = "Descripción,Precio\nMartillo,1450\nInexistente,100\n";
    let (status, json) = send(
        app(pool.clone()),
        csv_import("/api/v1/imports/prices?file_name=precios.csv", csv),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["total_rows"], 2);
    assert_eq!(json["data"]["success"], 1);
    assert_eq!(json["data"]["errors"], 1);

    let price: rust_decimal::Decimal =
        sqlx::query_scalar("SELECT price FROM products WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .expect("price");
    assert_eq!(price, rust_decimal::Decimal::new(1500, 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn dry_run_import_writes_nothing(pool: sqlx::PgPool) {
    seed_reference(&pool).await;
    let id = insert_product(&pool, "Martillo", "1450").await;

    let csv = "Descripción,Precio\nMartillo,1450\n";
    let (status, json) = send(
        app(pool.clone()),
        csv_import("/api/v1/imports/prices?file_name=p.csv&dry_run=true", csv),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["data"]["dry_run"], true);
    let price: rust_decimal::Decimal =
        sqlx::query_scalar("SELECT price FROM products WHERE id = $1")
            .bind(id)
            .fetch_one(&pool)
            .await
            .expect("price");
    assert_eq!(price, rust_decimal::Decimal::new(1450, 0));
}

#[sqlx::test(migrations = "../../migrations")]
async fn import_rejects_schema_violations_before_touching_rows(pool: sqlx::PgPool) {
    let csv = "Descripción,Precio,Stock\nMartillo,1450,3\n";
    let (status, json) = send(
        app(pool),
        csv_import("/api/v1/imports/prices?file_name=p.csv", csv),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "validation_error");
}

#[sqlx::test(migrations = "../../migrations")]
async fn import_rejects_unknown_kind_and_missing_file_name(pool: sqlx::PgPool) {
    let (status, json) = send(
        app(pool.clone()),
        csv_import("/api/v1/imports/stock?file_name=a.csv", "a\n1\n"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "bad_request");

    let (status, _) = send(
        app(pool),
        csv_import("/api/v1/imports/prices", "Descripción,Precio\nA,1\n"),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn multipart_request(uri: &str, files: &[(&str, &[u8])]) -> Request<Body> {
    let boundary = "catalog-test-boundary";
    let mut body = Vec::new();
    for (name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"files\"; \
                 filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());

    Request::builder()
        .method("POST")
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

#[sqlx::test(migrations = "../../migrations")]
async fn image_files_import_requires_storage(pool: sqlx::PgPool) {
    let (status, json) = send(
        app(pool),
        multipart_request("/api/v1/imports/image-files", &[("ABC_1.jpg", b"x")]),
    )
    .await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["error"]["code"], "unavailable");
}

#[sqlx::test(migrations = "../../migrations")]
async fn image_files_dry_run_works_without_storage(pool: sqlx::PgPool) {
    seed_reference(&pool).await;
    let id = insert_product(&pool, "ABC", "900").await;

    let (status, json) = send(
        app(pool.clone()),
        multipart_request(
            "/api/v1/imports/image-files?dry_run=true",
            &[("ABC_1.jpg", b"x")],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["dry_run"], true);
    assert_eq!(json["data"]["success"], 1);
    assert_eq!(
        json["data"]["details"][0],
        format!("row 1: would upload products/ABC_1.jpg as image 1 of 'ABC' (id {id})")
    );

    let url: Option<String> = sqlx::query_scalar("SELECT image_url_1 FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .expect("image url");
    assert_eq!(url, None);
}

#[sqlx::test(migrations = "../../migrations")]
async fn image_files_import_uploads_and_links_slot(pool: sqlx::PgPool) {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    seed_reference(&pool).await;
    let id = insert_product(&pool, "ABC", "900").await;

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/storage/v1/object/product-images/products/ABC_2.png"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let storage = catalog_storage::StorageClient::with_base_url(
        &server.uri(),
        "product-images",
        Some("test-key"),
        30,
    )
    .expect("storage client");
    let app = build_app(AppState {
        pool: pool.clone(),
        storage: Some(Arc::new(storage)),
        import: test_settings(),
    });

    let (status, json) = send(
        app,
        multipart_request(
            "/api/v1/imports/image-files",
            &[("ABC_2.png", b"png"), ("ABC_6.png", b"png")],
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK, "{json}");
    assert_eq!(json["data"]["success"], 1);
    assert_eq!(json["data"]["errors"], 1);

    let url: Option<String> = sqlx::query_scalar("SELECT image_url_2 FROM products WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .expect("image url");
    assert_eq!(
        url,
        Some(format!(
            "{}/storage/v1/object/public/product-images/products/ABC_2.png",
            server.uri()
        ))
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn price_template_downloads_xlsx(pool: sqlx::PgPool) {
    seed_reference(&pool).await;
    insert_product(&pool, "Martillo", "1450").await;

    let response = app(pool)
        .oneshot(get("/api/v1/imports/price-template"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")
    );
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    assert!(body.starts_with(b"PK"));
}
