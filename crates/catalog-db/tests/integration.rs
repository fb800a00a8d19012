//! Offline tests for catalog-db pool configuration and row mapping.
//! These tests do not require a live database connection.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use catalog_core::{AppConfig, Environment, ImportSettings, Product, StorageSettings};
use catalog_db::{PoolConfig, ProductRow};
use chrono::Utc;
use rust_decimal::Decimal;

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let app_config = AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 3000),
        log_level: "info".to_string(),
        reference_data_path: PathBuf::from("./config/catalog.yaml"),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        storage: StorageSettings {
            base_url: None,
            bucket: "product-images".to_string(),
            api_key: None,
            timeout_secs: 30,
        },
        import: ImportSettings::default(),
    };

    let pool_config = PoolConfig::from_app_config(&app_config);
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

#[test]
fn product_row_maps_image_columns_to_slots_in_order() {
    let row = ProductRow {
        id: 7,
        description: "Widget A".to_string(),
        detailed_description: None,
        price: Decimal::new(1500, 0),
        category_id: Some(1),
        category_name: Some("Herramientas".to_string()),
        brand_id: None,
        brand_name: None,
        featured: true,
        applies_all_plans: false,
        image_url_1: Some("https://cdn.example.com/1.jpg".to_string()),
        image_url_2: None,
        image_url_3: Some("https://cdn.example.com/3.jpg".to_string()),
        image_url_4: None,
        image_url_5: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };

    let product = Product::from(row);
    assert_eq!(product.image(1), Some("https://cdn.example.com/1.jpg"));
    assert_eq!(product.image(2), None);
    assert_eq!(product.image(3), Some("https://cdn.example.com/3.jpg"));
    assert_eq!(product.category_name.as_deref(), Some("Herramientas"));
    assert!(product.featured);
}
