pub mod app_config;
pub mod config;
pub mod gateway;
pub mod products;
pub mod reference;

pub use app_config::{AppConfig, Environment, ImportSettings, StorageSettings};
pub use config::{load_app_config, load_app_config_from_env};
pub use gateway::{CatalogWriter, GatewayError, ImageUploader};
pub use products::{NewProduct, Product, ProductChanges, IMAGE_SLOTS};
pub use reference::{load_reference_data, parse_reference_data, ReferenceData, ReferenceEntry};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read reference data file {path}: {source}")]
    ReferenceFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse reference data file: {0}")]
    ReferenceFileParse(#[from] serde_yaml::Error),

    #[error("reference data validation failed: {0}")]
    Validation(String),
}
