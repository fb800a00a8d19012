use crate::app_config::{AppConfig, Environment, ImportSettings, StorageSettings};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var).map_err(|_| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let database_url = require("DATABASE_URL")?;
    let env = parse_environment(&or_default("CATALOG_ENV", "development"))?;

    let bind_addr = parse_addr("CATALOG_BIND_ADDR", "0.0.0.0:3000")?;
    let log_level = or_default("CATALOG_LOG_LEVEL", "info");
    let reference_data_path = PathBuf::from(or_default(
        "CATALOG_REFERENCE_DATA_PATH",
        "./config/catalog.yaml",
    ));

    let db_max_connections = parse_u32("CATALOG_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CATALOG_DB_MIN_CONNECTIONS", "1")?;
    if db_min_connections > db_max_connections {
        return Err(invalid(
            "CATALOG_DB_MIN_CONNECTIONS",
            format!("{db_min_connections} exceeds CATALOG_DB_MAX_CONNECTIONS ({db_max_connections})"),
        ));
    }
    let db_acquire_timeout_secs = parse_u64("CATALOG_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let storage = StorageSettings {
        base_url: lookup("CATALOG_STORAGE_URL")
            .ok()
            .filter(|url| !url.trim().is_empty()),
        bucket: or_default("CATALOG_STORAGE_BUCKET", "product-images"),
        api_key: lookup("CATALOG_STORAGE_API_KEY").ok(),
        timeout_secs: parse_u64("CATALOG_STORAGE_TIMEOUT_SECS", "30")?,
    };

    let batch_size = parse_usize("CATALOG_IMPORT_BATCH_SIZE", "10")?;
    if batch_size == 0 {
        return Err(invalid(
            "CATALOG_IMPORT_BATCH_SIZE",
            "batch size must be at least 1".to_string(),
        ));
    }
    let import = ImportSettings {
        batch_size,
        batch_delay_ms: parse_u64("CATALOG_IMPORT_BATCH_DELAY_MS", "100")?,
        detail_head: parse_usize("CATALOG_IMPORT_DETAIL_HEAD", "20")?,
        detail_tail: parse_usize("CATALOG_IMPORT_DETAIL_TAIL", "20")?,
    };

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        reference_data_path,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        storage,
        import,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CATALOG_ENV".to_string(),
            reason: format!("expected development, test, or production; got '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
