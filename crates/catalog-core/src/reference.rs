//! Category and brand reference data, seeded from `config/catalog.yaml`.
//!
//! Full product imports reference categories and brands by numeric id
//! (`fk_id_categoria`, `fk_id_marca`), so ids are fixed in the file rather
//! than assigned by the database.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceEntry {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReferenceData {
    #[serde(default)]
    pub categories: Vec<ReferenceEntry>,
    #[serde(default)]
    pub brands: Vec<ReferenceEntry>,
}

/// Load and validate reference data from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_reference_data(path: &Path) -> Result<ReferenceData, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReferenceFileIo {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_reference_data(&content)
}

/// Parse and validate reference data from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text does not parse or fails validation.
pub fn parse_reference_data(content: &str) -> Result<ReferenceData, ConfigError> {
    let data: ReferenceData = serde_yaml::from_str(content)?;
    validate_entries("category", &data.categories)?;
    validate_entries("brand", &data.brands)?;
    Ok(data)
}

fn validate_entries(kind: &str, entries: &[ReferenceEntry]) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();
    let mut seen_names = HashSet::new();

    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "{kind} {} has an empty name",
                entry.id
            )));
        }
        if entry.id <= 0 {
            return Err(ConfigError::Validation(format!(
                "{kind} '{}' has invalid id {}; ids must be positive",
                entry.name, entry.id
            )));
        }
        if !seen_ids.insert(entry.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate {kind} id: {}",
                entry.id
            )));
        }
        if !seen_names.insert(entry.name.trim().to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {kind} name: '{}'",
                entry.name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "reference_test.rs"]
mod tests;
