use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, FacilityRecord};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub amenities: Vec<FacilityRecord>,
}

/// Load and validate a facility catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_catalog(&content)
}

/// Parse and validate catalog YAML that is already in memory.
///
/// # Errors
///
/// Returns `ConfigError` if the content does not parse or fails validation.
pub fn parse_catalog(content: &str) -> Result<CatalogFile, ConfigError> {
    let catalog: CatalogFile = serde_yaml::from_str(content)?;
    validate_catalog(&catalog)?;
    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for facility in &catalog.amenities {
        if facility.id.trim().is_empty() {
            return Err(ConfigError::CatalogValidation(format!(
                "facility \"{}\" has an empty id",
                facility.name
            )));
        }

        if facility.name.trim().is_empty() {
            return Err(ConfigError::CatalogValidation(format!(
                "facility {} has an empty name",
                facility.id
            )));
        }

        if !seen_ids.insert(facility.id.as_str()) {
            return Err(ConfigError::CatalogValidation(format!(
                "duplicate facility id: {}",
                facility.id
            )));
        }

        facility.location.validate().map_err(|e| {
            ConfigError::CatalogValidation(format!("facility {}: {e}", facility.id))
        })?;
    }

    Ok(())
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
