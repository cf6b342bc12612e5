use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

/// Legal display values per categorical field, as shipped to the browser
/// client in `options.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OptionsCatalog {
    #[serde(flatten)]
    fields: HashMap<String, Vec<String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read options catalog {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse options catalog {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
}

impl OptionsCatalog {
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let display = path.display().to_string();
        let bytes = fs::read(path).map_err(|source| CatalogError::Read {
            path: display.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| CatalogError::Parse {
            path: display,
            source,
        })
    }

    pub fn values(&self, field: &str) -> Option<&[String]> {
        self.fields.get(field).map(Vec::as_slice)
    }

    /// Fields missing from the catalog accept any value.
    pub fn allows(&self, field: &str, value: &str) -> bool {
        self.values(field)
            .map_or(true, |values| values.iter().any(|v| v == value))
    }
}
