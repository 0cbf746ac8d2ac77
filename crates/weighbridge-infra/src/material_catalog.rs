//! Material catalog loader from TOML
//!
//! ```toml
//! [[materials]]
//! id = "mixed"
//! name = "Mixed Waste"
//! price_per_kg = 0.15
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use weighbridge_domain::model::{Material, MaterialCatalog};
use weighbridge_types::{ConfigError, Error, Result};

/// Container for parsing materials.toml
#[derive(Debug, Deserialize)]
struct MaterialCatalogFile {
    materials: Vec<Material>,
}

pub struct MaterialCatalogLoader;

impl MaterialCatalogLoader {
    /// Load a catalog from a TOML file
    pub fn load_from_file(path: &Path) -> Result<MaterialCatalog> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(ConfigError::ParseError(format!(
                "Failed to read material catalog {}: {}",
                path.display(),
                e
            )))
        })?;

        Self::load_from_str(&content)
    }

    /// Load a catalog from a TOML string
    pub fn load_from_str(toml_content: &str) -> Result<MaterialCatalog> {
        let file: MaterialCatalogFile = toml::from_str(toml_content).map_err(|e| {
            Error::Config(ConfigError::ParseError(format!(
                "Failed to parse material catalog TOML: {}",
                e
            )))
        })?;

        MaterialCatalog::new(file.materials)
    }

    /// Catalog from `path` if given, the built-in price list otherwise
    pub fn load_or_builtin(path: Option<&Path>) -> Result<MaterialCatalog> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => Ok(MaterialCatalog::builtin()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"
[[materials]]
id = "asphalt"
name = "Asphalt Rubble"
price_per_kg = 0.04

[[materials]]
id = "copper"
name = "Copper Scrap"
price_per_kg = -1.10
"#;

    #[test]
    fn test_load_from_str() {
        let catalog = MaterialCatalogLoader::load_from_str(CATALOG).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.first().id, "asphalt");
        assert!(catalog.get("copper").unwrap().is_payout());
    }

    #[test]
    fn test_invalid_toml() {
        let result = MaterialCatalogLoader::load_from_str("materials = 3");
        assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let toml = r#"
[[materials]]
id = "wood"
name = "Clean Wood"
price_per_kg = 0.08

[[materials]]
id = "wood"
name = "Painted Wood"
price_per_kg = 0.12
"#;
        assert!(matches!(
            MaterialCatalogLoader::load_from_str(toml),
            Err(Error::Catalog(_))
        ));
    }

    #[test]
    fn test_load_from_file_and_builtin_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("materials.toml");
        std::fs::write(&path, CATALOG).unwrap();

        let catalog = MaterialCatalogLoader::load_or_builtin(Some(&path)).unwrap();
        assert!(catalog.get("asphalt").is_some());

        let builtin = MaterialCatalogLoader::load_or_builtin(None).unwrap();
        assert!(builtin.get("mixed").is_some());

        let missing = MaterialCatalogLoader::load_from_file(&dir.path().join("nope.toml"));
        assert!(missing.is_err());
    }
}
