//! Engine configuration.
//!
//! ```toml
//! max_page_size = 50
//! naming_convention = "snake_case"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::naming::NamingConvention;

const CONFIG_RECORD: &str = "engine configuration";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Largest page size a request may ask for.
    pub max_page_size: u32,
    /// How generated field ids are spelled.
    pub naming_convention: NamingConvention,
}

impl EngineConfig {
    pub const DEFAULT_MAX_PAGE_SIZE: u32 = 100;

    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses, and validates a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| SearchError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        EngineConfig::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_page_size < 1 {
            return Err(SearchError::configuration(
                CONFIG_RECORD,
                "max_page_size must be at least 1",
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_page_size: EngineConfig::DEFAULT_MAX_PAGE_SIZE,
            naming_convention: NamingConvention::Identity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.max_page_size, 100);
    }

    #[test]
    fn parses_overrides() {
        let config = EngineConfig::from_toml_str(
            "max_page_size = 25\nnaming_convention = \"dot_case\"\n",
        )
        .unwrap();
        assert_eq!(config.max_page_size, 25);
        assert_eq!(config.naming_convention, NamingConvention::DotCase);
    }

    #[test]
    fn rejects_zero_page_size() {
        let err = EngineConfig::from_toml_str("max_page_size = 0").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("max_page_size must be at least 1"));
    }

    #[test]
    fn rejects_unknown_keys_and_bad_values() {
        let err = EngineConfig::from_toml_str("page_limit = 5").unwrap_err();
        assert!(matches!(err, SearchError::ConfigParse(_)));
        let err = EngineConfig::from_toml_str("naming_convention = \"kebab\"").unwrap_err();
        assert!(matches!(err, SearchError::ConfigParse(_)));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/searchkit.toml")).unwrap_err();
        assert!(matches!(err, SearchError::ConfigRead { .. }));
        assert!(err.is_configuration());
    }
}
