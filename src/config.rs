// src/config.rs

//! Configuration loading utilities.
//!
//! This module provides convenience functions for loading the configuration
//! file and the fallback region table.

use std::fs;
use std::path::Path;

use crate::error::{AppError, Result};
use crate::models::{Config, FallbackRegions, RegionMapping};

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if loading fails.
pub fn load_config(path: &Path) -> Config {
    Config::load_or_default(path).with_env_overrides()
}

/// Load the fallback region table named by the config, or the bundled one.
pub fn load_fallback_regions(config: &Config) -> Result<FallbackRegions> {
    match &config.regions.fallback_file {
        Some(path) => {
            let content = fs::read_to_string(path).map_err(|e| {
                AppError::config(format!("Cannot read fallback regions {path}: {e}"))
            })?;
            FallbackRegions::parse(&content)
        }
        None => FallbackRegions::bundled(),
    }
}

/// Load and validate both config and fallback region table.
pub fn load_all(config_path: &Path) -> Result<(Config, RegionMapping)> {
    with_fallback_regions(load_config(config_path))
}

/// Validate an already loaded config and pair it with its fallback region
/// table.
pub fn with_fallback_regions(config: Config) -> Result<(Config, RegionMapping)> {
    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;

    let fallback = load_fallback_regions(&config)?;
    log::info!(
        "Fallback region table version {} ({} regions)",
        fallback.version,
        fallback.regions.len()
    );

    Ok((config, fallback.into_mapping()))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn bundled_table_used_by_default() {
        let table = load_fallback_regions(&Config::default()).unwrap();
        assert_eq!(table.regions.len(), 13);
    }

    #[test]
    fn fallback_file_overrides_bundled_table() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "version = \"test\"\n\n[[region]]\nid = \"1\"\ncities = [\"KOTA A\", \"KOTA B\"]"
        )
        .unwrap();

        let mut config = Config::default();
        config.regions.fallback_file = Some(file.path().to_string_lossy().into_owned());

        let mapping = load_fallback_regions(&config).unwrap().into_mapping();
        assert_eq!(mapping.len(), 1);
        assert_eq!(mapping.get("1"), Some("KOTA A, KOTA B"));
    }

    #[test]
    fn unreadable_fallback_file_is_an_error() {
        let mut config = Config::default();
        config.regions.fallback_file = Some("/nonexistent/regions.toml".to_string());
        assert!(matches!(
            load_fallback_regions(&config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn invalid_loaded_config_is_rejected() {
        let mut config = Config::default();
        config.upstream.page_delay_ms = 0;
        assert!(matches!(
            with_fallback_regions(config),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn load_all_with_missing_file_uses_defaults() {
        let (config, regions) = load_all(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.upstream.page_size, 100);
        assert_eq!(regions.len(), 13);
    }
}
