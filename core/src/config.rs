//! Loading and saving [`PlaceholderConfig`] files

use std::fs;
use std::path::{Path, PathBuf};

use placard_types::PlaceholderConfig;

use crate::error::ConfigError;

/// Default location: `<config_dir>/placard/placeholders.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("placard").join("placeholders.toml"))
}

/// Load a single config file
pub fn load_config(path: &Path) -> Result<PlaceholderConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    toml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load `path` if it exists, otherwise fall back to defaults.
pub fn load_or_default(path: &Path) -> Result<PlaceholderConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = ?path, "No placeholder config, using defaults");
        return Ok(PlaceholderConfig::default());
    }
    load_config(path)
}

/// Save a config file, creating parent directories as needed
pub fn save_config(path: &Path, config: &PlaceholderConfig) -> Result<(), ConfigError> {
    let contents = toml::to_string_pretty(config).map_err(|e| ConfigError::Serialize {
        path: path.to_path_buf(),
        source: e,
    })?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::write(path, contents).map_err(|e| ConfigError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use placard_types::{BooleanFormat, DurationStyle};

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("placard-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_save_then_load() {
        let dir = scratch_dir("save");
        let path = dir.join("nested").join("placeholders.toml");
        let config = PlaceholderConfig {
            boolean: BooleanFormat::new("true", "false"),
            duration: DurationStyle::Long,
        };

        save_config(&path, &config).unwrap();
        assert_eq!(load_config(&path).unwrap(), config);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let path = scratch_dir("missing").join("nope.toml");
        assert!(matches!(load_config(&path), Err(ConfigError::Io { .. })));
        assert_eq!(load_or_default(&path).unwrap(), PlaceholderConfig::default());
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let dir = scratch_dir("bad");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("placeholders.toml");
        fs::write(&path, "duration = \"sometimes\"\n").unwrap();

        assert!(matches!(load_config(&path), Err(ConfigError::Parse { .. })));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_default_path_shape() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("placard/placeholders.toml"));
        }
    }
}
