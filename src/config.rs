use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, WipeError};
use crate::method::WipeMethod;
use crate::overwrite::DEFAULT_CHUNK_SIZE;

/// Settings for one wipe run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WipeConfig {
    #[serde(default = "default_method")]
    pub method: WipeMethod,

    /// Read back every fixed-byte pass.
    #[serde(default = "default_true")]
    pub verify: bool,

    #[serde(default = "default_true")]
    pub rename_before_delete: bool,

    #[serde(default = "default_rename_count")]
    pub rename_count: u32,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Descend into subdirectories of directory targets.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Reset access/modification times to the epoch before unlink. Off unless asked for.
    #[serde(default)]
    pub scrub_timestamps: bool,
}

impl Default for WipeConfig {
    fn default() -> Self {
        Self {
            method: default_method(),
            verify: true,
            rename_before_delete: true,
            rename_count: default_rename_count(),
            chunk_size: default_chunk_size(),
            recursive: true,
            scrub_timestamps: false,
        }
    }
}

fn default_method() -> WipeMethod {
    WipeMethod::Dod3
}

fn default_true() -> bool {
    true
}

fn default_rename_count() -> u32 {
    2
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl WipeConfig {
    pub fn with_method(method: WipeMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    /// Renames to perform per file, zero when rename-before-delete is off.
    pub fn effective_renames(&self) -> u32 {
        if self.rename_before_delete {
            self.rename_count
        } else {
            0
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(WipeError::InvalidConfig(
                "chunk_size must be a positive number of bytes".into(),
            ));
        }
        Ok(())
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => Self::config_path().filter(|p| p.exists()),
        };

        let config = match path {
            Some(p) => {
                let content = std::fs::read_to_string(&p)?;
                toml::from_str(&content)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "bylickilabs", "data_shredder")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = WipeConfig::default();
        assert_eq!(config.method, WipeMethod::Dod3);
        assert_eq!(config.chunk_size, 8 * 1024 * 1024);
        assert_eq!(config.rename_count, 2);
        assert!(config.verify);
        assert!(!config.scrub_timestamps);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: WipeConfig = toml::from_str(
            r#"
            method = "GUTMANN"
            rename_before_delete = false
            "#,
        )
        .unwrap();
        assert_eq!(config.method, WipeMethod::Gutmann);
        assert_eq!(config.effective_renames(), 0);
        assert_eq!(config.chunk_size, DEFAULT_CHUNK_SIZE);
        assert!(!config.scrub_timestamps);
    }

    #[test]
    fn test_scrub_timestamps_opt_in() {
        let config: WipeConfig = toml::from_str("scrub_timestamps = true").unwrap();
        assert!(config.scrub_timestamps);
        assert!(config.verify);
    }

    #[test]
    fn test_unknown_method_in_toml() {
        assert!(toml::from_str::<WipeConfig>("method = \"ROT13\"").is_err());
    }

    #[test]
    fn test_zero_chunk_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "chunk_size = 0\n").unwrap();

        let err = WipeConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, WipeError::InvalidConfig(_)));
    }

    #[test]
    fn test_config_serialization() {
        let config = WipeConfig::with_method(WipeMethod::Nist1);
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: WipeConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }
}
