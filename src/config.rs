//! Configuration for the identity store and its backend.

use crate::error::ConfigError;
use crate::store::FileStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Label the client identity is stored under unless configured otherwise
pub const DEFAULT_LABEL: &str = "ListenerIdentityLabel";

/// Environment variable the CLI reads the file store passphrase from
pub const DEFAULT_PASSPHRASE_ENV: &str = "PAIRING_STORE_PASSPHRASE";

/// Config file name under the platform config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityConfig {
    /// Label of the credential slot
    #[serde(default = "default_label")]
    pub label: String,

    /// Backend holding the identity
    #[serde(default)]
    pub store: StoreConfig,
}

/// Which secure store backs the identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    File(FileStoreConfig),

    /// Nothing is persisted; useful to validate a bundle without touching disk.
    Memory,
}

/// Options for the directory backed store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStoreConfig {
    /// Store directory; `~` is expanded. Defaults to the platform data directory.
    #[serde(default)]
    pub directory: Option<String>,

    /// Name of the environment variable holding the store passphrase
    #[serde(default = "default_passphrase_env")]
    pub passphrase_env: String,
}

impl IdentityConfig {
    /// `<config dir>/pairing-identity/config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("pairing-identity").join(CONFIG_FILE_NAME))
    }

    /// Parse a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        if config.label.trim().is_empty() {
            return Err(ConfigError::Invalid("label must not be empty".to_string()));
        }
        Ok(config)
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            store: StoreConfig::default(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::File(FileStoreConfig::default())
    }
}

impl Default for FileStoreConfig {
    fn default() -> Self {
        Self {
            directory: None,
            passphrase_env: default_passphrase_env(),
        }
    }
}

impl FileStoreConfig {
    /// Store directory with `~` expanded, or the platform default.
    pub fn resolve_directory(&self) -> Result<PathBuf, ConfigError> {
        match &self.directory {
            Some(dir) => expand_tilde_path(dir).map(PathBuf::from),
            None => FileStore::default_dir().ok_or_else(|| {
                ConfigError::Missing(
                    "store directory (no platform data directory available)".to_string(),
                )
            }),
        }
    }
}

/// Expand tilde in path, returning error if HOME is not set
///
/// When HOME is unset, shellexpand leaves `~` unchanged; that case is reported instead of
/// silently creating a directory literally named `~`.
pub fn expand_tilde_path(path: &str) -> Result<String, ConfigError> {
    let expanded = shellexpand::tilde(path).to_string();

    if path.starts_with('~') && expanded.starts_with('~') {
        return Err(ConfigError::Invalid(format!(
            "could not expand ~ in '{path}' (HOME not set); use an absolute path"
        )));
    }

    Ok(expanded)
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

fn default_passphrase_env() -> String {
    DEFAULT_PASSPHRASE_ENV.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = IdentityConfig::from_toml("").unwrap();
        assert_eq!(config, IdentityConfig::default());
        assert_eq!(config.label, DEFAULT_LABEL);
    }

    #[test]
    fn test_file_store_config() {
        let config = IdentityConfig::from_toml(
            r#"
            label = "tv-livingroom"

            [store]
            kind = "file"
            directory = "/var/lib/pairing"
            "#,
        )
        .unwrap();

        assert_eq!(config.label, "tv-livingroom");
        let StoreConfig::File(file) = config.store else {
            panic!("expected file store");
        };
        assert_eq!(file.passphrase_env, DEFAULT_PASSPHRASE_ENV);
        assert_eq!(
            file.resolve_directory().unwrap(),
            PathBuf::from("/var/lib/pairing")
        );
    }

    #[test]
    fn test_memory_store_config() {
        let config = IdentityConfig::from_toml("[store]\nkind = \"memory\"\n").unwrap();
        assert_eq!(config.store, StoreConfig::Memory);
    }

    #[test]
    fn test_empty_label_is_rejected() {
        let err = IdentityConfig::from_toml("label = \"  \"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_unknown_store_kind_is_rejected() {
        let err = IdentityConfig::from_toml("[store]\nkind = \"keychain\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn test_absolute_path_is_unchanged() {
        assert_eq!(expand_tilde_path("/etc/pairing").unwrap(), "/etc/pairing");
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let config =
            IdentityConfig::load_or_default(Path::new("/nonexistent/pairing/config.toml")).unwrap();
        assert_eq!(config, IdentityConfig::default());
    }
}
