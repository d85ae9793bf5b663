//! Arbor Configuration
//!
//! Handles parsing and management of arbor.toml configuration files.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the configuration file searched for by [`ArborConfig::find_and_load`].
pub const CONFIG_FILE: &str = "arbor.toml";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file not found: {0}")]
    NotFound(String),
}

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Root configuration structure matching arbor.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ArborConfig {
    /// Engine settings
    #[serde(default)]
    pub vm: VmConfig,

    /// Extension modules
    #[serde(default)]
    pub extensions: ExtensionsConfig,
}

impl ArborConfig {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        let config: ArborConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from the current directory or parents.
    pub fn load_from_cwd() -> ConfigResult<Self> {
        let cwd = std::env::current_dir().map_err(ConfigError::Io)?;
        Self::find_and_load(&cwd)
    }

    /// Find and load configuration by searching up from the given directory.
    pub fn find_and_load(start_dir: &Path) -> ConfigResult<Self> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let config_path = dir.join(CONFIG_FILE);
            if config_path.exists() {
                return Self::load(&config_path);
            }
            if !dir.pop() {
                // Reached root without finding config
                return Ok(Self::default());
            }
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Engine settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VmConfig {
    /// Export invoked to start the guest
    #[serde(default = "default_entrypoint")]
    pub entrypoint: String,

    /// Initial auxiliary stack top
    #[serde(default)]
    pub stack_top: i64,
}

fn default_entrypoint() -> String {
    "main".to_string()
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            entrypoint: default_entrypoint(),
            stack_top: 0,
        }
    }
}

/// Extension module sources, registered in the order listed.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ExtensionsConfig {
    /// Statically linked providers, registered first
    #[serde(default)]
    pub providers: Vec<String>,

    /// Native artifacts, registered after providers
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    /// Directories searched for bare artifact names
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ArborConfig::default();
        assert_eq!(config.vm.entrypoint, "main");
        assert_eq!(config.vm.stack_top, 0);
        assert!(config.extensions.providers.is_empty());
        assert!(config.extensions.paths.is_empty());
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[vm]
entrypoint = "start"
stack_top = 4096

[extensions]
providers = ["math", "debug"]
paths = ["./libgfx.so"]
search_paths = ["ext"]
"#;

        let config: ArborConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.vm.entrypoint, "start");
        assert_eq!(config.vm.stack_top, 4096);
        assert_eq!(config.extensions.providers, vec!["math", "debug"]);
        assert_eq!(config.extensions.paths, vec![PathBuf::from("./libgfx.so")]);
        assert_eq!(config.extensions.search_paths, vec![PathBuf::from("ext")]);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: ArborConfig = toml::from_str("[extensions]\nproviders = [\"math\"]\n").unwrap();
        assert_eq!(config.vm, VmConfig::default());
        assert_eq!(config.extensions.providers, vec!["math"]);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);

        let mut config = ArborConfig::default();
        config.vm.entrypoint = "start".to_string();
        config.extensions.providers.push("math".to_string());
        config.save(&path).unwrap();

        assert_eq!(ArborConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_find_and_load_searches_parents() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            "[vm]\nentrypoint = \"boot\"\n",
        )
        .unwrap();

        let config = ArborConfig::find_and_load(&nested).unwrap();
        assert_eq!(config.vm.entrypoint, "boot");
    }

    #[test]
    fn test_load_missing_and_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            ArborConfig::load(&missing),
            Err(ConfigError::NotFound(_))
        ));

        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "[vm\nentrypoint = 1").unwrap();
        assert!(matches!(ArborConfig::load(&bad), Err(ConfigError::Parse(_))));
    }
}
