/// Server configuration.
///
/// Settings are read from a TOML file.  The first file found wins:
///
///   1. the path given with `--config`
///   2. `<workspace root>/.pgsql-lsp.toml`
///   3. `<user config dir>/pgsql-lsp/config.toml`
///
/// Every key is optional; missing keys take their defaults.
///
/// ```toml
/// [workspace]
/// include = ["**/*.sql", "**/*.SQL"]
/// exclude = ["**/node_modules/**"]
///
/// [cache]
/// enabled = true
/// debounce-ms = 500
///
/// [completion]
/// keywords = true
/// ```
use std::path::{Path, PathBuf};
use std::time::Duration;

use etcetera::BaseStrategy;
use serde::Deserialize;

/// File name looked up at the workspace root.
pub const WORKSPACE_CONFIG_FILE: &str = ".pgsql-lsp.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub workspace: WorkspaceConfig,
    pub cache: CacheConfig,
    pub completion: CompletionConfig,
}

/// Which files count as workspace SQL sources.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct WorkspaceConfig {
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            include: vec!["**/*.sql".to_string(), "**/*.SQL".to_string()],
            exclude: vec!["**/node_modules/**".to_string()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CacheConfig {
    pub enabled: bool,
    pub debounce_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce_ms: 500,
        }
    }
}

impl CacheConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CompletionConfig {
    /// Offer PostgreSQL keywords alongside routine names.
    pub keywords: bool,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self { keywords: true }
    }
}

impl Config {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }

    /// The configuration file that applies, if any exists.
    pub fn locate(explicit: Option<&Path>, workspace_root: Option<&Path>) -> Option<PathBuf> {
        if let Some(path) = explicit {
            return Some(path.to_path_buf());
        }
        if let Some(root) = workspace_root {
            let candidate = root.join(WORKSPACE_CONFIG_FILE);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        let user = etcetera::choose_base_strategy()
            .ok()?
            .config_dir()
            .join("pgsql-lsp")
            .join("config.toml");
        user.is_file().then_some(user)
    }

    /// Load the applicable configuration, falling back to defaults when no
    /// file exists or the file cannot be used.
    pub fn load(explicit: Option<&Path>, workspace_root: Option<&Path>) -> Self {
        let Some(path) = Self::locate(explicit, workspace_root) else {
            return Self::default();
        };
        match Self::from_file(&path) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded configuration");
                config
            }
            Err(err) => {
                tracing::warn!("{err}; using default configuration");
                Self::default()
            }
        }
    }
}
