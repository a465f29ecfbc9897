//! Configuration loaded from TOML and the environment
//!
//! The file lives at `<config dir>/erp-workspace/config.toml` (or wherever
//! `ERP_WORKSPACE_CONFIG` points). Missing files and missing sections fall back
//! to defaults. A `.env` file is read first so its variables can override
//! file values.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::fetch::FetchConfig;

pub const APP_NAME: &str = "erp-workspace";

pub const CONFIG_PATH_VAR: &str = "ERP_WORKSPACE_CONFIG";
pub const BASE_URL_VAR: &str = "ERP_WORKSPACE_BASE_URL";
pub const TOKEN_VAR: &str = "ERP_WORKSPACE_TOKEN";
pub const PAGE_SIZE_VAR: &str = "ERP_WORKSPACE_PAGE_SIZE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub datasource: DatasourceSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub tree: TreeSettings,
    #[serde(default)]
    pub url: UrlSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasourceSettings {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for DatasourceSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub page_size: usize,
    pub child_page_size: usize,
    pub retry_without_implicit_filter: bool,
}

impl Default for FetchSettings {
    fn default() -> Self {
        let defaults = FetchConfig::default();
        Self {
            page_size: defaults.page_size,
            child_page_size: defaults.child_page_size,
            retry_without_implicit_filter: defaults.retry_without_implicit_filter,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeSettings {
    pub metadata_ttl_secs: u64,
}

impl Default for TreeSettings {
    fn default() -> Self {
        Self {
            metadata_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlSettings {
    pub base_path: String,
}

impl Default for UrlSettings {
    fn default() -> Self {
        Self {
            base_path: "/window".to_string(),
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_VAR) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("Cannot resolve config directory; set {} to the config file", CONFIG_PATH_VAR)
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    /// Read a config file; a missing file yields defaults
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    /// Load `.env`, the default config file and environment overrides
    pub fn load_default() -> Result<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            debug!("Loaded environment from {}", path.display());
        }

        let path = Self::default_path()?;
        let mut config = Self::load(&path)?;
        config.apply_env_overrides(|name| env::var(name).ok())?;
        Ok(config)
    }

    /// Apply `ERP_WORKSPACE_*` overrides from `lookup`
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(base_url) = lookup(BASE_URL_VAR).filter(|v| !v.trim().is_empty()) {
            self.datasource.base_url = Some(base_url);
        }
        if let Some(token) = lookup(TOKEN_VAR).filter(|v| !v.trim().is_empty()) {
            self.datasource.token = Some(token);
        }
        if let Some(page_size) = lookup(PAGE_SIZE_VAR) {
            let page_size: usize = page_size
                .trim()
                .parse()
                .with_context(|| format!("{} must be a positive integer", PAGE_SIZE_VAR))?;
            if page_size == 0 {
                bail!("{} must be a positive integer", PAGE_SIZE_VAR);
            }
            self.fetch.page_size = page_size;
        }
        Ok(())
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if self.fetch.page_size == 0 {
            bail!("fetch.page_size must be at least 1 in {}", path.display());
        }
        if self.fetch.child_page_size == 0 {
            bail!("fetch.child_page_size must be at least 1 in {}", path.display());
        }
        if !self.url.base_path.starts_with('/') {
            bail!("url.base_path must start with '/' in {}", path.display());
        }
        Ok(())
    }

    pub fn to_fetch_config(&self) -> FetchConfig {
        FetchConfig::builder()
            .page_size(self.fetch.page_size)
            .child_page_size(self.fetch.child_page_size)
            .retry_without_implicit_filter(self.fetch.retry_without_implicit_filter)
            .build()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.datasource.timeout_secs)
    }

    pub fn tree_metadata_ttl(&self) -> Duration {
        Duration::from_secs(self.tree.metadata_ttl_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.fetch.page_size, 100);
        assert_eq!(config.fetch.child_page_size, 1000);
        assert_eq!(config.tree.metadata_ttl_secs, 300);
        assert_eq!(config.url.base_path, "/window");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let file = write_config(
            r#"
[datasource]
base_url = "https://erp.example.com"

[fetch]
page_size = 25
"#,
        );
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.datasource.base_url.as_deref(), Some("https://erp.example.com"));
        assert_eq!(config.datasource.timeout_secs, 30);
        assert_eq!(config.fetch.page_size, 25);
        assert!(config.fetch.retry_without_implicit_filter);

        let fetch = config.to_fetch_config();
        assert_eq!(fetch.page_size, 25);
        assert_eq!(fetch.child_page_size, 1000);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let file = write_config("[fetch]\npage_size = 0\n");
        assert!(Config::load(file.path()).is_err());

        let file = write_config("[url]\nbase_path = \"window\"\n");
        assert!(Config::load(file.path()).is_err());

        let file = write_config("not toml = [");
        let error = Config::load(file.path()).unwrap_err();
        assert!(format!("{:#}", error).contains("Failed to parse TOML config"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (BASE_URL_VAR, "https://override.example.com"),
            (TOKEN_VAR, "secret"),
            (PAGE_SIZE_VAR, "50"),
        ]);
        let mut config = Config::default();
        config
            .apply_env_overrides(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.datasource.base_url.as_deref(), Some("https://override.example.com"));
        assert_eq!(config.datasource.token.as_deref(), Some("secret"));
        assert_eq!(config.fetch.page_size, 50);
    }

    #[test]
    fn test_bad_page_size_override() {
        let mut config = Config::default();
        assert!(config
            .apply_env_overrides(|name| (name == PAGE_SIZE_VAR).then(|| "zero".to_string()))
            .is_err());
        assert!(config
            .apply_env_overrides(|name| (name == PAGE_SIZE_VAR).then(|| "0".to_string()))
            .is_err());
        assert_eq!(config.fetch.page_size, 100);
    }
}
