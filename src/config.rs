//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/bmorg/bmorg.toml`
//! 3. Environment variables: `BMORG_*` prefix, `__` as section separator
//!    (e.g. `BMORG_CLASSIFIER__MAX_ITEMS=500`)

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::application::error::{ApplicationError, ApplicationResult};

/// Outbound proxy for the fetch collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyConfig {
    pub url: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl ProxyConfig {
    /// The proxy URL when it is usable: http(s) scheme with a host. An
    /// invalid or absent URL means "no proxy", never an error.
    pub fn validated_url(&self) -> Option<&str> {
        let raw = self.url.as_deref()?;
        let parsed = Url::parse(raw).ok()?;
        match parsed.scheme() {
            "http" | "https" => parsed.host_str().filter(|h| !h.is_empty()).map(|_| raw),
            _ => None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.validated_url().is_some()
    }
}

/// AI classification settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// API key for the external classifier. The environment layer
    /// (`BMORG_CLASSIFIER__API_KEY`) takes precedence over the file.
    pub api_key: Option<String>,
    /// Terms the classifier should prefer as folder names.
    pub priority_terms: Vec<String>,
    /// Cap on bookmarks submitted per cycle.
    pub max_items: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            priority_terms: Vec::new(),
            max_items: 300,
        }
    }
}

/// Preview/favicon fetching and caching.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PreviewConfig {
    pub fetch_timeout_secs: u64,
    pub cache_capacity: u64,
    pub cache_ttl_secs: u64,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_secs: 10,
            cache_capacity: 100,
            cache_ttl_secs: 300,
        }
    }
}

/// Application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub proxy: ProxyConfig,
    pub classifier: ClassifierConfig,
    pub preview: PreviewConfig,
}

impl Settings {
    /// Load settings with the documented precedence.
    pub fn load() -> ApplicationResult<Self> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&Settings::default()).map_err(config_err)?);

        if let Some(global) = global_config_path() {
            builder = builder.add_source(File::from(global).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("BMORG").separator("__"));

        builder
            .build()
            .map_err(config_err)?
            .try_deserialize()
            .map_err(config_err)
    }
}

fn global_config_path() -> Option<std::path::PathBuf> {
    ProjectDirs::from("", "", "bmorg").map(|dirs| dirs.config_dir().join("bmorg.toml"))
}

fn config_err(e: config::ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
