// Client configuration.
//
// Global config: `~/.wikiedit/config.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_API_URL: &str = "https://en.wikipedia.org/w/api.php";
pub const DEFAULT_TIMEOUT_SECS: u64 = 100;
pub const DEFAULT_USER_AGENT: &str = concat!("wikiedit/", env!("CARGO_PKG_VERSION"));

/// Root directory for wikiedit state: `~/.wikiedit/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".wikiedit"))
}

/// Path to the config file: `~/.wikiedit/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub wiki: WikiConfig,
    pub http: HttpConfig,
}

/// Endpoints of the wiki being edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WikiConfig {
    /// `api.php` endpoint.
    pub api_url: String,
    /// `index.php` endpoint used for form submission. Derived from
    /// `api_url` when unset.
    pub index_url: Option<String>,
}

impl Default for WikiConfig {
    fn default() -> Self {
        Self { api_url: DEFAULT_API_URL.into(), index_url: None }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HttpConfig {
    /// Upper bound for a single request.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self { timeout_secs: DEFAULT_TIMEOUT_SECS, user_agent: DEFAULT_USER_AGENT.into() }
    }
}

impl ClientConfig {
    /// Load from `~/.wikiedit/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.http.timeout_secs)
    }

    pub fn api_url(&self) -> Result<Url, ConfigError> {
        Url::parse(&self.wiki.api_url)
            .map_err(|e| ConfigError::InvalidUrl(self.wiki.api_url.clone(), e))
    }

    /// The configured index endpoint, or `index.php` next to `api.php`.
    pub fn index_url(&self) -> Result<Url, ConfigError> {
        match &self.wiki.index_url {
            Some(raw) => Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(raw.clone(), e)),
            None => {
                let api = self.api_url()?;
                api.join("index.php")
                    .map_err(|e| ConfigError::InvalidUrl(self.wiki.api_url.clone(), e))
            }
        }
    }
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
    InvalidUrl(String, url::ParseError),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
            Self::InvalidUrl(raw, e) => write!(f, "invalid URL `{raw}` in config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
