//! TOML configuration.
//!
//! Every section is optional; a missing file section falls back to defaults.
//!
//! ```toml
//! [backend]
//! url = "https://project.example.co"
//! anon_key = "..."
//!
//! [feed]
//! page_size = 20
//! refresh_notice_secs = 2
//! missing_user_scope = "unfiltered"
//!
//! [session]
//! user_id = "u1"
//!
//! [logging]
//! level = "info"
//! file = "copyfeed.log"
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::UserId;
use crate::feed::ScopeFallback;

/// Upper bound on `backend.max_retries`.
pub const MAX_RETRIES: u32 = 5;

/// Upper bound on `backend.timeout_secs`.
pub const MAX_TIMEOUT_SECS: u64 = 120;

/// Config parsing and validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error("backend url is not configured (set [backend].url or COPYFEED_BACKEND_URL)")]
    MissingBackend,
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub feed: FeedConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Project base URL, without the `/rest/v1` suffix.
    pub url: String,
    pub anon_key: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: 30,
            max_retries: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Signals per page. Page `n` asks the source for `page_size * n` signals.
    pub page_size: usize,
    /// How long the "Loaded N signals" notice stays up after a refresh.
    pub refresh_notice_secs: u64,
    /// What a scope filter does when nobody is signed in.
    pub missing_user_scope: ScopeFallback,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            refresh_notice_secs: 2,
            missing_user_scope: ScopeFallback::Unfiltered,
        }
    }
}

impl FeedConfig {
    pub fn refresh_notice(&self) -> Duration {
        Duration::from_secs(self.refresh_notice_secs)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub user_id: Option<String>,
}

impl SessionConfig {
    pub fn user(&self) -> Option<UserId> {
        self.user_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(UserId::from)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// Log file; the TUI needs one because it owns the terminal.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            file: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.feed.page_size == 0 {
            return Err(ConfigError::Invalid("feed.page_size must be at least 1".into()));
        }
        if self.backend.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "backend.max_retries must be at most {MAX_RETRIES}, got {}",
                self.backend.max_retries
            )));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.backend.timeout_secs) {
            return Err(ConfigError::Invalid(format!(
                "backend.timeout_secs must be between 1 and {MAX_TIMEOUT_SECS}, got {}",
                self.backend.timeout_secs
            )));
        }
        let url = self.backend.url.trim();
        if !url.is_empty() && !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "backend.url must start with http:// or https://, got '{url}'"
            )));
        }
        Ok(())
    }

    /// Apply `COPYFEED_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (environment in production).
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(url) = lookup("COPYFEED_BACKEND_URL") {
            self.backend.url = url;
        }
        if let Some(key) = lookup("COPYFEED_ANON_KEY") {
            self.backend.anon_key = key;
        }
        if let Some(user) = lookup("COPYFEED_USER_ID") {
            self.session.user_id = Some(user);
        }
        self.validate()?;
        Ok(self)
    }

    /// Error unless a backend URL is configured.
    pub fn require_backend(&self) -> Result<&BackendConfig, ConfigError> {
        if self.backend.url.trim().is_empty() {
            return Err(ConfigError::MissingBackend);
        }
        Ok(&self.backend)
    }
}
