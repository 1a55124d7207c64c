//! Collector configuration
//! Loaded from a YAML file; credentials can be overridden from the environment

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_SITE: &str = "https://www.zacks.com";
pub const DEFAULT_SCREENER_API: &str = "https://screener-api.zacks.com";

/// One key/value parameter block from a job definition.
pub type ParamBlock = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Milliseconds to wait between attempts of the same job.
    #[serde(default = "default_retry_delay")]
    pub delay_between_retries: u64,
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default)]
    pub jobs: Vec<ScrapeJob>,
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    5_000
}

fn default_timeout() -> u64 {
    30
}

/// Base URLs of the two hosts the collector talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoints {
    pub site: String,
    pub screener_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            site: DEFAULT_SITE.to_string(),
            screener_api: DEFAULT_SCREENER_API.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    StockScreener,
    EarningsCalendar,
    EarningsRelease,
    EspFilter,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JobKind::StockScreener => "stock_screener",
            JobKind::EarningsCalendar => "earnings_calendar",
            JobKind::EarningsRelease => "earnings_release",
            JobKind::EspFilter => "esp_filter",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrapeJob {
    pub job_type: JobKind,
    pub out_dir: PathBuf,
    #[serde(default)]
    pub parameters: Vec<ParamBlock>,
}

impl Config {
    /// Load a YAML config file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let mut config = Self::from_yaml(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// `ZACKS_USERNAME` / `ZACKS_PASSWORD` take precedence over the file.
    pub fn apply_env(&mut self) {
        if let Ok(user) = std::env::var("ZACKS_USERNAME") {
            self.username = user;
        }
        if let Ok(pass) = std::env::var("ZACKS_PASSWORD") {
            self.password = pass;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(anyhow!("username and password must be set (config file or ZACKS_USERNAME/ZACKS_PASSWORD)"));
        }
        if self.max_retries == 0 {
            return Err(anyhow!("maxRetries must be at least 1"));
        }
        Ok(())
    }
}
