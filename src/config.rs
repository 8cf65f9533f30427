//! Configuration: `config.toml` settings and environment credentials.
//!
//! Two sources feed a run:
//!
//! - **`config.toml`** describes *where* things live and *how* the platform is
//!   called: the content root, the ledger file, API base URL and timeouts, the
//!   media captions, the cron schedule and the log level. Every key is
//!   optional; a missing file means stock defaults.
//! - **The environment** carries the secrets: the access token and the
//!   publisher identity. They never go into the config file.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! content_root = "images"        # Directory holding week<N>/ folders
//! ledger_path = "posted.json"    # Record of published weeks
//!
//! [content]
//! dir_prefix = "week"            # week12/ -> period 12
//! text_file = "content.txt"      # Mandatory post body inside each folder
//!
//! [platform]
//! api_base_url = "https://api.linkedin.com/v2"
//! protocol_version = "2.0.0"     # X-Restli-Protocol-Version header
//! request_timeout_secs = 15      # Registration and publish calls
//! upload_timeout_secs = 20       # Binary image upload
//!
//! [post]
//! media_title = "Raspberry Pi Automation"
//! media_description = "Auto uploaded image"
//!
//! [schedule]
//! cron = "0 1 * * Mon"           # minute hour day-of-month month day-of-week
//!
//! [logging]
//! level = "info"                 # RUST_LOG overrides this
//! ```
//!
//! Unknown keys are rejected to catch typos early.
//!
//! ## Environment
//!
//! | Variable | Required | Use |
//! |---|---|---|
//! | `LINKEDIN_ACCESS_TOKEN` | yes | bearer token on every call |
//! | `LINKEDIN_URN` | yes | post author and asset owner |
//! | `LINKEDIN_CLIENT_ID` | no | carried for token tooling |
//! | `LINKEDIN_CLIENT_SECRET` | no | carried for token tooling |
//!
//! The same variables may sit in a dotenv file (`.env` in the working
//! directory unless `--env-file` says otherwise). Process variables win over
//! the file; a missing file is not an error.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_ACCESS_TOKEN: &str = "LINKEDIN_ACCESS_TOKEN";
pub const ENV_OWNER_URN: &str = "LINKEDIN_URN";
pub const ENV_CLIENT_ID: &str = "LINKEDIN_CLIENT_ID";
pub const ENV_CLIENT_SECRET: &str = "LINKEDIN_CLIENT_SECRET";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum CredentialsError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
    #[error("cannot read env file {path}: {reason}")]
    EnvFile { path: PathBuf, reason: String },
}

/// Application configuration loaded from `config.toml`.
///
/// All fields have defaults matching the stock file printed by `gen-config`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Directory holding one sub-directory per period.
    pub content_root: String,
    /// JSON file recording every published period.
    pub ledger_path: String,
    /// Layout of a period directory.
    pub content: ContentConfig,
    /// Platform endpoint and per-call timeouts.
    pub platform: PlatformConfig,
    /// Fixed per-image captions attached to every post.
    pub post: PostConfig,
    /// When the scheduler fires.
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            content_root: "images".to_string(),
            ledger_path: "posted.json".to_string(),
            content: ContentConfig::default(),
            platform: PlatformConfig::default(),
            post: PostConfig::default(),
            schedule: ScheduleConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("content_root", &self.content_root),
            ("ledger_path", &self.ledger_path),
            ("content.dir_prefix", &self.content.dir_prefix),
            ("content.text_file", &self.content.text_file),
            ("platform.protocol_version", &self.platform.protocol_version),
            ("post.media_title", &self.post.media_title),
            ("post.media_description", &self.post.media_description),
        ];
        for (key, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::Validation(format!("{key} must not be empty")));
            }
        }
        let base = &self.platform.api_base_url;
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::Validation(
                "platform.api_base_url must start with http:// or https://".into(),
            ));
        }
        if self.platform.request_timeout_secs == 0 || self.platform.upload_timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "platform timeouts must be greater than zero".into(),
            ));
        }
        crate::schedule::parse_schedule(&self.schedule.cron)
            .map_err(|e| ConfigError::Validation(e.to_string()))?;
        Ok(())
    }

    pub fn content_root(&self) -> PathBuf {
        PathBuf::from(&self.content_root)
    }

    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.ledger_path)
    }
}

/// Layout of a single period directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContentConfig {
    /// Directory name prefix; the period number follows it (`week7`).
    pub dir_prefix: String,
    /// Name of the mandatory text file holding the post body.
    pub text_file: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            dir_prefix: "week".to_string(),
            text_file: "content.txt".to_string(),
        }
    }
}

/// Platform endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlatformConfig {
    /// Base URL every JSON endpoint is resolved against (no trailing slash needed).
    pub api_base_url: String,
    /// Value of the `X-Restli-Protocol-Version` header on JSON calls.
    pub protocol_version: String,
    /// Timeout for registration and publish calls.
    pub request_timeout_secs: u64,
    /// Timeout for the binary upload, sized for larger payloads.
    pub upload_timeout_secs: u64,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://api.linkedin.com/v2".to_string(),
            protocol_version: "2.0.0".to_string(),
            request_timeout_secs: 15,
            upload_timeout_secs: 20,
        }
    }
}

impl PlatformConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// Captions attached to every media entry of a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PostConfig {
    pub media_title: String,
    pub media_description: String,
}

impl Default for PostConfig {
    fn default() -> Self {
        Self {
            media_title: "Raspberry Pi Automation".to_string(),
            media_description: "Auto uploaded image".to_string(),
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScheduleConfig {
    /// Five-field cron expression, evaluated in local time.
    pub cron: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cron: "0 1 * * Mon".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Load and validate `config.toml` at `path`.
///
/// A missing file yields the stock defaults. A file that exists but does not
/// parse, carries unknown keys, or fails validation is an error.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate config text.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Secrets and identity read from the process environment.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    /// Publisher identity, e.g. `urn:li:person:abc123`.
    pub owner_urn: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Credentials {
    /// Read credentials from the process environment, then the dotenv file
    /// at `path`.
    pub fn from_env(path: &Path) -> Result<Self, CredentialsError> {
        Self::from_env_file(path, |key| std::env::var(key).ok())
    }

    /// Read credentials through `lookup`, falling back to the dotenv file at
    /// `path` for keys the lookup lacks. A missing file is treated as empty.
    pub fn from_env_file(
        path: &Path,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, CredentialsError> {
        let file = read_env_file(path)?;
        Self::from_lookup(|key| lookup(key).or_else(|| file.get(key).cloned()))
    }

    /// Read credentials through an arbitrary key lookup.
    ///
    /// Blank values count as missing. Optional values are trimmed and dropped
    /// when blank.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CredentialsError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Ok(Self {
            access_token: get(ENV_ACCESS_TOKEN).ok_or(CredentialsError::Missing(ENV_ACCESS_TOKEN))?,
            owner_urn: get(ENV_OWNER_URN).ok_or(CredentialsError::Missing(ENV_OWNER_URN))?,
            client_id: get(ENV_CLIENT_ID),
            client_secret: get(ENV_CLIENT_SECRET),
        })
    }
}

fn read_env_file(path: &Path) -> Result<HashMap<String, String>, CredentialsError> {
    let env_file_error = |e: dotenvy::Error| CredentialsError::EnvFile {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.collect::<Result<_, _>>().map_err(env_file_error),
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(env_file_error(e)),
    }
}

// Keeps the token and secret out of logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("owner_urn", &self.owner_urn)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# weekly-post Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys will cause an error.
#
# Credentials are NOT read from this file. Set them in the environment:
#   LINKEDIN_ACCESS_TOKEN   (required)
#   LINKEDIN_URN            (required, e.g. urn:li:person:abc123)
#   LINKEDIN_CLIENT_ID      (optional)
#   LINKEDIN_CLIENT_SECRET  (optional)

# Directory holding one folder per week: images/week1/, images/week2/, ...
content_root = "images"

# JSON record of published weeks. A week listed here is never posted again.
ledger_path = "posted.json"

# ---------------------------------------------------------------------------
# Content layout
# ---------------------------------------------------------------------------
[content]
# Folder name prefix; the week number follows it (week7/ -> week 7).
dir_prefix = "week"

# Mandatory post body inside each week folder.
# Every .jpg, .jpeg and .png next to it is attached, in filename order.
text_file = "content.txt"

# ---------------------------------------------------------------------------
# Platform
# ---------------------------------------------------------------------------
[platform]
api_base_url = "https://api.linkedin.com/v2"

# Sent as X-Restli-Protocol-Version on JSON calls.
protocol_version = "2.0.0"

# Timeout for asset registration and post creation, in seconds.
request_timeout_secs = 15

# Timeout for each binary image upload, in seconds.
upload_timeout_secs = 20

# ---------------------------------------------------------------------------
# Post
# ---------------------------------------------------------------------------
[post]
# Title and description attached to every image in a post.
media_title = "Raspberry Pi Automation"
media_description = "Auto uploaded image"

# ---------------------------------------------------------------------------
# Schedule
# ---------------------------------------------------------------------------
[schedule]
# Five-field cron expression in local time: minute hour day month weekday.
# The week number posted is the ISO-8601 week of the firing date.
cron = "0 1 * * Mon"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# trace | debug | info | warn | error. RUST_LOG takes precedence.
level = "info"
"##
}
