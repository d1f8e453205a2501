//! A single [`Config`] value assembled from the process environment once at
//! startup and threaded into every component constructor from there on,
//! rather than components reading `std::env::var` themselves.

use std::env::{self, VarError};
use std::net::IpAddr;
use std::num::ParseIntError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value: {source}")]
    InvalidInt {
        name: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("environment variable {name} has an invalid value: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

/// HTTP-adjacent settings. The HTTP router itself lives outside this crate;
/// these values are only consumed to build absolute URLs (e.g. the social
/// link redirect target) and to size the ingest multipart guard.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub port: u16,
    pub address: IpAddr,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub connection_url: String,
    pub cdn_base: String,
    pub container: String,
}

#[derive(Debug, Clone)]
pub struct ScreenshotsConfig {
    pub jpeg_quality: u8,
    pub max_file_size_bytes: u64,
    pub limit_per_24h: u32,
    pub recency_threshold_days: u32,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub env: Environment,
    pub verbose: bool,
    pub http: HttpConfig,
    pub blob: BlobConfig,
    pub screenshots: ScreenshotsConfig,
    pub support_contact: String,
    pub system_password: Option<String>,
    pub openai_api_key: Option<String>,
    pub database_url: String,
    pub similarity_worker_bin: String,
    pub similarity_model_path: String,
}

impl Config {
    /// Reads every setting from the environment, applying the defaults
    /// spec'd for the screenshot engine where a value is not supplied.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env = match optional("ENV")?.as_deref() {
            None | Some("development") => Environment::Development,
            Some("production") => Environment::Production,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "ENV",
                    reason: format!("expected `development` or `production`, got `{other}`"),
                })
            }
        };

        let verbose = optional("VERBOSE")?
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        let http = HttpConfig {
            port: parse_or("HTTP_PORT", 3000)?,
            address: optional("HTTP_ADDRESS")?
                .map(|v| {
                    v.parse().map_err(|_| ConfigError::Invalid {
                        name: "HTTP_ADDRESS",
                        reason: "not a valid IP address".into(),
                    })
                })
                .transpose()?
                .unwrap_or_else(|| IpAddr::from([0, 0, 0, 0])),
            base_url: optional("HTTP_BASE_URL")?
                .unwrap_or_else(|| "http://localhost:3000".to_string()),
        };

        let blob = BlobConfig {
            connection_url: required("BLOB_CONNECTION_URL")?,
            cdn_base: required("BLOB_CDN")?,
            container: optional("BLOB_CONTAINER")?.unwrap_or_else(|| "screenshots".to_string()),
        };

        let screenshots = ScreenshotsConfig {
            jpeg_quality: parse_or("SCREENSHOTS_JPEG_QUALITY", 85u8)?,
            max_file_size_bytes: parse_or("SCREENSHOTS_MAX_FILE_SIZE_BYTES", 20_000_000u64)?,
            limit_per_24h: parse_or("SCREENSHOTS_LIMIT_PER_24H", 10u32)?,
            recency_threshold_days: parse_or("SCREENSHOTS_RECENCY_THRESHOLD_DAYS", 7u32)?,
        };

        Ok(Self {
            env,
            verbose,
            http,
            blob,
            screenshots,
            support_contact: optional("SUPPORT_CONTACT")?
                .unwrap_or_else(|| "support@example.com".to_string()),
            system_password: optional("SYSTEM_PASSWORD")?,
            openai_api_key: optional("OPENAI_API_KEY")?,
            database_url: required("DATABASE_URL")?,
            similarity_worker_bin: optional("SIMILARITY_WORKER_BIN")?
                .unwrap_or_else(|| "hof-similarity-worker".to_string()),
            similarity_model_path: required("SIMILARITY_MODEL_PATH")?,
        })
    }

    pub fn is_production(&self) -> bool {
        self.env == Environment::Production
    }
}

fn optional(name: &'static str) -> Result<Option<String>, ConfigError> {
    match env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::Invalid {
            name,
            reason: "value is not valid unicode".into(),
        }),
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name)?.ok_or(ConfigError::Missing(name))
}

fn parse_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    match optional(name)? {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|source| ConfigError::InvalidInt { name, source }),
    }
}
