use std::collections::HashMap;
use std::env;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Async entities merged into one batch when `ENTITY_PUBLISHER_MAX_MERGE_SIZE` is unset.
pub const DEFAULT_MAX_MERGE_SIZE: NonZeroUsize = NonZeroUsize::new(10).unwrap();

pub const DEFAULT_EXPORT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Compression {
    Gzip,
    None,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ENTITY_PUBLISHER_ENDPOINT is required but not set")]
    EndpointMissing,

    #[error("ENTITY_PUBLISHER_ENDPOINT is not a valid URL: {0}")]
    EndpointInvalidUrl(String),

    #[error("{0} has invalid value: {1}")]
    InvalidNumeric(String, String),

    #[error("ENTITY_PUBLISHER_MAX_MERGE_SIZE must be a positive integer, got: {0}")]
    InvalidMergeSize(String),

    #[error("ENTITY_PUBLISHER_COMPRESSION has invalid value: {0} (expected \"gzip\" or \"none\")")]
    InvalidCompression(String),
}

/// Client settings plus the collector connection they publish through.
#[derive(Debug, Clone)]
pub struct Config {
    pub max_merge_size: NonZeroUsize,
    pub http: HttpConfig,
}

/// How [`HttpTransport`](crate::HttpTransport) reaches the collector.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub endpoint: Url,
    /// Upper bound on one POST, connect included.
    pub timeout: Duration,
    pub compression: Compression,
    /// Sent verbatim on every request, e.g. auth tokens.
    pub headers: Vec<(String, String)>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = env::vars()
            .filter(|(k, _)| k.starts_with("ENTITY_PUBLISHER_"))
            .collect();
        Self::parse(&vars)
    }

    fn parse(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let max_merge_size = match vars.get("ENTITY_PUBLISHER_MAX_MERGE_SIZE") {
            Some(val) => val
                .trim()
                .parse::<NonZeroUsize>()
                .map_err(|_| ConfigError::InvalidMergeSize(val.clone()))?,
            None => DEFAULT_MAX_MERGE_SIZE,
        };

        Ok(Self {
            max_merge_size,
            http: HttpConfig::parse(vars)?,
        })
    }
}

impl HttpConfig {
    /// Settings for `endpoint` with every other field at its default.
    pub fn new(endpoint: Url) -> Self {
        Self {
            endpoint,
            timeout: DEFAULT_EXPORT_TIMEOUT,
            compression: Compression::Gzip,
            headers: Vec::new(),
        }
    }

    fn parse(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let raw = vars
            .get("ENTITY_PUBLISHER_ENDPOINT")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::EndpointMissing)?;
        let endpoint = Url::parse(raw).map_err(|_| ConfigError::EndpointInvalidUrl(raw.clone()))?;

        let mut http = Self::new(endpoint);
        if let Some(val) = vars.get("ENTITY_PUBLISHER_EXPORT_TIMEOUT_MS") {
            let ms: u64 = val.trim().parse().map_err(|_| {
                ConfigError::InvalidNumeric("ENTITY_PUBLISHER_EXPORT_TIMEOUT_MS".into(), val.clone())
            })?;
            http.timeout = Duration::from_millis(ms);
        }
        if let Some(val) = vars.get("ENTITY_PUBLISHER_COMPRESSION") {
            http.compression = val.parse()?;
        }
        if let Some(raw) = vars.get("ENTITY_PUBLISHER_EXPORT_HEADERS") {
            http.headers = parse_headers(raw);
        }
        Ok(http)
    }
}

impl FromStr for Compression {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gzip" => Ok(Compression::Gzip),
            "none" => Ok(Compression::None),
            _ => Err(ConfigError::InvalidCompression(s.to_owned())),
        }
    }
}

/// `key=value` pairs separated by commas. Pairs without `=` or with an empty
/// key are skipped.
fn parse_headers(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter_map(|pair| {
            let (k, v) = pair.split_once('=')?;
            let k = k.trim();
            (!k.is_empty()).then(|| (k.to_owned(), v.trim().to_owned()))
        })
        .collect()
}
