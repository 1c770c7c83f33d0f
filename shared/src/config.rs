use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{AppError, ErrorKind, API_URL_ENV, IMAGE_UPLOAD_PREFIX};

pub const MAX_BASE_URL_LENGTH: usize = 2048;

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConfigError {
    #[error("API base URL is not configured (set {variable})")]
    Missing { variable: String },

    #[error("invalid API base URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::new(
            ErrorKind::Configuration,
            "The app is not configured with a server address.",
        )
        .with_internal(err.to_string())
    }
}

/// Where the backend lives. Built once at startup; every endpoint is derived
/// from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiConfig {
    base_url: Url,
}

impl ApiConfig {
    pub fn new(raw: impl AsRef<str>) -> Result<Self, ConfigError> {
        let raw = raw.as_ref().trim();
        if raw.is_empty() {
            return Err(ConfigError::Missing {
                variable: API_URL_ENV.to_string(),
            });
        }

        if raw.len() > MAX_BASE_URL_LENGTH {
            return Err(ConfigError::InvalidUrl {
                url: truncate(raw),
                reason: format!("URL exceeds maximum length of {MAX_BASE_URL_LENGTH} bytes"),
            });
        }

        let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
            url: truncate(raw),
            reason: e.to_string(),
        })?;

        let scheme = parsed.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::InvalidUrl {
                url: truncate(raw),
                reason: format!("invalid scheme '{scheme}', only 'http' and 'https' are allowed"),
            });
        }

        if parsed.host_str().is_none() {
            return Err(ConfigError::InvalidUrl {
                url: truncate(raw),
                reason: "URL must have a host".to_string(),
            });
        }

        if !parsed.username().is_empty() || parsed.password().is_some() {
            return Err(ConfigError::InvalidUrl {
                url: truncate(raw),
                reason: "credentials in URL are not allowed".to_string(),
            });
        }

        if parsed.query().is_some() || parsed.fragment().is_some() {
            return Err(ConfigError::InvalidUrl {
                url: truncate(raw),
                reason: "base URL cannot carry a query or fragment".to_string(),
            });
        }

        Ok(Self { base_url: parsed })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let raw = lookup(API_URL_ENV).ok_or_else(|| ConfigError::Missing {
            variable: API_URL_ENV.to_string(),
        })?;
        Self::new(raw)
    }

    /// Base URL without a trailing slash.
    pub fn base(&self) -> &str {
        self.base_url.as_str().trim_end_matches('/')
    }

    /// `{base}/{segments...}`; each segment is percent-encoded.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Public URL of an uploaded item image.
    pub fn image_url(&self, image_path: &str) -> String {
        format!(
            "{}/{}/{}",
            self.base(),
            IMAGE_UPLOAD_PREFIX,
            image_path.trim_start_matches('/')
        )
    }
}

fn truncate(url: &str) -> String {
    const SHOWN: usize = 100;
    if url.len() <= SHOWN {
        return url.to_string();
    }
    let mut end = SHOWN;
    while !url.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &url[..end])
}
