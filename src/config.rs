use thiserror::Error;
use url::Url;

/// Base URL used when neither `--base-url` nor `API_BASE_URL` is provided.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Path of the chat query endpoint, relative to the base URL.
const QUERY_PATH: &str = "api/chat/query";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid base URL '{raw}': {source}")]
    InvalidUrl {
        raw: String,
        source: url::ParseError,
    },

    #[error("base URL '{raw}' must use http or https, not '{scheme}'")]
    UnsupportedScheme { raw: String, scheme: String },
}

/// Process-wide configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    base_url: Url,
}

impl Config {
    pub fn from_base_url(raw: &str) -> Result<Self, ConfigError> {
        let raw = raw.trim();

        let base_url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl {
            raw: raw.to_string(),
            source,
        })?;

        match base_url.scheme() {
            "http" | "https" => Ok(Self { base_url }),
            other => Err(ConfigError::UnsupportedScheme {
                raw: raw.to_string(),
                scheme: other.to_string(),
            }),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL of the query endpoint.
    ///
    /// The endpoint is appended to whatever path the base already carries, so
    /// `https://host/backend` resolves to `https://host/backend/api/chat/query`.
    pub fn query_url(&self) -> Result<Url, ConfigError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            QUERY_PATH
        );

        Url::parse(&joined).map_err(|source| ConfigError::InvalidUrl { raw: joined, source })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_base_url_is_valid() {
        let config = Config::from_base_url(DEFAULT_BASE_URL).unwrap();
        assert_eq!(
            config.query_url().unwrap().as_str(),
            "http://localhost:8000/api/chat/query"
        );
    }

    #[test]
    fn trailing_slash_is_ignored() {
        let config = Config::from_base_url("https://example.com/").unwrap();
        assert_eq!(
            config.query_url().unwrap().as_str(),
            "https://example.com/api/chat/query"
        );
    }

    #[test]
    fn base_path_is_preserved() {
        let config = Config::from_base_url("https://example.com/backend").unwrap();
        assert_eq!(
            config.query_url().unwrap().as_str(),
            "https://example.com/backend/api/chat/query"
        );
    }

    #[test]
    fn rejects_relative_url() {
        let err = Config::from_base_url("localhost:8000/api").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme { .. } | ConfigError::InvalidUrl { .. }));

        let err = Config::from_base_url("/api").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_non_http_scheme() {
        let err = Config::from_base_url("ftp://example.com").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedScheme { ref scheme, .. } if scheme == "ftp"));
    }
}
