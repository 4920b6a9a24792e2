//! Client configuration

use std::path::PathBuf;
use std::time::Duration;

/// Client configuration
#[derive(Clone, Debug)]
pub struct Config {
    /// Gateway base URL
    pub base_url: String,
    /// Optional PEM CA bundle for TLS verification
    pub ca_bundle: Option<PathBuf>,
    /// Path of the on-disk client store
    pub store_path: PathBuf,
    /// Request timeout
    pub timeout: Duration,
    /// User agent string
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            ca_bundle: None,
            store_path: PathBuf::from("sealdrop-store.json"),
            timeout: Duration::from_secs(30),
            user_agent: format!("sealdrop-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Create a new config with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the on-disk store path
    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = path.into();
        self
    }

    /// Set a custom CA bundle for TLS verification
    pub fn with_ca_bundle(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_bundle = Some(path.into());
        self
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Join a route path onto the base URL
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_join_handles_trailing_slash() {
        let config = Config::new("http://localhost:8080/");
        assert_eq!(config.url("/api/fs/list"), "http://localhost:8080/api/fs/list");
    }
}
