use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use crate::gateway::http::DEFAULT_BASE_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Backend base URL without trailing slash.
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Delete the dataset on the backend when the user starts over.
    pub teardown_on_reset: bool,
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub filter: String,
    /// Where the TUI writes its log file.
    pub dir: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = lookup("DATAINSIGHT_API_URL")
            .or_else(|| lookup("API_URL"))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let teardown_on_reset = match lookup("DATAINSIGHT_TEARDOWN_ON_RESET") {
            Some(value) => value
                .trim()
                .parse::<bool>()
                .with_context(|| format!("DATAINSIGHT_TEARDOWN_ON_RESET: invalid bool {:?}", value))?,
            None => true,
        };

        let dir = lookup("DATAINSIGHT_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(default_log_dir);

        Ok(Self {
            api: ApiConfig {
                base_url: normalize_base_url(&base_url)?,
            },
            session: SessionConfig { teardown_on_reset },
            log: LogConfig {
                filter: lookup("RUST_LOG").unwrap_or_else(|| "datainsight=info".to_string()),
                dir,
            },
        })
    }

    /// Replace the backend URL, e.g. from a command-line flag.
    pub fn with_base_url(mut self, base_url: &str) -> Result<Self> {
        self.api.base_url = normalize_base_url(base_url)?;
        Ok(self)
    }
}

fn normalize_base_url(url: &str) -> Result<String> {
    let url = url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("API URL must start with http:// or https://, got {:?}", url);
    }
    Ok(url.trim_end_matches('/').to_string())
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("datainsight").join("logs"))
        .unwrap_or_else(|| PathBuf::from("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.api.base_url, "http://localhost:8000");
        assert!(config.session.teardown_on_reset);
        assert_eq!(config.log.filter, "datainsight=info");
    }

    #[test]
    fn test_api_url_precedence_and_normalization() {
        let config = config_from(&[("API_URL", "http://analysis:9000/")]).unwrap();
        assert_eq!(config.api.base_url, "http://analysis:9000");

        let config = config_from(&[
            ("API_URL", "http://analysis:9000"),
            ("DATAINSIGHT_API_URL", "https://data.example.com"),
        ])
        .unwrap();
        assert_eq!(config.api.base_url, "https://data.example.com");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(config_from(&[("DATAINSIGHT_API_URL", "localhost:8000")]).is_err());
        assert!(config_from(&[("DATAINSIGHT_TEARDOWN_ON_RESET", "sometimes")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("DATAINSIGHT_TEARDOWN_ON_RESET", "false"),
            ("DATAINSIGHT_LOG_DIR", "/tmp/di-logs"),
            ("RUST_LOG", "datainsight=debug"),
        ])
        .unwrap();
        assert!(!config.session.teardown_on_reset);
        assert_eq!(config.log.dir, PathBuf::from("/tmp/di-logs"));
        assert_eq!(config.log.filter, "datainsight=debug");

        let config = config.with_base_url("http://other:1234/").unwrap();
        assert_eq!(config.api.base_url, "http://other:1234");
        assert!(config.clone().with_base_url("ftp://nope").is_err());
    }
}
