//! Application configuration management.
//!
//! Configuration is stored at `~/.config/insightx/config.json`. Environment
//! variables (optionally from a `.env` file loaded by the binary) override the
//! file values:
//!
//! - `INSIGHTX_API_URL`: explicit backend base URL
//! - `INSIGHTX_HOST`: hostname the client is serving from
//! - `INSIGHTX_API_PORT`: backend port used when deriving the URL from the host
//! - `INSIGHTX_EMAIL`: default login email

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "insightx";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend port when none is configured.
const DEFAULT_API_PORT: u16 = 8000;

/// Timeout for ordinary API calls.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Timeout for dataset uploads.
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 60;

/// How often the expiry watcher inspects the stored access token.
const DEFAULT_EXPIRY_CHECK_INTERVAL_SECS: u64 = 5 * 60;

const LOOPBACK_HOSTS: &[&str] = &["localhost", "127.0.0.1", "::1", "[::1]"];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    pub host: Option<String>,
    pub api_port: u16,
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub expiry_check_interval_secs: u64,
    pub last_email: Option<String>,
    pub export_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: None,
            host: None,
            api_port: DEFAULT_API_PORT,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            expiry_check_interval_secs: DEFAULT_EXPIRY_CHECK_INTERVAL_SECS,
            last_email: None,
            export_dir: None,
        }
    }
}

impl Config {
    /// Load the config file (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = Self::load_file()?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        serde_json::from_str(&contents).context("Failed to parse config file")
    }

    /// Record the last email used to log in. Only that field is written back;
    /// overrides from the environment or command line stay out of the file.
    pub fn remember_email(&mut self, email: &str) -> Result<()> {
        self.last_email = Some(email.to_string());
        let mut stored = Self::load_file()?;
        stored.last_email = Some(email.to_string());
        stored.save()
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests).
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("INSIGHTX_API_URL").filter(|v| !v.trim().is_empty()) {
            self.api_url = Some(url);
        }
        if let Some(host) = lookup("INSIGHTX_HOST").filter(|v| !v.trim().is_empty()) {
            self.host = Some(host);
        }
        if let Some(port) = lookup("INSIGHTX_API_PORT") {
            match port.trim().parse::<u16>() {
                Ok(port) => self.api_port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid INSIGHTX_API_PORT"),
            }
        }
        if let Some(email) = lookup("INSIGHTX_EMAIL").filter(|v| !v.trim().is_empty()) {
            self.last_email = Some(email);
        }
    }

    /// Resolve the backend base URL.
    ///
    /// An explicit `api_url` wins. Otherwise a non-loopback host is served over
    /// HTTPS on the configured port, and everything else falls back to the
    /// local development backend.
    pub fn base_url(&self) -> String {
        if let Some(ref url) = self.api_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.host.as_deref().map(str::trim) {
            Some(host) if !host.is_empty() && !is_loopback(host) => {
                format!("https://{}:{}", host, self.api_port)
            }
            _ => format!("http://127.0.0.1:{}", self.api_port),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn expiry_check_interval(&self) -> Duration {
        Duration::from_secs(self.expiry_check_interval_secs.max(1))
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Directory for log files.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Directory reports are written to when no explicit target is given.
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

fn is_loopback(host: &str) -> bool {
    LOOPBACK_HOSTS.iter().any(|h| h.eq_ignore_ascii_case(host))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_base_url_defaults_to_local_backend() {
        let config = Config::default();
        assert_eq!(config.base_url(), "http://127.0.0.1:8000");
    }

    #[test]
    fn test_base_url_loopback_hosts_stay_local() {
        for host in ["localhost", "127.0.0.1", "LOCALHOST", "::1"] {
            let config = Config {
                host: Some(host.to_string()),
                ..Config::default()
            };
            assert_eq!(config.base_url(), "http://127.0.0.1:8000", "host {}", host);
        }
    }

    #[test]
    fn test_base_url_remote_host_forces_https() {
        let config = Config {
            host: Some("insights.example.com".to_string()),
            ..Config::default()
        };
        assert_eq!(config.base_url(), "https://insights.example.com:8000");

        let config = Config {
            host: Some("insights.example.com".to_string()),
            api_port: 443,
            ..Config::default()
        };
        assert_eq!(config.base_url(), "https://insights.example.com:443");
    }

    #[test]
    fn test_base_url_explicit_url_wins() {
        let config = Config {
            api_url: Some("https://api.example.com/".to_string()),
            host: Some("insights.example.com".to_string()),
            ..Config::default()
        };
        assert_eq!(config.base_url(), "https://api.example.com");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("INSIGHTX_HOST", "dash.example.org"),
            ("INSIGHTX_API_PORT", "9443"),
            ("INSIGHTX_EMAIL", "a@b.com"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.base_url(), "https://dash.example.org:9443");
        assert_eq!(config.last_email.as_deref(), Some("a@b.com"));
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_env_overrides(|k| (k == "INSIGHTX_API_PORT").then(|| "http".to_string()));
        assert_eq!(config.api_port, 8000);
    }

    #[test]
    fn test_partial_config_file_uses_defaults() {
        let config: Config = serde_json::from_str(r#"{"host": "x.example"}"#).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert_eq!(config.upload_timeout(), Duration::from_secs(60));
        assert_eq!(config.api_port, 8000);
    }
}
