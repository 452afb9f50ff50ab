use std::env;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; OgPreviewBot/1.0)";
pub const DEFAULT_CLOUDINARY_BASE_URL: &str = "https://res.cloudinary.com";
pub const DEFAULT_CLOUDINARY_TRANSFORMATIONS: &str = "f_auto,q_auto";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name} must be a {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Cloudinary settings. Present only when `CLOUDINARY_CLOUD_NAME` is set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CloudinaryConfig {
    pub base_url: String,
    pub cloud_name: String,
    pub transformations: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    pub is_dev: bool,
    /// Budget for the unfurl race. Past this the request resolves to the error sentinel.
    pub unfurl_timeout: Duration,
    pub user_agent: String,
    pub max_body_bytes: usize,
    /// Skips the private-address check. Only meant for local development and tests.
    pub allow_private_hosts: bool,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let server_port = match var("SERVER_PORT") {
            Some(v) => parse_number(&v, "SERVER_PORT", "port number")?,
            None => 8080,
        };

        let timeout_ms: u64 = match var("OG_TIMEOUT_MS") {
            Some(v) => parse_number(&v, "OG_TIMEOUT_MS", "positive number of milliseconds")?,
            None => DEFAULT_TIMEOUT_MS,
        };
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: "OG_TIMEOUT_MS",
                expected: "positive number of milliseconds",
                value: "0".into(),
            });
        }

        let max_body_bytes = match var("OG_MAX_BODY_BYTES") {
            Some(v) => parse_number(&v, "OG_MAX_BODY_BYTES", "byte count")?,
            None => DEFAULT_MAX_BODY_BYTES,
        };

        let allow_private_hosts = match var("OG_ALLOW_PRIVATE_HOSTS") {
            Some(v) => parse_bool(&v, "OG_ALLOW_PRIVATE_HOSTS")?,
            None => false,
        };

        let cloudinary = var("CLOUDINARY_CLOUD_NAME").map(|cloud_name| CloudinaryConfig {
            base_url: var("CLOUDINARY_BASE_URL")
                .unwrap_or_else(|| DEFAULT_CLOUDINARY_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            cloud_name: cloud_name.trim().to_string(),
            transformations: var("CLOUDINARY_TRANSFORMATIONS")
                .unwrap_or_else(|| DEFAULT_CLOUDINARY_TRANSFORMATIONS.to_string()),
        });

        Ok(Config {
            server_host: var("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port,
            is_dev: var("APP_ENV").as_deref() != Some("production"),
            unfurl_timeout: Duration::from_millis(timeout_ms),
            user_agent: var("OG_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            max_body_bytes,
            allow_private_hosts,
            cloudinary,
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn parse_number<T: std::str::FromStr>(
    value: &str,
    name: &'static str,
    expected: &'static str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        name,
        expected,
        value: value.to_string(),
    })
}

fn parse_bool(value: &str, name: &'static str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            name,
            expected: "boolean",
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.server_addr(), "127.0.0.1:8080");
        assert!(config.is_dev);
        assert_eq!(config.unfurl_timeout, Duration::from_millis(5_000));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert!(!config.allow_private_hosts);
        assert!(config.cloudinary.is_none());
    }

    #[test]
    fn production_env_disables_dev_mode() {
        let config = config_from(&[("APP_ENV", "production")]).unwrap();
        assert!(!config.is_dev);
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("SERVER_HOST", "0.0.0.0"),
            ("SERVER_PORT", "9000"),
            ("OG_TIMEOUT_MS", "1500"),
            ("OG_ALLOW_PRIVATE_HOSTS", "true"),
        ])
        .unwrap();
        assert_eq!(config.server_addr(), "0.0.0.0:9000");
        assert_eq!(config.unfurl_timeout, Duration::from_millis(1_500));
        assert!(config.allow_private_hosts);
    }

    #[test]
    fn cloudinary_section_uses_defaults() {
        let config = config_from(&[("CLOUDINARY_CLOUD_NAME", "demo")]).unwrap();
        assert_eq!(
            config.cloudinary,
            Some(CloudinaryConfig {
                base_url: DEFAULT_CLOUDINARY_BASE_URL.into(),
                cloud_name: "demo".into(),
                transformations: DEFAULT_CLOUDINARY_TRANSFORMATIONS.into(),
            })
        );
    }

    #[test]
    fn cloudinary_base_url_trailing_slash_is_trimmed() {
        let config = config_from(&[
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_BASE_URL", "https://cdn.example.com/"),
        ])
        .unwrap();
        assert_eq!(config.cloudinary.unwrap().base_url, "https://cdn.example.com");
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = config_from(&[("CLOUDINARY_CLOUD_NAME", "  "), ("SERVER_PORT", "")]).unwrap();
        assert!(config.cloudinary.is_none());
        assert_eq!(config.server_port, 8080);
    }

    #[test]
    fn rejects_malformed_port() {
        let err = config_from(&[("SERVER_PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "SERVER_PORT", .. }));
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = config_from(&[("OG_TIMEOUT_MS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "OG_TIMEOUT_MS", .. }));
    }

    #[test]
    fn rejects_malformed_bool() {
        let err = config_from(&[("OG_ALLOW_PRIVATE_HOSTS", "maybe")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "OG_ALLOW_PRIVATE_HOSTS", .. }));
    }
}
