use std::net::SocketAddr;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "CardioIA";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const ENV_API_URL: &str = "CARDIOIA_API_URL";
pub const ENV_PREDICT_PATH: &str = "CARDIOIA_PREDICT_PATH";
pub const ENV_TIMEOUT_SECS: &str = "CARDIOIA_TIMEOUT_SECS";
pub const ENV_CONNECT_TIMEOUT_SECS: &str = "CARDIOIA_CONNECT_TIMEOUT_SECS";
pub const ENV_BIND: &str = "CARDIOIA_BIND";

const DEFAULT_API_URL: &str = "http://localhost:8000";
const DEFAULT_PREDICT_PATH: &str = "/predict";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "cardioia=info,cardioia_lib=info"
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} is not a valid URL: {value}")]
    InvalidUrl { var: &'static str, value: String },

    #[error("{var} must start with '/': {value}")]
    InvalidPath { var: &'static str, value: String },

    #[error("{var} must be a positive number of seconds: {value}")]
    InvalidTimeout { var: &'static str, value: String },

    #[error("{var} is not a socket address: {value}")]
    InvalidBindAddr { var: &'static str, value: String },
}

/// Where and how to reach the prediction service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredictionConfig {
    pub base_url: String,
    pub predict_path: String,
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for PredictionConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            predict_path: DEFAULT_PREDICT_PATH.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
        }
    }
}

impl PredictionConfig {
    /// Full URL of the prediction endpoint.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.predict_path)
    }
}

/// Top-level configuration, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub prediction: PredictionConfig,
    pub bind_addr: SocketAddr,
}

impl AppConfig {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Missing or blank keys fall back to defaults; present keys must parse.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let base_url = get(ENV_API_URL).unwrap_or_else(|| DEFAULT_API_URL.to_string());
        match reqwest::Url::parse(&base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ConfigError::InvalidUrl {
                    var: ENV_API_URL,
                    value: base_url,
                })
            }
        }

        let predict_path =
            get(ENV_PREDICT_PATH).unwrap_or_else(|| DEFAULT_PREDICT_PATH.to_string());
        if !predict_path.starts_with('/') {
            return Err(ConfigError::InvalidPath {
                var: ENV_PREDICT_PATH,
                value: predict_path,
            });
        }

        let timeout_secs = parse_secs(ENV_TIMEOUT_SECS, get(ENV_TIMEOUT_SECS), DEFAULT_TIMEOUT_SECS)?;
        let connect_timeout_secs = parse_secs(
            ENV_CONNECT_TIMEOUT_SECS,
            get(ENV_CONNECT_TIMEOUT_SECS),
            DEFAULT_CONNECT_TIMEOUT_SECS,
        )?;

        let bind = get(ENV_BIND).unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr = bind.parse().map_err(|_| ConfigError::InvalidBindAddr {
            var: ENV_BIND,
            value: bind.clone(),
        })?;

        Ok(Self {
            prediction: PredictionConfig {
                base_url: base_url.trim_end_matches('/').to_string(),
                predict_path,
                timeout_secs,
                connect_timeout_secs,
            },
            bind_addr,
        })
    }
}

fn parse_secs(var: &'static str, raw: Option<String>, default: u64) -> Result<u64, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(secs),
            _ => Err(ConfigError::InvalidTimeout { var, value }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.prediction, PredictionConfig::default());
        assert_eq!(config.prediction.endpoint(), "http://localhost:8000/predict");
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:3000");
    }

    #[test]
    fn overrides_are_applied() {
        let config = AppConfig::from_lookup(lookup_from(&[
            (ENV_API_URL, "https://risk.example.org/"),
            (ENV_PREDICT_PATH, "/api/predict"),
            (ENV_TIMEOUT_SECS, "10"),
            (ENV_CONNECT_TIMEOUT_SECS, "2"),
            (ENV_BIND, "0.0.0.0:8080"),
        ]))
        .unwrap();
        assert_eq!(config.prediction.base_url, "https://risk.example.org");
        assert_eq!(config.prediction.endpoint(), "https://risk.example.org/api/predict");
        assert_eq!(config.prediction.timeout_secs, 10);
        assert_eq!(config.prediction.connect_timeout_secs, 2);
        assert_eq!(config.bind_addr.port(), 8080);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = AppConfig::from_lookup(lookup_from(&[(ENV_API_URL, "   ")])).unwrap();
        assert_eq!(config.prediction.base_url, "http://localhost:8000");
    }

    #[test]
    fn rejects_non_http_url() {
        let err = AppConfig::from_lookup(lookup_from(&[(ENV_API_URL, "ftp://host")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
        let err = AppConfig::from_lookup(lookup_from(&[(ENV_API_URL, "not a url")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidUrl { .. }));
    }

    #[test]
    fn rejects_relative_predict_path() {
        let err =
            AppConfig::from_lookup(lookup_from(&[(ENV_PREDICT_PATH, "predict")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPath { .. }));
    }

    #[test]
    fn rejects_zero_or_garbage_timeout() {
        let err = AppConfig::from_lookup(lookup_from(&[(ENV_TIMEOUT_SECS, "0")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidTimeout {
                var: ENV_TIMEOUT_SECS,
                value: "0".into()
            }
        );
        assert!(AppConfig::from_lookup(lookup_from(&[(ENV_CONNECT_TIMEOUT_SECS, "soon")])).is_err());
    }

    #[test]
    fn rejects_bad_bind_address() {
        let err = AppConfig::from_lookup(lookup_from(&[(ENV_BIND, "localhost")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBindAddr { .. }));
    }

    #[test]
    fn app_name_is_cardioia() {
        assert_eq!(APP_NAME, "CardioIA");
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
