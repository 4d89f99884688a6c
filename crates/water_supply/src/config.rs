use std::{env, error, fmt, time::Duration};

use serde::{Deserialize, Serialize};

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REFRESH_SECS: u64 = 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_SEARCH_RADIUS_KM: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Invalid {
        key: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Invalid { key, value, reason } => {
                write!(f, "invalid value '{}' for {}: {}", value, key, reason)
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// Api root, without a trailing slash. Collection endpoints are appended.
    pub api_url: String,
    pub csrf_token: Option<String>,
    /// Page whose `<meta name="csrf-token">` supplies the token when none is
    /// configured directly. Relative to the api origin unless absolute.
    pub csrf_page: Option<String>,
    pub proxy: Option<String>,
    pub refresh_interval_secs: u64,
    pub timeout_secs: u64,
    pub search_radius_km: f64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            csrf_token: None,
            csrf_page: None,
            proxy: None,
            refresh_interval_secs: DEFAULT_REFRESH_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            search_radius_km: DEFAULT_SEARCH_RADIUS_KM,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let api_url = lookup("AQUA_API_URL").unwrap_or(defaults.api_url);
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                key: "AQUA_API_URL",
                value: api_url,
                reason: "expected an http(s) url",
            });
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_owned(),
            csrf_token: lookup("AQUA_CSRF_TOKEN"),
            csrf_page: lookup("AQUA_CSRF_PAGE"),
            proxy: lookup("AQUA_PROXY"),
            refresh_interval_secs: parse_positive(
                "AQUA_REFRESH_SECS",
                lookup("AQUA_REFRESH_SECS"),
                defaults.refresh_interval_secs,
            )?,
            timeout_secs: parse_positive(
                "AQUA_TIMEOUT_SECS",
                lookup("AQUA_TIMEOUT_SECS"),
                defaults.timeout_secs,
            )?,
            search_radius_km: parse_positive(
                "AQUA_SEARCH_RADIUS_KM",
                lookup("AQUA_SEARCH_RADIUS_KM"),
                defaults.search_radius_km,
            )?,
        })
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_positive<T>(key: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(value) = value else {
        return Ok(default);
    };
    match value.parse::<T>() {
        Ok(parsed) if parsed > T::default() => Ok(parsed),
        _ => Err(ConfigError::Invalid {
            key,
            value,
            reason: "expected a positive number",
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.search_radius_km, 10.0);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("AQUA_API_URL", "https://water.example.org/api/"),
            ("AQUA_CSRF_TOKEN", "abc"),
            ("AQUA_REFRESH_SECS", "15"),
            ("AQUA_SEARCH_RADIUS_KM", "2.5"),
            ("AQUA_PROXY", "  "),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://water.example.org/api");
        assert_eq!(config.csrf_token.as_deref(), Some("abc"));
        assert_eq!(config.refresh_interval_secs, 15);
        assert_eq!(config.search_radius_km, 2.5);
        assert_eq!(config.proxy, None);
    }

    #[test]
    fn rejects_nonsense() {
        assert!(config(&[("AQUA_REFRESH_SECS", "0")]).is_err());
        assert!(config(&[("AQUA_TIMEOUT_SECS", "soon")]).is_err());
        assert!(config(&[("AQUA_API_URL", "localhost:5000")]).is_err());
        assert!(config(&[("AQUA_SEARCH_RADIUS_KM", "-1")]).is_err());
    }
}
