//! Client configuration
//!
//! Defaults match production use; `EsiConfig::from_env` overlays `ESI_*`
//! environment variables and the CLI overrides individual fields on top.

use std::time::Duration;

use serde::Deserialize;

use crate::cache::CacheBackend;
use crate::error::EsiError;

/// Upstream base URL including the API version segment
pub const DEFAULT_BASE_URL: &str = "https://esi.evetech.net/latest";

/// Retry budget used by every resource accessor
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Per-attempt timeout of the underlying HTTP client
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Contact channel used when none is configured
pub const DEFAULT_CONTACT: &str = "contact not configured";

/// Builds the User-Agent string the upstream terms of use ask for
///
/// Renders as `<app>/<version> (<contact>)`.
pub fn compliance_user_agent(app: &str, version: &str, contact: &str) -> String {
    format!("{app}/{version} ({contact})")
}

/// Settings for an [`EsiClient`](crate::esi::EsiClient)
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EsiConfig {
    /// Upstream base URL, no trailing slash
    pub base_url: String,
    /// Compliance User-Agent sent with every request
    pub user_agent: String,
    /// Cache backend, chosen once at construction
    pub cache: CacheBackend,
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Timeout for each individual attempt, in seconds
    pub http_timeout_secs: u64,
    /// Refuse to send requests while the error budget is nearly exhausted
    pub enforce_error_limits: bool,
    /// Key cached per-token resources by a SHA-256 of the token instead of the token itself
    pub hash_token_keys: bool,
    /// Send page 1 of paged resources upstream even when the cached copy is fresh
    pub revalidate_paged: bool,
}

impl Default for EsiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: compliance_user_agent(
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION"),
                DEFAULT_CONTACT,
            ),
            cache: CacheBackend::Memory,
            max_retries: DEFAULT_MAX_RETRIES,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            enforce_error_limits: false,
            hash_token_keys: false,
            revalidate_paged: false,
        }
    }
}

impl EsiConfig {
    /// Defaults overlaid with `ESI_*` environment variables
    pub fn from_env() -> Result<Self, EsiError> {
        Self::default().overlay(|name| std::env::var(name).ok())
    }

    /// Overlays values returned by `lookup` for each `ESI_*` variable name
    pub fn overlay<F>(mut self, lookup: F) -> Result<Self, EsiError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("ESI_BASE_URL") {
            self.base_url = url;
        }
        if let Some(contact) = lookup("ESI_CONTACT") {
            self.user_agent =
                compliance_user_agent(env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"), &contact);
        }
        if let Some(agent) = lookup("ESI_USER_AGENT") {
            self.user_agent = agent;
        }
        if let Some(url) = lookup("ESI_REDIS_URL").filter(|u| !u.is_empty()) {
            self.cache = CacheBackend::Redis { url };
        }
        if let Some(raw) = lookup("ESI_MAX_RETRIES") {
            self.max_retries = parse_var("ESI_MAX_RETRIES", &raw)?;
        }
        if let Some(raw) = lookup("ESI_HTTP_TIMEOUT_SECS") {
            self.http_timeout_secs = parse_var("ESI_HTTP_TIMEOUT_SECS", &raw)?;
        }
        if let Some(raw) = lookup("ESI_ENFORCE_ERROR_LIMITS") {
            self.enforce_error_limits = parse_bool("ESI_ENFORCE_ERROR_LIMITS", &raw)?;
        }
        if let Some(raw) = lookup("ESI_HASH_TOKEN_KEYS") {
            self.hash_token_keys = parse_bool("ESI_HASH_TOKEN_KEYS", &raw)?;
        }
        if let Some(raw) = lookup("ESI_REVALIDATE_PAGED") {
            self.revalidate_paged = parse_bool("ESI_REVALIDATE_PAGED", &raw)?;
        }
        Ok(self)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Rejects settings the client cannot run with
    pub fn validate(&self) -> Result<(), EsiError> {
        if self.user_agent.trim().is_empty() {
            return Err(EsiError::Config("user agent must not be empty".to_string()));
        }
        if reqwest::Url::parse(&self.base_url).is_err() {
            return Err(EsiError::Config(format!(
                "base URL '{}' is not a valid URL",
                self.base_url
            )));
        }
        if self.http_timeout_secs == 0 {
            return Err(EsiError::Config("HTTP timeout must be positive".to_string()));
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, raw: &str) -> Result<T, EsiError> {
    raw.trim()
        .parse()
        .map_err(|_| EsiError::Config(format!("{name}='{raw}' is not a valid number")))
}

fn parse_bool(name: &str, raw: &str) -> Result<bool, EsiError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(EsiError::Config(format!("{name}='{raw}' is not a boolean"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = EsiConfig::default();

        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.cache, CacheBackend::Memory);
        assert!(!config.enforce_error_limits);
        assert!(!config.hash_token_keys);
        assert!(!config.revalidate_paged);
        assert!(config.user_agent.starts_with("esi-gate/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlay_applies_environment() {
        let config = EsiConfig::default()
            .overlay(lookup(&[
                ("ESI_REDIS_URL", "redis://cache:6379"),
                ("ESI_MAX_RETRIES", "5"),
                ("ESI_CONTACT", "ops@corp.example"),
                ("ESI_HASH_TOKEN_KEYS", "true"),
                ("ESI_REVALIDATE_PAGED", "on"),
            ]))
            .unwrap();

        assert_eq!(
            config.cache,
            CacheBackend::Redis {
                url: "redis://cache:6379".to_string()
            }
        );
        assert_eq!(config.max_retries, 5);
        assert!(config.user_agent.ends_with("(ops@corp.example)"));
        assert!(config.hash_token_keys);
        assert!(config.revalidate_paged);
    }

    #[test]
    fn test_explicit_user_agent_beats_contact() {
        let config = EsiConfig::default()
            .overlay(lookup(&[
                ("ESI_CONTACT", "ops@corp.example"),
                ("ESI_USER_AGENT", "killboard/2.0 (admin@kb.example)"),
            ]))
            .unwrap();

        assert_eq!(config.user_agent, "killboard/2.0 (admin@kb.example)");
    }

    #[test]
    fn test_overlay_rejects_bad_numbers() {
        let err = EsiConfig::default()
            .overlay(lookup(&[("ESI_MAX_RETRIES", "many")]))
            .unwrap_err();

        assert!(err.to_string().contains("ESI_MAX_RETRIES"));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let config = EsiConfig {
            base_url: "not a url".to_string(),
            ..EsiConfig::default()
        };

        assert!(matches!(config.validate(), Err(EsiError::Config(_))));
    }

    #[test]
    fn test_deserialize_partial_config() {
        let config: EsiConfig = serde_json::from_str(
            r#"{"max_retries": 1, "cache": {"kind": "redis", "url": "redis://localhost"}}"#,
        )
        .unwrap();

        assert_eq!(config.max_retries, 1);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert!(matches!(config.cache, CacheBackend::Redis { .. }));
    }

    #[test]
    fn test_compliance_user_agent_format() {
        assert_eq!(
            compliance_user_agent("app", "1.2.3", "ops@example.org"),
            "app/1.2.3 (ops@example.org)"
        );
    }
}
