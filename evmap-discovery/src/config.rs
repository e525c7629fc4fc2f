//! Credential resolution and the redacted configuration view
//!
//! Provides two-tier credential resolution with ENV → TOML priority.
//! Blank values count as absent.

use evmap_common::config::{SourceConfig, TomlConfig};
use serde::Serialize;
use tracing::{info, warn};

pub const MEETUP_ACCESS_TOKEN_ENV: &str = "EVMAP_MEETUP_ACCESS_TOKEN";
pub const MEETUP_CLIENT_ID_ENV: &str = "EVMAP_MEETUP_CLIENT_ID";
pub const EVENTBRITE_TOKEN_ENV: &str = "EVMAP_EVENTBRITE_TOKEN";

/// Redirect URI registered for the Meetup OAuth client when none is configured
pub const DEFAULT_MEETUP_REDIRECT_URI: &str = "http://localhost:8080/";

/// Credentials after resolution
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub meetup_client_id: Option<String>,
    pub meetup_redirect_uri: String,
    pub meetup_access_token: Option<String>,
    pub eventbrite_token: Option<String>,
}

// Secrets stay out of logs even at debug level
impl std::fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCredentials")
            .field("meetup_client_id", &self.meetup_client_id.as_deref().map(redact_id))
            .field("meetup_redirect_uri", &self.meetup_redirect_uri)
            .field("meetup_access_token", &set_or_not(&self.meetup_access_token))
            .field("eventbrite_token", &set_or_not(&self.eventbrite_token))
            .finish()
    }
}

/// Validate a credential value (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Resolve one credential
///
/// **Priority:** ENV → TOML
pub fn resolve_credential(name: &str, env_var: &str, toml_value: Option<&str>) -> Option<String> {
    let env_value = std::env::var(env_var).ok().filter(|v| is_valid_key(v));
    let toml_value = toml_value.filter(|v| is_valid_key(v));

    if env_value.is_some() && toml_value.is_some() {
        warn!(
            "{} found in multiple sources: environment, TOML. Using environment (highest priority).",
            name
        );
    }

    if let Some(value) = env_value {
        info!("{} loaded from environment variable", name);
        return Some(value.trim().to_string());
    }

    if let Some(value) = toml_value {
        info!("{} loaded from TOML config", name);
        return Some(value.trim().to_string());
    }

    None
}

/// Resolve every backend credential
pub fn resolve_credentials(config: &TomlConfig) -> ResolvedCredentials {
    let creds = &config.credentials;

    let resolved = ResolvedCredentials {
        meetup_client_id: resolve_credential(
            "Meetup client id",
            MEETUP_CLIENT_ID_ENV,
            creds.meetup_client_id.as_deref(),
        ),
        meetup_redirect_uri: creds
            .meetup_redirect_uri
            .as_deref()
            .filter(|v| is_valid_key(v))
            .unwrap_or(DEFAULT_MEETUP_REDIRECT_URI)
            .trim()
            .to_string(),
        meetup_access_token: resolve_credential(
            "Meetup access token",
            MEETUP_ACCESS_TOKEN_ENV,
            creds.meetup_access_token.as_deref(),
        ),
        eventbrite_token: resolve_credential(
            "Eventbrite token",
            EVENTBRITE_TOKEN_ENV,
            creds.eventbrite_token.as_deref(),
        ),
    };

    if resolved.meetup_access_token.is_none() {
        warn!(
            "No Meetup access token - authentication required. Set {} or use get_auth_setup_url.",
            MEETUP_ACCESS_TOKEN_ENV
        );
    }
    if resolved.eventbrite_token.is_none() {
        warn!("No Eventbrite token - set {}", EVENTBRITE_TOKEN_ENV);
    }

    resolved
}

/// Effective configuration as served by the config resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigView {
    pub port: u16,
    pub bind_address: String,
    pub log_level: String,
    pub default_max_results: u32,
    pub call_timeout_ms: u64,
    pub utc_offset_minutes: i32,
    pub meetup: SourceConfig,
    pub eventbrite: SourceConfig,
    pub credentials: CredentialsView,
}

/// Credentials with secrets redacted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialsView {
    pub meetup_client_id: Option<String>,
    pub meetup_redirect_uri: String,
    pub meetup_access_token: &'static str,
    pub eventbrite_token: &'static str,
}

impl ConfigView {
    pub fn new(config: &TomlConfig, credentials: &ResolvedCredentials) -> Self {
        Self {
            port: config.port,
            bind_address: config.bind_address.clone(),
            log_level: config.logging.level.clone(),
            default_max_results: config.discovery.default_max_results,
            call_timeout_ms: config.discovery.call_timeout_ms,
            utc_offset_minutes: config.discovery.utc_offset_minutes,
            meetup: config.sources.meetup.clone(),
            eventbrite: config.sources.eventbrite.clone(),
            credentials: CredentialsView {
                meetup_client_id: credentials.meetup_client_id.as_deref().map(redact_id),
                meetup_redirect_uri: credentials.meetup_redirect_uri.clone(),
                meetup_access_token: set_or_not(&credentials.meetup_access_token),
                eventbrite_token: set_or_not(&credentials.eventbrite_token),
            },
        }
    }
}

/// First 8 characters followed by `...`
pub fn redact_id(id: &str) -> String {
    let prefix: String = id.chars().take(8).collect();
    format!("{}...", prefix)
}

fn set_or_not(value: &Option<String>) -> &'static str {
    if value.is_some() {
        "set"
    } else {
        "not set"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_key() {
        assert!(is_valid_key("abc"));
        assert!(!is_valid_key(""));
        assert!(!is_valid_key(" \t"));
    }

    #[test]
    fn test_redact_id() {
        assert_eq!(redact_id("abcdefghijkl"), "abcdefgh...");
        assert_eq!(redact_id("abc"), "abc...");
    }

    #[test]
    fn test_view_hides_secrets() {
        let config = TomlConfig::default();
        let credentials = ResolvedCredentials {
            meetup_client_id: Some("client-123456789".to_string()),
            meetup_redirect_uri: DEFAULT_MEETUP_REDIRECT_URI.to_string(),
            meetup_access_token: Some("secret-token".to_string()),
            eventbrite_token: None,
        };

        let view = ConfigView::new(&config, &credentials);
        let json = serde_json::to_string(&view).unwrap();

        assert!(!json.contains("secret-token"));
        assert!(!json.contains("client-123456789"));
        assert_eq!(view.credentials.meetup_client_id.as_deref(), Some("client-1..."));
        assert_eq!(view.credentials.meetup_access_token, "set");
        assert_eq!(view.credentials.eventbrite_token, "not set");
    }

    #[test]
    fn test_debug_hides_secrets() {
        let credentials = ResolvedCredentials {
            meetup_access_token: Some("secret-token".to_string()),
            ..ResolvedCredentials::default()
        };
        assert!(!format!("{:?}", credentials).contains("secret-token"));
    }
}
