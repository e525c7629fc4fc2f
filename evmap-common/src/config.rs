//! Bootstrap configuration loading
//!
//! Configuration file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable (`EVMAP_CONFIG`)
//! 3. User config file (`~/.config/evmap/<module>.toml`)
//! 4. System config file (`/etc/evmap/<module>.toml`)
//! 5. Compiled defaults (fallback)
//!
//! An explicitly named file (tiers 1-2) must exist. Default locations
//! (tiers 3-4) are skipped when absent.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "EVMAP_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// Every field has a default so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Discovery pipeline settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Per-source resilience settings
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Backend credentials (may also come from the environment)
    #[serde(default)]
    pub credentials: CredentialsConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// Discovery pipeline settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Result cap when the caller does not supply one
    #[serde(default = "default_max_results")]
    pub default_max_results: u32,

    /// Upper bound on each individual network attempt
    #[serde(default = "default_call_timeout_ms")]
    pub call_timeout_ms: u64,

    /// Offset used to resolve "today", "this week", ... into instants
    #[serde(default)]
    pub utc_offset_minutes: i32,

    /// Buffered events per EventBus subscriber
    #[serde(default = "default_event_bus_capacity")]
    pub event_bus_capacity: usize,
}

/// Resilience settings for both backends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub meetup: SourceConfig,
    #[serde(default)]
    pub eventbrite: SourceConfig,
}

/// Resilience settings for one backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Consecutive failures that open the breaker
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,

    /// Cooldown before an open breaker admits a probe
    #[serde(default = "default_recovery_timeout_secs")]
    pub recovery_timeout_secs: u64,

    /// Tries per call, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second try; doubles for each further try
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Politeness limit for outgoing requests
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    /// API base URL override (client default when absent)
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Backend credentials
///
/// Never logged or echoed back; see the redacted config view in the
/// discovery service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub meetup_client_id: Option<String>,
    #[serde(default)]
    pub meetup_redirect_uri: Option<String>,
    #[serde(default)]
    pub meetup_access_token: Option<String>,
    #[serde(default)]
    pub eventbrite_token: Option<String>,
}

fn default_port() -> u16 {
    5790
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_results() -> u32 {
    20
}

fn default_call_timeout_ms() -> u64 {
    10_000
}

fn default_event_bus_capacity() -> usize {
    100
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_requests_per_second() -> u32 {
    2
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            logging: LoggingConfig::default(),
            discovery: DiscoveryConfig::default(),
            sources: SourcesConfig::default(),
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            default_max_results: default_max_results(),
            call_timeout_ms: default_call_timeout_ms(),
            utc_offset_minutes: 0,
            event_bus_capacity: default_event_bus_capacity(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            meetup: SourceConfig::default(),
            eventbrite: SourceConfig::default(),
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            requests_per_second: default_requests_per_second(),
            base_url: None,
        }
    }
}

impl SourceConfig {
    pub fn recovery_timeout(&self) -> Duration {
        Duration::from_secs(self.recovery_timeout_secs)
    }

    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    fn validate(&self, name: &str) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(Error::Config(format!(
                "sources.{}.failure_threshold must be at least 1",
                name
            )));
        }
        if self.max_attempts == 0 {
            return Err(Error::Config(format!(
                "sources.{}.max_attempts must be at least 1",
                name
            )));
        }
        if self.requests_per_second == 0 {
            return Err(Error::Config(format!(
                "sources.{}.requests_per_second must be at least 1",
                name
            )));
        }
        Ok(())
    }
}

impl DiscoveryConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.call_timeout_ms)
    }
}

impl TomlConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Read TOML failed ({}): {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.discovery.default_max_results == 0 {
            return Err(Error::Config(
                "discovery.default_max_results must be at least 1".to_string(),
            ));
        }
        if self.discovery.event_bus_capacity == 0 {
            return Err(Error::Config(
                "discovery.event_bus_capacity must be at least 1".to_string(),
            ));
        }
        self.sources.meetup.validate("meetup")?;
        self.sources.eventbrite.validate("eventbrite")?;
        Ok(())
    }
}

/// Locate the configuration file for a module
///
/// Returns `None` when neither an explicit path nor a default-location file
/// exists; callers then use [`TomlConfig::default`].
pub fn resolve_config_path(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    module_name: &str,
) -> Option<PathBuf> {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3-4: default locations
    default_config_locations(module_name)
        .into_iter()
        .find(|path| path.exists())
}

/// Candidate config file locations for the platform, in priority order
pub fn default_config_locations(module_name: &str) -> Vec<PathBuf> {
    let file_name = format!("{}.toml", module_name);
    let mut locations = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        locations.push(dir.join("evmap").join(&file_name));
    }
    if cfg!(unix) {
        locations.push(PathBuf::from("/etc/evmap").join(&file_name));
    }

    locations
}

/// Resolve and load the bootstrap configuration
pub fn load_config(cli_arg: Option<&Path>, module_name: &str) -> Result<TomlConfig> {
    match resolve_config_path(cli_arg, CONFIG_ENV_VAR, module_name) {
        Some(path) => {
            info!("Loading configuration from {}", path.display());
            TomlConfig::load(&path)
        }
        None => {
            debug!("No configuration file found for {}, using defaults", module_name);
            Ok(TomlConfig::default())
        }
    }
}
