//! Configuration loading and config file resolution
//!
//! Settings come from a single TOML file. Every section is defaulted, so a
//! missing or partial file still yields a usable configuration.
//!
//! # Config file priority
//!
//! 1. Explicit path (command-line `--config`)
//! 2. `EDMW_CONFIG` environment variable
//! 3. Platform config dir (`~/.config/edmw/config.toml` on Linux)
//! 4. Built-in defaults (no file)
//!
//! Secrets (PAS client credentials, AI key) additionally resolve
//! ENV → TOML, see [`TomlConfig::apply_env_overrides`].

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_ENV_VAR: &str = "EDMW_CONFIG";
pub const PAS_CLIENT_ID_ENV_VAR: &str = "EDMW_PAS_CLIENT_ID";
pub const PAS_CLIENT_SECRET_ENV_VAR: &str = "EDMW_PAS_CLIENT_SECRET";
pub const AI_API_KEY_ENV_VAR: &str = "EDMW_AI_API_KEY";

/// Full configuration file model
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub pas: PasConfig,

    #[serde(default)]
    pub ai: AiConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub normalizer: NormalizerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Part Aggregation Service (remote part search) settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PasConfig {
    #[serde(default = "default_pas_api_url")]
    pub api_url: String,

    #[serde(default = "default_pas_auth_url")]
    pub auth_url: String,

    /// OAuth client id (ENV `EDMW_PAS_CLIENT_ID` wins)
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth client secret (ENV `EDMW_PAS_CLIENT_SECRET` wins)
    #[serde(default)]
    pub client_secret: Option<String>,

    #[serde(default = "default_provider_id")]
    pub provider_id: u32,

    #[serde(default = "default_provider_version")]
    pub provider_version: u32,

    #[serde(default = "default_scope")]
    pub scope: String,

    /// Maximum candidates kept per search
    #[serde(default = "default_max_matches")]
    pub max_matches: usize,

    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for PasConfig {
    fn default() -> Self {
        Self {
            api_url: default_pas_api_url(),
            auth_url: default_pas_auth_url(),
            client_id: None,
            client_secret: None,
            provider_id: default_provider_id(),
            provider_version: default_provider_version(),
            scope: default_scope(),
            max_matches: default_max_matches(),
            requests_per_second: default_requests_per_second(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl PasConfig {
    /// Both client credentials present and non-blank
    pub fn has_credentials(&self) -> bool {
        self.client_id.as_deref().is_some_and(is_valid_key)
            && self.client_secret.as_deref().is_some_and(is_valid_key)
    }
}

/// AI assist settings. No key means the assist is disabled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AiConfig {
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_ai_model")]
    pub model: String,

    #[serde(default = "default_ai_api_url")]
    pub api_url: String,

    #[serde(default = "default_ai_max_tokens")]
    pub max_tokens: u32,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_ai_model(),
            api_url: default_ai_api_url(),
            max_tokens: default_ai_max_tokens(),
        }
    }
}

impl AiConfig {
    pub fn is_enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(is_valid_key)
    }
}

/// Batch search settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Concurrent search workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Whole-row attempts before a row is recorded as `Error`
    #[serde(default = "default_max_row_attempts")]
    pub max_row_attempts: u32,

    /// Fixed delay between whole-row attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Manufacturer values treated as "no manufacturer"
    #[serde(default = "default_unknown_sentinels")]
    pub unknown_manufacturer_sentinels: Vec<String>,

    /// Similarity (0.0-1.0) below which a `Multiple` result needs review
    #[serde(default = "default_review_threshold")]
    pub review_threshold: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            max_row_attempts: default_max_row_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            unknown_manufacturer_sentinels: default_unknown_sentinels(),
            review_threshold: default_review_threshold(),
        }
    }
}

/// Manufacturer normalizer thresholds (scores are 0-100)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizerConfig {
    #[serde(default = "default_high_confidence")]
    pub high_confidence: u8,

    #[serde(default = "default_ambiguous_floor")]
    pub ambiguous_floor: u8,

    /// Fuzzy candidates handed to the AI assist
    #[serde(default = "default_top_n")]
    pub top_n: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            high_confidence: default_high_confidence(),
            ambiguous_floor: default_ambiguous_floor(),
            top_n: default_top_n(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_pas_api_url() -> String {
    "https://api.pas.partquest.com".to_string()
}
fn default_pas_auth_url() -> String {
    "https://samauth.us-east-1.sws.siemens.com/token".to_string()
}
fn default_provider_id() -> u32 {
    44
}
fn default_provider_version() -> u32 {
    2
}
fn default_scope() -> String {
    "sws.icarus.api.read".to_string()
}
fn default_max_matches() -> usize {
    10
}
fn default_requests_per_second() -> u32 {
    10
}
fn default_timeout_secs() -> u64 {
    60
}
fn default_ai_model() -> String {
    "claude-sonnet-4-5-20250929".to_string()
}
fn default_ai_api_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}
fn default_ai_max_tokens() -> u32 {
    1024
}
fn default_workers() -> usize {
    10
}
fn default_max_row_attempts() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    3000
}
fn default_unknown_sentinels() -> Vec<String> {
    vec!["Unknown".to_string()]
}
fn default_review_threshold() -> f64 {
    0.6
}
fn default_high_confidence() -> u8 {
    90
}
fn default_ambiguous_floor() -> u8 {
    60
}
fn default_top_n() -> usize {
    5
}

/// Validate a key or secret (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

impl TomlConfig {
    /// Overlay secrets from environment variables (ENV wins over TOML)
    pub fn apply_env_overrides(&mut self) {
        if let Some(id) = env_value(PAS_CLIENT_ID_ENV_VAR) {
            info!("PAS client id loaded from environment variable");
            self.pas.client_id = Some(id);
        }
        if let Some(secret) = env_value(PAS_CLIENT_SECRET_ENV_VAR) {
            info!("PAS client secret loaded from environment variable");
            self.pas.client_secret = Some(secret);
        }
        if let Some(key) = env_value(AI_API_KEY_ENV_VAR) {
            info!("AI API key loaded from environment variable");
            self.ai.api_key = Some(key);
        }
    }

    /// Check thresholds and sizes for values that would make the search unusable
    pub fn validate(&self) -> Result<()> {
        if self.search.workers == 0 {
            return Err(Error::Config("search.workers must be at least 1".to_string()));
        }
        if self.search.max_row_attempts == 0 {
            return Err(Error::Config(
                "search.max_row_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.search.review_threshold) {
            return Err(Error::Config(format!(
                "search.review_threshold must be within 0.0-1.0, got {}",
                self.search.review_threshold
            )));
        }
        if self.normalizer.high_confidence > 100 {
            return Err(Error::Config(format!(
                "normalizer.high_confidence must be within 0-100, got {}",
                self.normalizer.high_confidence
            )));
        }
        if self.normalizer.ambiguous_floor > self.normalizer.high_confidence {
            return Err(Error::Config(format!(
                "normalizer.ambiguous_floor ({}) exceeds high_confidence ({})",
                self.normalizer.ambiguous_floor, self.normalizer.high_confidence
            )));
        }
        if self.pas.requests_per_second == 0 {
            return Err(Error::Config(
                "pas.requests_per_second must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| is_valid_key(v))
}

/// Resolve the config file path following the documented priority order.
///
/// Returns `None` when no candidate file exists.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    // Priority 1: Command-line argument (used even if missing, so load reports it)
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    // Priority 3: Platform config dir
    default_config_path().filter(|p| p.exists())
}

/// Platform default config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("edmw").join("config.toml"))
}

/// Parse a TOML config file
pub fn read_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    let config: TomlConfig = toml::from_str(&content)?;
    Ok(config)
}

/// Load configuration with graceful degradation.
///
/// An explicitly requested file must exist and parse. A discovered file that
/// fails to parse is reported and replaced by defaults.
pub fn load_config(cli_arg: Option<&Path>) -> Result<TomlConfig> {
    let mut config = match resolve_config_path(cli_arg) {
        Some(path) if cli_arg.is_some() => {
            if !path.exists() {
                return Err(Error::NotFound(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
            read_toml_config(&path)?
        }
        Some(path) => match read_toml_config(&path) {
            Ok(config) => {
                info!("Configuration loaded from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "Config file {} unusable ({}), using built-in defaults",
                    path.display(),
                    e
                );
                TomlConfig::default()
            }
        },
        None => {
            warn!("No config file found, using built-in defaults");
            TomlConfig::default()
        }
    };

    config.apply_env_overrides();
    config.validate()?;
    Ok(config)
}

/// Write a config file atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let tmp_path = path.with_extension("toml.tmp");
    std::fs::write(&tmp_path, content)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = TomlConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.pas.provider_id, 44);
        assert_eq!(config.pas.provider_version, 2);
        assert_eq!(config.pas.max_matches, 10);
        assert_eq!(config.search.workers, 10);
        assert_eq!(config.search.max_row_attempts, 3);
        assert_eq!(config.search.retry_delay_ms, 3000);
        assert_eq!(config.search.unknown_manufacturer_sentinels, vec!["Unknown"]);
        assert_eq!(config.normalizer.high_confidence, 90);
        assert_eq!(config.normalizer.ambiguous_floor, 60);
        assert!(!config.ai.is_enabled());
        assert!(!config.pas.has_credentials());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: TomlConfig = toml::from_str(
            r#"
            [search]
            workers = 4

            [normalizer]
            high_confidence = 85
            "#,
        )
        .unwrap();

        assert_eq!(config.search.workers, 4);
        assert_eq!(config.search.max_row_attempts, 3);
        assert_eq!(config.normalizer.high_confidence, 85);
        assert_eq!(config.normalizer.ambiguous_floor, 60);
        assert_eq!(config.pas.api_url, "https://api.pas.partquest.com");
    }

    #[test]
    fn test_validate_rejects_inverted_band() {
        let mut config = TomlConfig::default();
        config.normalizer.ambiguous_floor = 95;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_workers() {
        let mut config = TomlConfig::default();
        config.search.workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_blank_credentials_are_not_credentials() {
        let mut pas = PasConfig::default();
        pas.client_id = Some("   ".to_string());
        pas.client_secret = Some("secret".to_string());
        assert!(!pas.has_credentials());

        pas.client_id = Some("id".to_string());
        assert!(pas.has_credentials());
    }
}
