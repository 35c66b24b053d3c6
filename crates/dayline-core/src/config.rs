use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the config file, token file and local stores
    pub config_dir: PathBuf,

    /// Calendar API and timeline layout
    #[serde(default)]
    pub calendar: CalendarConfig,

    /// Rendered event list cache policy
    #[serde(default)]
    pub cache: CacheConfig,

    /// Google OAuth settings
    #[serde(default)]
    pub google: GoogleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarConfig {
    /// Base URL of the Calendar v3 API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Hour of day shown at the top of the timeline
    #[serde(default = "default_start_hour")]
    pub start_hour: f64,

    /// Pixels per quarter hour
    #[serde(default = "default_scale")]
    pub scale: f64,
}

fn default_api_base_url() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_start_hour() -> f64 {
    7.0
}

fn default_scale() -> f64 {
    20.0
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            start_hour: default_start_hour(),
            scale: default_scale(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Drop the rendered list once the calendar day it was rendered for has passed
    #[serde(default = "default_expire_at_midnight")]
    pub expire_at_midnight: bool,
}

fn default_expire_at_midnight() -> bool {
    true
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            expire_at_midnight: default_expire_at_midnight(),
        }
    }
}

/// Google OAuth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleConfig {
    /// OAuth client ID
    /// Create at: https://console.cloud.google.com/apis/credentials
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Token revocation endpoint
    #[serde(default = "default_revoke_url")]
    pub revoke_url: String,
    /// Local port the OAuth redirect lands on
    #[serde(default = "default_callback_port")]
    pub callback_port: u16,
}

fn default_revoke_url() -> String {
    "https://oauth2.googleapis.com/revoke".to_string()
}

fn default_callback_port() -> u16 {
    8085
}

impl GoogleConfig {
    /// Check if credentials are configured (not placeholders)
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty()
            && !self.client_secret.is_empty()
            && !self.client_id.starts_with("YOUR_")
            && !self.client_secret.starts_with("YOUR_")
    }

    /// Sign-in needs real client credentials.
    pub fn require_configured(&self) -> std::result::Result<(), ConfigError> {
        if self.is_configured() {
            Ok(())
        } else {
            Err(ConfigError::MissingSetting("google.client_id".to_string()))
        }
    }
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_id: "YOUR_GOOGLE_CLIENT_ID".to_string(),
            client_secret: "YOUR_GOOGLE_CLIENT_SECRET".to_string(),
            revoke_url: default_revoke_url(),
            callback_port: default_callback_port(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dayline");

        Self {
            config_dir,
            calendar: CalendarConfig::default(),
            cache: CacheConfig::default(),
            google: GoogleConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, writing defaults there if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration from the default location and validate it
    pub fn load_validated() -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let path = Self::config_path()
            .map_err(|e| ConfigError::Invalid(format!("{:#}", e)))?;
        Self::load_validated_from(&path)
    }

    /// Returns an error if validation fails with critical errors; warnings are logged.
    pub fn load_validated_from(
        path: &Path,
    ) -> std::result::Result<(Self, ValidationResult), ConfigError> {
        let config = Self::load_from(path).map_err(load_error)?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()));
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        validate_url(
            &self.calendar.api_base_url,
            "calendar.api_base_url",
            &mut result,
        );
        validate_url(&self.google.revoke_url, "google.revoke_url", &mut result);

        if !(0.0..24.0).contains(&self.calendar.start_hour) {
            result.add_error(
                "calendar.start_hour",
                format!(
                    "Start hour must be within 0..24, got {}",
                    self.calendar.start_hour
                ),
            );
        }

        if !self.calendar.scale.is_finite() || self.calendar.scale <= 0.0 {
            result.add_error(
                "calendar.scale",
                format!(
                    "Scale must be a number greater than 0, got {}",
                    self.calendar.scale
                ),
            );
        } else if self.calendar.scale > 200.0 {
            result.add_warning("calendar.scale", "Scale is unusually large (>200)");
        }

        if self.google.callback_port == 0 {
            result.add_error("google.callback_port", "Port cannot be 0");
        }

        if !self.google.is_configured() {
            result.add_warning(
                "google",
                "Google OAuth not configured - sign-in will be unavailable",
            );
        }

        if !self.cache.expire_at_midnight {
            result.add_warning(
                "cache.expire_at_midnight",
                "Cached events are kept across days until a manual refresh",
            );
        }

        result
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Directory holding stored OAuth token sets
    pub fn token_dir(&self) -> PathBuf {
        self.config_dir.join("tokens")
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("dayline");

        Ok(config_dir.join("config.toml"))
    }
}

/// Malformed TOML is a parse error; any other load failure is an invalid setup.
fn load_error(e: anyhow::Error) -> ConfigError {
    if e.downcast_ref::<toml::de::Error>().is_some() {
        ConfigError::ParseError(format!("{:#}", e))
    } else {
        ConfigError::Invalid(format!("{:#}", e))
    }
}

fn validate_url(url_str: &str, field_name: &str, result: &mut ValidationResult) {
    match Url::parse(url_str) {
        Ok(url) => {
            if url.scheme() != "http" && url.scheme() != "https" {
                result.add_error(
                    field_name,
                    format!("URL must use http or https scheme, got: {}", url.scheme()),
                );
            }

            if url.host().is_none() {
                result.add_error(field_name, "URL must have a host");
            }
        }
        Err(e) => {
            result.add_error(field_name, format!("Invalid URL: {}", e));
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_valid_default_config() {
        let config = Config::default();
        let result = config.validate();
        assert!(
            result.is_valid(),
            "Default config should be valid: {:?}",
            result.errors
        );
    }

    #[test]
    fn test_default_layout_values() {
        let config = Config::default();
        assert_eq!(config.calendar.start_hour, 7.0);
        assert_eq!(config.calendar.scale, 20.0);
        assert!(config.cache.expire_at_midnight);
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = Config::default();
        config.calendar.api_base_url = "ftp://example.com".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_invalid_revoke_url() {
        let mut config = Config::default();
        config.google.revoke_url = "not-a-url".to_string();
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "google.revoke_url"));
    }

    #[test]
    fn test_start_hour_out_of_range() {
        let mut config = Config::default();
        config.calendar.start_hour = 24.0;
        let result = config.validate();
        assert!(result.errors.iter().any(|e| e.field == "calendar.start_hour"));
    }

    #[test]
    fn test_zero_scale() {
        let mut config = Config::default();
        config.calendar.scale = 0.0;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_non_finite_scale_is_rejected() {
        for scale in [f64::NAN, f64::INFINITY] {
            let mut config = Config::default();
            config.calendar.scale = scale;
            let result = config.validate();
            assert!(result.errors.iter().any(|e| e.field == "calendar.scale"));
        }
    }

    #[test]
    fn test_nan_start_hour_is_rejected() {
        let mut config = Config::default();
        config.calendar.start_hour = f64::NAN;
        assert!(!config.validate().is_valid());
    }

    #[test]
    fn test_unconfigured_google_is_missing_setting() {
        let err = GoogleConfig::default().require_configured().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingSetting(ref field) if field == "google.client_id"
        ));

        let google = GoogleConfig {
            client_id: "123.apps.googleusercontent.com".into(),
            client_secret: "shh".into(),
            ..Default::default()
        };
        assert!(google.require_configured().is_ok());
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "config_dir = [unterminated").unwrap();

        let err = Config::load_validated_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)), "got {:?}", err);
    }

    #[test]
    fn test_invalid_file_is_invalid_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
config_dir = "/tmp/dayline"

[calendar]
scale = nan
"#,
        )
        .unwrap();

        let err = Config::load_validated_from(&path).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("calendar.scale"), "{}", msg),
            other => panic!("expected invalid config, got {:?}", other),
        }
    }

    #[test]
    fn test_google_not_configured_is_warning() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "google"));
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.calendar.scale, 20.0);
    }

    #[test]
    fn test_partial_file_uses_section_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
config_dir = "/tmp/dayline"

[calendar]
start_hour = 8.0
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.calendar.start_hour, 8.0);
        assert_eq!(config.calendar.scale, 20.0);
        assert_eq!(config.google.callback_port, 8085);
        assert_eq!(config.token_dir(), PathBuf::from("/tmp/dayline/tokens"));
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
