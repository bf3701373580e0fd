//! Configuration for the permission lifecycle
//!
//! Everything has a default except the application id, which the settings
//! page needs. Configuration can be built in code or loaded from JSON,
//! by default from `<config_dir>/<app>/camgate.json`.

use camgate_api::{Capability, OsVersionBucket, RequestToken};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::host::SettingsTarget;
use crate::resolver::CapabilityPolicy;

/// Correlation code for the OS permission request
pub const DEFAULT_REQUEST_CODE: i32 = 100;

/// Correlation code for the settings page launch
pub const DEFAULT_SETTINGS_CODE: i32 = 101;

/// API level assumed when the host does not report one (Android 14)
pub const DEFAULT_API_LEVEL: u32 = 34;

/// File name looked up under the per-app config directory
pub const CONFIG_FILE_NAME: &str = "camgate.json";

/// Error type for configuration loading and validation
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Missing component: {0}")]
    MissingComponent(&'static str),
}

/// Permission lifecycle configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PermissionConfig {
    /// Package id used to address the application settings page
    pub application_id: String,
    /// Correlation code for OS permission requests
    pub request_code: i32,
    /// Correlation code for settings page launches
    pub settings_code: i32,
    /// Host OS API level
    pub api_level: u32,
    /// Re-request as soon as the user dismisses a rationale
    pub retry_after_rationale: bool,
    /// Capability sets per OS version bucket
    pub policy: CapabilityPolicy,
}

impl Default for PermissionConfig {
    fn default() -> Self {
        Self {
            application_id: String::new(),
            request_code: DEFAULT_REQUEST_CODE,
            settings_code: DEFAULT_SETTINGS_CODE,
            api_level: DEFAULT_API_LEVEL,
            retry_after_rationale: true,
            policy: CapabilityPolicy::default(),
        }
    }
}

impl PermissionConfig {
    /// Create a configuration with defaults for the given application
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            ..Self::default()
        }
    }

    /// Set the host API level
    pub fn with_api_level(mut self, api_level: u32) -> Self {
        self.api_level = api_level;
        self
    }

    /// Set the capability policy
    pub fn with_policy(mut self, policy: CapabilityPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_retry_after_rationale(mut self, retry: bool) -> Self {
        self.retry_after_rationale = retry;
        self
    }

    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Load from `path` if it exists, otherwise use defaults for `application_id`
    pub fn load_or_default(
        path: impl AsRef<Path>,
        application_id: &str,
    ) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No configuration file, using defaults");
            Ok(Self::new(application_id))
        }
    }

    /// Default configuration path for an application
    pub fn default_path(app_name: &str) -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(app_name)
            .join(CONFIG_FILE_NAME)
    }

    /// Check the configuration for inconsistencies
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.application_id.trim().is_empty() {
            return Err(ConfigError::Invalid("application_id must be set".into()));
        }
        if self.request_code == self.settings_code {
            return Err(ConfigError::Invalid(format!(
                "request_code and settings_code must differ (both {})",
                self.request_code
            )));
        }
        self.policy.validate()
    }

    pub fn request_token(&self) -> RequestToken {
        RequestToken(self.request_code)
    }

    pub fn settings_token(&self) -> RequestToken {
        RequestToken(self.settings_code)
    }

    pub fn settings_target(&self) -> SettingsTarget {
        SettingsTarget::for_application(&self.application_id)
    }

    pub fn bucket(&self) -> OsVersionBucket {
        self.policy.bucket_for(self.api_level)
    }

    /// Capabilities required on this host
    pub fn required_capabilities(&self) -> Vec<Capability> {
        self.policy.resolve(self.bucket())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PermissionConfig::new("app.example.scanner");
        assert!(config.validate().is_ok());
        assert_eq!(config.request_token(), RequestToken(100));
        assert_eq!(config.settings_token(), RequestToken(101));
        assert_eq!(config.bucket(), OsVersionBucket::Current);
        assert_eq!(config.required_capabilities(), vec![Capability::Camera]);
        assert_eq!(
            config.settings_target().uri(),
            "package:app.example.scanner"
        );
    }

    #[test]
    fn test_legacy_host_requires_storage() {
        let config = PermissionConfig::new("app.example.scanner").with_api_level(28);
        assert_eq!(config.bucket(), OsVersionBucket::Legacy);
        assert_eq!(
            config.required_capabilities(),
            vec![Capability::Camera, Capability::STORAGE]
        );
    }

    #[test]
    fn test_parse_partial_json() {
        let json = r#"{
            "application_id": "app.example.scanner",
            "api_level": 30,
            "policy": { "mid_max_api_level": 31 }
        }"#;
        let config = PermissionConfig::from_json_str(json).unwrap();

        assert_eq!(config.api_level, 30);
        assert_eq!(config.request_code, DEFAULT_REQUEST_CODE);
        assert_eq!(config.policy.mid_max_api_level, 31);
        assert_eq!(config.policy.legacy_max_api_level, 28);
        assert_eq!(
            config.required_capabilities(),
            vec![Capability::Camera, Capability::STORAGE_READ]
        );
    }

    #[test]
    fn test_missing_application_id() {
        let err = PermissionConfig::from_json_str("{}").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_same_codes_rejected() {
        let json = r#"{"application_id": "a.b", "request_code": 7, "settings_code": 7}"#;
        let err = PermissionConfig::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("must differ"));
    }

    #[test]
    fn test_malformed_json() {
        let err = PermissionConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_default_path() {
        let path = PermissionConfig::default_path("scanner");
        assert!(path.ends_with("scanner/camgate.json"));
    }
}
