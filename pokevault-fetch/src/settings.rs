//! Pipeline settings, loaded from disk.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::{OptimizationConfig, RequestDefaults};
use crate::error::SettingsError;

/// Settings for the request client and its HTTP transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Base URL every request path is appended to.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Default request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// User agent sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Headers sent with every request; call-site headers win on conflict.
    #[serde(default)]
    pub default_headers: BTreeMap<String, String>,
    /// Log call starts.
    #[serde(default = "default_true")]
    pub log_requests: bool,
    /// Log call successes.
    #[serde(default = "default_true")]
    pub log_responses: bool,
    /// Library-default optimization settings.
    #[serde(default)]
    pub optimization: OptimizationConfig,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("Pokevault/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_true() -> bool {
    true
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
            default_headers: BTreeMap::new(),
            log_requests: true,
            log_responses: true,
            optimization: OptimizationConfig::default(),
        }
    }
}

impl PipelineSettings {
    /// Returns the default settings file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pokevault")
            .join("pipeline.json")
    }

    /// Loads settings from the default path.
    ///
    /// # Errors
    ///
    /// See [`PipelineSettings::load_from`].
    pub fn load() -> Result<Self, SettingsError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads settings from a specific path, falling back to defaults when absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// fails [`PipelineSettings::validate`].
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        if !path.exists() {
            debug!(path = %path.display(), "Settings file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;

        info!(path = %path.display(), base_url = %settings.base_url, "Loaded pipeline settings");
        Ok(settings)
    }

    /// Saves settings to a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub fn save_to(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        debug!(path = %path.display(), "Saved pipeline settings");
        Ok(())
    }

    /// Checks that the settings are usable.
    ///
    /// # Errors
    ///
    /// Returns an error for an unparsable or non-HTTP base URL, a zero
    /// timeout, or a zero batch size.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.parsed_base_url()?;
        if self.timeout_secs == 0 {
            return Err(SettingsError::Invalid("timeout_secs must be positive".into()));
        }
        if self.optimization.batch_size == 0 {
            return Err(SettingsError::Invalid("batch_size must be positive".into()));
        }
        Ok(())
    }

    /// Parses [`PipelineSettings::base_url`].
    ///
    /// # Errors
    ///
    /// Returns [`SettingsError::InvalidUrl`] if the URL cannot be parsed or
    /// is not `http`/`https`.
    pub fn parsed_base_url(&self) -> Result<Url, SettingsError> {
        let url = Url::parse(&self.base_url).map_err(|e| SettingsError::InvalidUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(SettingsError::InvalidUrl {
                url: self.base_url.clone(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        Ok(url)
    }

    /// Returns the library defaults these settings describe.
    pub fn request_defaults(&self) -> RequestDefaults {
        RequestDefaults {
            log_request: self.log_requests,
            log_response: self.log_responses,
            suppress_error_toast: false,
            optimization: self.optimization.clone(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = PipelineSettings::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings, PipelineSettings::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("pipeline.json");

        let mut settings = PipelineSettings::default();
        settings.base_url = "https://vault.example.com/api".into();
        settings.default_headers.insert("x-client".into(), "desktop".into());
        settings.optimization.batch_size = 25;
        settings.save_to(&path).unwrap();

        assert_eq!(PipelineSettings::load_from(&path).unwrap(), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        let partial =
            r#"{"base_url":"https://api.example.com","optimization":{"batch_delay_ms":5}}"#;
        std::fs::write(&path, partial).unwrap();

        let settings = PipelineSettings::load_from(&path).unwrap();
        assert_eq!(settings.timeout_secs, 30);
        assert_eq!(settings.optimization.batch_delay_ms, 5);
        assert_eq!(settings.optimization.batch_size, 10);
        assert!(settings.log_requests);
    }

    #[test]
    fn test_validate() {
        let mut settings = PipelineSettings::default();
        assert!(settings.validate().is_ok());

        settings.base_url = "ftp://files.example.com".into();
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidUrl { .. })
        ));

        settings.base_url = "https://api.example.com".into();
        settings.timeout_secs = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::Invalid(_))));
    }
}
