//! # Run Configuration
//!
//! `Settings` collects everything the binary reads from the environment.
//! Values come from the process environment after `config/.env` has been
//! loaded with `dotenvy`; a missing file is not an error. Command-line flags
//! override individual fields after loading.

use std::env;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};

/// Default location of the dotenv file
pub const DEFAULT_ENV_FILE: &str = "config/.env";

/// Settings for one run
#[derive(Debug, Clone)]
pub struct Settings {
    /// API key for the chat completions endpoint; `None` selects offline mode
    pub openai_api_key: Option<String>,

    /// API root, without `/v1`
    pub openai_base_url: String,

    /// Model used for every completion
    pub model: String,

    /// WebDriver endpoint for dynamic rendering
    pub webdriver_url: String,

    /// Directory of the HTML cache
    pub cache_dir: PathBuf,

    /// Directory for exports and the log file
    pub output_dir: PathBuf,

    /// Client-side rate limit for model requests
    pub requests_per_minute: u32,

    /// OTLP collector, enables trace and metric export when set
    pub otlp_endpoint: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com".to_string(),
            model: "gpt-4o-mini".to_string(),
            webdriver_url: "http://localhost:4444".to_string(),
            cache_dir: PathBuf::from("data"),
            output_dir: PathBuf::from("outputs"),
            requests_per_minute: 60,
            otlp_endpoint: None,
        }
    }
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Settings {
    /// Load `config/.env` (if present) and read settings from the environment.
    pub fn from_env() -> Result<Self> {
        Self::from_env_file(DEFAULT_ENV_FILE)
    }

    /// Load the given dotenv file (if present) and read settings from the environment.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Self> {
        match dotenvy::from_path(path.as_ref()) {
            Ok(()) => debug!("Loaded environment from {}", path.as_ref().display()),
            Err(e) if e.not_found() => {}
            Err(e) => {
                return Err(Error::Config(format!(
                    "Failed to read {}: {}",
                    path.as_ref().display(),
                    e
                )));
            }
        }
        Self::from_vars()
    }

    fn from_vars() -> Result<Self> {
        let defaults = Settings::default();

        let requests_per_minute = match non_empty("BROCHURE_REQUESTS_PER_MINUTE") {
            Some(raw) => raw.trim().parse::<u32>().map_err(|e| {
                Error::Config(format!(
                    "BROCHURE_REQUESTS_PER_MINUTE must be a positive integer: {}",
                    e
                ))
            })?,
            None => defaults.requests_per_minute,
        };

        Ok(Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            openai_base_url: non_empty("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            model: non_empty("BROCHURE_MODEL").unwrap_or(defaults.model),
            webdriver_url: non_empty("WEBDRIVER_URL").unwrap_or(defaults.webdriver_url),
            cache_dir: non_empty("BROCHURE_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            output_dir: non_empty("BROCHURE_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            requests_per_minute,
            otlp_endpoint: non_empty("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Whether the run has to use the offline model
    pub fn is_offline(&self) -> bool {
        self.openai_api_key.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert!(settings.is_offline());
        assert_eq!(settings.model, "gpt-4o-mini");
        assert_eq!(settings.cache_dir, PathBuf::from("data"));
        assert_eq!(settings.output_dir, PathBuf::from("outputs"));
        assert_eq!(settings.requests_per_minute, 60);
    }

    #[test]
    fn test_missing_env_file_is_fine() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::from_env_file(dir.path().join("nope.env"));
        assert!(result.is_ok());
    }
}
