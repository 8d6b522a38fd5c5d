//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/briefsmith/) and project (.briefsmith/) level
//! configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::constants::{generation, input, retry};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// LLM provider settings
    pub llm: LlmConfig,

    /// Document publishing settings
    pub publish: PublishConfig,

    /// Input collaborator settings
    pub input: InputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            llm: LlmConfig::default(),
            publish: PublishConfig::default(),
            input: InputConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `BriefError::Config` on validation failure.
    pub fn validate(&self) -> crate::types::Result<()> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(crate::types::BriefError::Config(format!(
                "LLM temperature must be between 0.0 and 2.0, got {}",
                self.llm.temperature
            )));
        }

        if self.llm.timeout_secs == 0 {
            return Err(crate::types::BriefError::Config(
                "LLM timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.llm.max_attempts == 0 || self.llm.max_attempts > generation::MAX_ATTEMPTS_CEILING {
            return Err(crate::types::BriefError::Config(format!(
                "LLM max_attempts must be between 1 and {}, got {}",
                generation::MAX_ATTEMPTS_CEILING,
                self.llm.max_attempts
            )));
        }

        for (name, base) in [
            ("llm.api_base", &self.llm.api_base),
            ("publish.docs_api_base", &self.publish.docs_api_base),
            ("publish.drive_api_base", &self.publish.drive_api_base),
        ] {
            if let Some(base) = base
                && url::Url::parse(base).is_err()
            {
                return Err(crate::types::BriefError::Config(format!(
                    "{} is not a valid URL: {}",
                    name, base
                )));
            }
        }

        if self.publish.retry.base_delay_ms == 0 {
            return Err(crate::types::BriefError::Config(
                "publish retry base_delay_ms must be greater than 0".to_string(),
            ));
        }

        if self.input.max_chars == 0 {
            return Err(crate::types::BriefError::Config(
                "input max_chars must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// LLM Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider type (currently "openai")
    pub provider: String,
    /// Model identifier; any string the provider accepts
    pub model: String,
    /// API key. Never serialized to output for security.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Temperature for generation (0.0 = deterministic)
    pub temperature: f32,
    /// Attempt ceiling for the self-correction loop
    pub max_attempts: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: None,
            api_base: None,
            timeout_secs: generation::DEFAULT_TIMEOUT_SECS,
            temperature: 0.0,
            max_attempts: generation::DEFAULT_MAX_ATTEMPTS,
        }
    }
}

// =============================================================================
// Publish Configuration
// =============================================================================

/// Display labels for the two argument-case sections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaseNaming {
    /// Government / Opposition
    #[default]
    Parliamentary,
    /// Affirmative / Negative
    Policy,
}

impl CaseNaming {
    /// (first-side label, second-side label)
    pub fn labels(&self) -> (&'static str, &'static str) {
        match self {
            Self::Parliamentary => ("Government", "Opposition"),
            Self::Policy => ("Affirmative", "Negative"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// When false, publishing is an explicit no-op (not an error)
    pub enabled: bool,
    /// Target folder to search and create in; whole drive when absent
    pub folder_id: Option<String>,
    /// Path to a file holding a previously-obtained bearer token.
    /// A missing file is a fatal configuration error, not retried.
    pub token_file: Option<PathBuf>,
    /// Case-naming scheme for the rendered document
    pub case_naming: CaseNaming,
    /// Retry policy for remote calls
    pub retry: RetryConfig,
    /// Override API bases (tests point these at local fakes)
    pub docs_api_base: Option<String>,
    pub drive_api_base: Option<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            folder_id: None,
            token_file: None,
            case_naming: CaseNaming::default(),
            retry: RetryConfig::default(),
            docs_api_base: None,
            drive_api_base: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum retries per remote call (attempts = retries + 1)
    pub max_retries: u32,
    /// Base backoff delay in milliseconds; doubles each attempt
    pub base_delay_ms: u64,
    /// Delay cap in seconds
    pub max_delay_secs: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: retry::DEFAULT_MAX_RETRIES,
            base_delay_ms: retry::BASE_DELAY_MS,
            max_delay_secs: retry::MAX_DELAY_SECS,
        }
    }
}

// =============================================================================
// Input Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Length cap applied to raw note text before the pipeline sees it
    pub max_chars: usize,
    /// File extensions treated as notes
    pub extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            max_chars: input::MAX_INPUT_CHARS,
            extensions: input::NOTE_EXTENSIONS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_temperature_out_of_range() {
        let mut config = Config::default();
        config.llm.temperature = 3.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_attempts_bounds() {
        let mut config = Config::default();
        config.llm.max_attempts = 0;
        assert!(config.validate().is_err());
        config.llm.max_attempts = 99;
        assert!(config.validate().is_err());
        config.llm.max_attempts = 5;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_api_base_must_be_a_url() {
        let mut config = Config::default();
        config.llm.api_base = Some("not a url".to_string());
        assert!(config.validate().is_err());
        config.llm.api_base = Some("https://llm.internal/v1".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_case_naming_labels() {
        assert_eq!(
            CaseNaming::Parliamentary.labels(),
            ("Government", "Opposition")
        );
        assert_eq!(CaseNaming::Policy.labels(), ("Affirmative", "Negative"));
    }

    #[test]
    fn test_api_key_never_serialized() {
        let mut config = Config::default();
        config.llm.api_key = Some("sk-secret".to_string());
        let toml = toml::to_string(&config).unwrap();
        assert!(!toml.contains("sk-secret"));
    }
}
