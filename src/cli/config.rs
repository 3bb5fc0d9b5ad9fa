//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Current directory: ./reachout.toml or ./.reachout/config.toml
//! 2. User config: ~/.reachout/config.toml
//! 3. Built-in defaults

use crate::env;
use crate::llm::{
    BackendSettings, EvaluationConfig, ProviderKind, ProviderSetup, RateLimitConfig, RetryPolicy,
};
use crate::outreach::{ComposerTemplates, SendSchedule};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env as std_env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid TOML configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration file contents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// JSON file holding provider secrets; environment variables are used
    /// when unset.
    pub credentials_path: Option<PathBuf>,
    pub rate_limit: RateLimitSection,
    pub providers: ProvidersSection,
    pub evaluation: EvaluationSection,
    pub outreach: OutreachSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitSection {
    pub max_requests: usize,
    pub window_secs: u64,
}

impl Default for RateLimitSection {
    fn default() -> Self {
        let defaults = RateLimitConfig::default();
        Self {
            max_requests: defaults.max_requests,
            window_secs: defaults.window.as_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvidersSection {
    pub openai: ProviderSection,
    pub gemini: ProviderSection,
}

impl Default for ProvidersSection {
    fn default() -> Self {
        Self {
            openai: ProviderSection::defaults_for(ProviderKind::OpenAI),
            gemini: ProviderSection::defaults_for(ProviderKind::Gemini),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderSection {
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub retry: RetrySection,
}

impl ProviderSection {
    pub fn defaults_for(kind: ProviderKind) -> Self {
        let setup = ProviderSetup::default_for(kind);
        Self {
            model: setup.backend.model,
            base_url: setup.backend.base_url,
            timeout_secs: setup.backend.timeout.as_secs(),
            temperature: setup.backend.temperature,
            retry: RetrySection::from(&setup.retry),
        }
    }

    fn to_setup(&self) -> ProviderSetup {
        ProviderSetup {
            backend: BackendSettings {
                model: self.model.clone(),
                base_url: self.base_url.clone(),
                timeout: Duration::from_secs(self.timeout_secs),
                temperature: self.temperature,
            },
            retry: RetryPolicy {
                max_attempts: self.retry.max_attempts,
                base_delay: Duration::from_millis(self.retry.base_delay_ms),
                multiplier: self.retry.multiplier,
                max_delay: Duration::from_millis(self.retry.max_delay_ms),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
}

impl From<&RetryPolicy> for RetrySection {
    fn from(policy: &RetryPolicy) -> Self {
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay.as_millis() as u64,
            multiplier: policy.multiplier,
            max_delay_ms: policy.max_delay.as_millis() as u64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationSection {
    pub concurrent_candidates: bool,
    pub verify_selection: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutreachSection {
    pub provider: ProviderKind,
    pub student_info: String,
    pub attachment_path: Option<PathBuf>,
    pub query_templates: Vec<String>,
    pub schedule: SendSchedule,
    pub templates: ComposerTemplates,
}

impl Default for OutreachSection {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Gemini,
            student_info: String::new(),
            attachment_path: None,
            query_templates: vec!["{name} recent research publications".to_string()],
            schedule: SendSchedule::default(),
            templates: ComposerTemplates::default(),
        }
    }
}

impl AppConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        fs::write(path, self.to_toml_string()?).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_requests must be at least 1".to_string(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.window_secs must be at least 1".to_string(),
            ));
        }
        for (name, section) in [
            ("openai", &self.providers.openai),
            ("gemini", &self.providers.gemini),
        ] {
            if section.retry.max_attempts == 0 {
                return Err(ConfigError::Invalid(format!(
                    "providers.{name}.retry.max_attempts must be at least 1"
                )));
            }
            if section.base_url.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "providers.{name}.base_url must not be empty"
                )));
            }
        }
        Ok(())
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit.max_requests,
            window: Duration::from_secs(self.rate_limit.window_secs),
        }
    }

    pub fn provider_setups(&self) -> HashMap<ProviderKind, ProviderSetup> {
        HashMap::from([
            (ProviderKind::OpenAI, self.providers.openai.to_setup()),
            (ProviderKind::Gemini, self.providers.gemini.to_setup()),
        ])
    }

    pub fn evaluation_config(&self) -> EvaluationConfig {
        EvaluationConfig {
            concurrent_candidates: self.evaluation.concurrent_candidates,
            verify_selection: self.evaluation.verify_selection,
        }
    }

    /// Credentials file to use: explicit setting, else `~/.reachout/api_keys.json`
    /// when present.
    pub fn resolved_credentials_path(&self) -> Option<PathBuf> {
        self.credentials_path.clone().or_else(|| {
            ConfigDiscovery::get_home_dir()
                .map(|home| env::user_credentials_file_path(&home))
                .filter(|path| path.is_file())
        })
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Discover and load configuration using the hierarchy
    pub fn discover_config() -> Result<AppConfig, ConfigError> {
        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            return AppConfig::from_toml_file(config_path);
        }

        info!("No configuration file found, using defaults");
        Ok(AppConfig::default())
    }

    /// Load the override when given, otherwise discover.
    pub fn load(config_override: Option<&Path>) -> Result<AppConfig, ConfigError> {
        match config_override {
            Some(path) => {
                info!("Loading configuration override from: {:?}", path);
                AppConfig::from_toml_file(path)
            }
            None => Self::discover_config(),
        }
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        for candidate in Self::get_config_candidates() {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Ok(current_dir) = std_env::current_dir() {
            candidates.push(current_dir.join(env::LOCAL_CONFIG_FILE_NAME));
            candidates.push(env::local_config_file_path(&current_dir));
        }

        if let Some(home_dir) = Self::get_home_dir() {
            candidates.push(env::user_config_file_path(&home_dir));
        }

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        for (i, candidate) in Self::get_config_candidates().iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "✓ EXISTS"
                } else {
                    "✗ NOT A FILE"
                }
            } else {
                "✗ NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}
