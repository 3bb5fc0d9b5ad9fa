//! Provider credential loading.
//!
//! Credentials come from a JSON object file (`{"OPENAI_API_KEY": "...",
//! "GEMINI_API_KEY": "..."}`) or from environment variables of the same names.
//! Every provider key is required; a missing key is a fatal startup error.

use crate::llm::{LLMError, ProviderKind};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use tracing::{debug, info};

/// Provider secrets, loaded once and immutable afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    secrets: HashMap<String, String>,
}

impl Credentials {
    /// Load from a JSON object file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, LLMError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LLMError::CredentialLoad(format!("cannot read {}: {}", path.display(), e))
        })?;
        let credentials = Self::from_json_str(&content)?;
        info!("Loaded provider credentials from {:?}", path);
        Ok(credentials)
    }

    pub fn from_json_str(content: &str) -> Result<Self, LLMError> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_str(content)
            .map_err(|e| LLMError::CredentialLoad(format!("malformed credentials JSON: {e}")))?;

        let secrets = raw
            .into_iter()
            .filter_map(|(key, value)| value.as_str().map(|s| (key, s.to_string())))
            .collect();

        Self::from_map(secrets)
    }

    /// Read every provider key from the process environment.
    pub fn from_env() -> Result<Self, LLMError> {
        let secrets = ProviderKind::ALL
            .iter()
            .filter_map(|kind| {
                let key = kind.credential_key();
                std::env::var(key).ok().map(|value| (key.to_string(), value))
            })
            .collect();

        let credentials = Self::from_map(secrets)?;
        debug!("Loaded provider credentials from environment");
        Ok(credentials)
    }

    /// Validate that every provider has a non-empty secret.
    pub fn from_map(secrets: HashMap<String, String>) -> Result<Self, LLMError> {
        let missing: Vec<&str> = ProviderKind::ALL
            .iter()
            .map(|kind| kind.credential_key())
            .filter(|key| secrets.get(*key).is_none_or(|v| v.trim().is_empty()))
            .collect();

        if !missing.is_empty() {
            return Err(LLMError::CredentialLoad(format!(
                "missing required key(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self { secrets })
    }

    pub fn secret_for(&self, provider: ProviderKind) -> Option<&str> {
        self.get(provider.credential_key())
    }

    /// Raw lookup, also used for collaborator keys stored alongside providers.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.secrets.get(key).map(String::as_str)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&String> = self.secrets.keys().collect();
        keys.sort();
        f.debug_struct("Credentials")
            .field("keys", &keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_both_provider_keys_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"OPENAI_API_KEY": "sk-test", "GEMINI_API_KEY": "gm-test", "BREVO_API_KEY": "br"}}"#
        )
        .unwrap();

        let credentials = Credentials::from_json_file(file.path()).unwrap();
        assert_eq!(credentials.secret_for(ProviderKind::OpenAI), Some("sk-test"));
        assert_eq!(credentials.secret_for(ProviderKind::Gemini), Some("gm-test"));
        assert_eq!(credentials.get("BREVO_API_KEY"), Some("br"));
    }

    #[test]
    fn missing_key_is_a_credential_error() {
        let err = Credentials::from_json_str(r#"{"OPENAI_API_KEY": "sk-test"}"#).unwrap_err();
        match err {
            LLMError::CredentialLoad(msg) => assert!(msg.contains("GEMINI_API_KEY")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_secret_counts_as_missing() {
        let result =
            Credentials::from_json_str(r#"{"OPENAI_API_KEY": " ", "GEMINI_API_KEY": "gm"}"#);
        assert!(matches!(result, Err(LLMError::CredentialLoad(_))));
    }

    #[test]
    fn unreadable_file_is_a_credential_error() {
        let result = Credentials::from_json_file("/nonexistent/reachout/keys.json");
        assert!(matches!(result, Err(LLMError::CredentialLoad(_))));
    }

    #[test]
    fn malformed_json_is_a_credential_error() {
        let result = Credentials::from_json_str("not json");
        assert!(matches!(result, Err(LLMError::CredentialLoad(_))));
    }

    #[test]
    fn debug_output_hides_secrets() {
        let credentials = Credentials::from_json_str(
            r#"{"OPENAI_API_KEY": "sk-secret", "GEMINI_API_KEY": "gm-secret"}"#,
        )
        .unwrap();
        let rendered = format!("{credentials:?}");
        assert!(rendered.contains("OPENAI_API_KEY"));
        assert!(!rendered.contains("sk-secret"));
        assert!(!rendered.contains("gm-secret"));
    }

    #[test]
    #[serial]
    fn loads_from_environment() {
        // SAFETY: serialized with every other env-mutating test.
        unsafe {
            std::env::set_var("OPENAI_API_KEY", "sk-env");
            std::env::set_var("GEMINI_API_KEY", "gm-env");
        }

        let credentials = Credentials::from_env().unwrap();
        assert_eq!(credentials.secret_for(ProviderKind::OpenAI), Some("sk-env"));

        unsafe {
            std::env::remove_var("GEMINI_API_KEY");
        }
        assert!(matches!(
            Credentials::from_env(),
            Err(LLMError::CredentialLoad(_))
        ));

        unsafe {
            std::env::remove_var("OPENAI_API_KEY");
        }
    }
}
