//! CLI-only settings layered on top of [`ClientConfig`].
//!
//! # Environment Variables
//!
//! - `CARTIFY_STORAGE_PATH` - Session/cart file (default: `$HOME/.cartify/storage.json`)
//! - `SENTRY_DSN` - Sentry DSN for error tracking (optional)
//! - `SENTRY_ENVIRONMENT` - Environment name reported to Sentry (optional)

use std::path::PathBuf;

use cartify_client::{ClientConfig, ConfigError};
use secrecy::SecretString;

/// Everything the CLI needs before it can build a context.
#[derive(Debug)]
pub struct Settings {
    pub client: ClientConfig,
    pub storage_path: PathBuf,
    pub sentry_dsn: Option<SecretString>,
    pub sentry_environment: Option<String>,
}

impl Settings {
    /// Load `.env`, then read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is invalid, or if neither
    /// `CARTIFY_STORAGE_PATH` nor `HOME` is set.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client = ClientConfig::from_env()?;
        Self::from_lookup(client, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(client: ClientConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let storage_path = match non_empty("CARTIFY_STORAGE_PATH") {
            Some(path) => PathBuf::from(path),
            None => non_empty("HOME")
                .map(|home| PathBuf::from(home).join(".cartify").join("storage.json"))
                .ok_or_else(|| ConfigError::MissingEnvVar("HOME".to_string()))?,
        };

        Ok(Self {
            client,
            storage_path,
            sentry_dsn: non_empty("SENTRY_DSN").map(SecretString::from),
            sentry_environment: non_empty("SENTRY_ENVIRONMENT"),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Settings::from_lookup(ClientConfig::default(), |key| vars.get(key).cloned())
    }

    #[test]
    fn test_storage_path_defaults_under_home() {
        let settings = load(&[("HOME", "/home/ada")]).unwrap();
        assert_eq!(
            settings.storage_path,
            PathBuf::from("/home/ada/.cartify/storage.json")
        );
        assert!(settings.sentry_dsn.is_none());
    }

    #[test]
    fn test_explicit_storage_path_wins() {
        let settings = load(&[("HOME", "/home/ada"), ("CARTIFY_STORAGE_PATH", "/tmp/c.json")]).unwrap();
        assert_eq!(settings.storage_path, PathBuf::from("/tmp/c.json"));
    }

    #[test]
    fn test_missing_home() {
        assert!(matches!(load(&[]), Err(ConfigError::MissingEnvVar(v)) if v == "HOME"));
    }
}
