//! Runtime configuration read from the environment

use crate::state_machine::event::StartInfo;
use std::path::PathBuf;

/// Default delay before the deferred authenticator answers
const DEFAULT_AUTH_DELAY_MS: u64 = 50;

/// Configuration for a dialog session driven from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialogConfig {
    pub hostname: Option<String>,
    pub allow_persistent: bool,
    pub required_email: Option<String>,
    /// Scenario file to replay; the built-in demo runs when unset
    pub scenario_path: Option<PathBuf>,
    pub auth_delay_ms: u64,
}

impl Default for DialogConfig {
    fn default() -> Self {
        Self {
            hostname: None,
            allow_persistent: false,
            required_email: None,
            scenario_path: None,
            auth_delay_ms: DEFAULT_AUTH_DELAY_MS,
        }
    }
}

impl DialogConfig {
    /// Load configuration from environment variables
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        Self {
            hostname: non_empty("DIALOG_HOSTNAME"),
            allow_persistent: lookup("DIALOG_ALLOW_PERSISTENT")
                .is_some_and(|value| parse_flag(&value)),
            required_email: non_empty("DIALOG_REQUIRED_EMAIL"),
            scenario_path: non_empty("DIALOG_SCENARIO").map(PathBuf::from),
            auth_delay_ms: lookup("DIALOG_AUTH_DELAY_MS")
                .and_then(|value| value.trim().parse().ok())
                .unwrap_or(DEFAULT_AUTH_DELAY_MS),
        }
    }

    /// Payload for the `start` event this configuration describes
    #[must_use]
    pub fn start_info(&self) -> StartInfo {
        StartInfo {
            hostname: self.hostname.clone(),
            allow_persistent: self.allow_persistent,
            required_email: self.required_email.clone(),
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> DialogConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        DialogConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(config_from(&[]), DialogConfig::default());
    }

    #[test]
    fn test_reads_all_keys() {
        let config = config_from(&[
            ("DIALOG_HOSTNAME", "shop.example"),
            ("DIALOG_ALLOW_PERSISTENT", "true"),
            ("DIALOG_REQUIRED_EMAIL", "a@b.com"),
            ("DIALOG_SCENARIO", "/tmp/flow.json"),
            ("DIALOG_AUTH_DELAY_MS", "5"),
        ]);
        assert_eq!(config.hostname.as_deref(), Some("shop.example"));
        assert!(config.allow_persistent);
        assert_eq!(config.required_email.as_deref(), Some("a@b.com"));
        assert_eq!(config.scenario_path, Some(PathBuf::from("/tmp/flow.json")));
        assert_eq!(config.auth_delay_ms, 5);
    }

    #[test]
    fn test_flag_spellings() {
        for value in ["1", "true", "TRUE", "yes", " Yes "] {
            assert!(parse_flag(value), "{value} should enable");
        }
        for value in ["0", "false", "no", "", "on"] {
            assert!(!parse_flag(value), "{value} should not enable");
        }
    }

    #[test]
    fn test_blank_values_are_absent() {
        let config = config_from(&[("DIALOG_HOSTNAME", "  "), ("DIALOG_REQUIRED_EMAIL", "")]);
        assert_eq!(config.hostname, None);
        assert_eq!(config.required_email, None);
    }

    #[test]
    fn test_bad_delay_falls_back_to_default() {
        let config = config_from(&[("DIALOG_AUTH_DELAY_MS", "soon")]);
        assert_eq!(config.auth_delay_ms, DEFAULT_AUTH_DELAY_MS);
    }

    #[test]
    fn test_start_info_mirrors_config() {
        let config = config_from(&[
            ("DIALOG_HOSTNAME", "shop.example"),
            ("DIALOG_REQUIRED_EMAIL", "a@b.com"),
        ]);
        let info = config.start_info();
        assert_eq!(info.hostname.as_deref(), Some("shop.example"));
        assert!(!info.allow_persistent);
        assert_eq!(info.required_email.as_deref(), Some("a@b.com"));
    }
}
