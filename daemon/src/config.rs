//! Daemon configuration with TOML file support.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use ballot_ledger::{CandidateRegistration, LedgerPolicy};

use crate::error::DaemonError;

/// Configuration for `ballotd`.
///
/// Loaded from a TOML file via [`DaemonConfig::from_toml_file`]; command-line
/// flags override individual fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Directory holding the ledger snapshot.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Administrator recorded by `init` when none is given on the command line.
    #[serde(default)]
    pub administrator: Option<String>,

    /// Creators authorized by `init`.
    #[serde(default)]
    pub authorized_creators: Vec<String>,

    /// `"open"` or `"creator_only"`.
    #[serde(default)]
    pub candidate_registration: CandidateRegistration,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./ballot_data")
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl DaemonConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &Path) -> Result<Self, DaemonError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaemonError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, DaemonError> {
        toml::from_str(s).map_err(|e| DaemonError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, DaemonError> {
        toml::to_string_pretty(self).map_err(|e| DaemonError::Config(e.to_string()))
    }

    pub fn policy(&self) -> LedgerPolicy {
        LedgerPolicy {
            candidate_registration: self.candidate_registration,
        }
    }

    /// Path of the snapshot file inside `data_dir`.
    pub fn ledger_path(&self) -> PathBuf {
        self.data_dir.join("ledger.bin")
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            administrator: None,
            authorized_creators: Vec::new(),
            candidate_registration: CandidateRegistration::default(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = DaemonConfig {
            administrator: Some("0xadmin".into()),
            authorized_creators: vec!["0xalice".into()],
            ..DaemonConfig::default()
        };
        let toml_str = config.to_toml_string().unwrap();
        let parsed = DaemonConfig::from_toml_str(&toml_str).expect("should parse");
        assert_eq!(parsed, config);
    }

    #[test]
    fn minimal_toml_uses_defaults() {
        let config = DaemonConfig::from_toml_str("").expect("empty toml should use defaults");
        assert_eq!(config, DaemonConfig::default());
        assert_eq!(config.ledger_path(), PathBuf::from("./ballot_data/ledger.bin"));
        assert_eq!(config.policy(), LedgerPolicy::default());
    }

    #[test]
    fn partial_toml_overrides() {
        let toml = r#"
            data_dir = "/var/lib/ballot"
            candidate_registration = "creator_only"
            authorized_creators = ["0xalice", "0xbob"]
        "#;
        let config = DaemonConfig::from_toml_str(toml).expect("should parse");
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/ballot"));
        assert_eq!(
            config.policy().candidate_registration,
            CandidateRegistration::CreatorOnly
        );
        assert_eq!(config.authorized_creators.len(), 2);
        assert_eq!(config.log_format, "human"); // default
    }

    #[test]
    fn unknown_registration_mode_is_rejected() {
        let result = DaemonConfig::from_toml_str(r#"candidate_registration = "anyone""#);
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }

    #[test]
    fn missing_file_returns_config_error() {
        let result = DaemonConfig::from_toml_file(Path::new("/nonexistent/ballotd.toml"));
        assert!(matches!(result, Err(DaemonError::Config(_))));
    }
}
