//! Configuration for evaluation runs
//!
//! Loads matching, normalization, and report settings from TOML files and
//! provides runtime defaults.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub normalize: NormalizeConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

/// Record alignment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Dotted path of the record id field; position is used when absent
    #[serde(default = "default_id_field")]
    pub id_field: String,
    /// What to do with gold records that have no candidate counterpart
    #[serde(default)]
    pub unmatched: UnmatchedPolicy,
    /// Candidate top-level key aliases (extracted name -> gold schema name)
    #[serde(default)]
    pub field_aliases: HashMap<String, String>,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            id_field: default_id_field(),
            unmatched: UnmatchedPolicy::default(),
            field_aliases: HashMap::new(),
        }
    }
}

/// Policy for gold records without a matched candidate record.
///
/// `Drop` scores only the intersection; `ScoreAsMiss` counts every gold-valued
/// field of the unmatched record as a mismatch. The choice materially changes
/// reported accuracy for candidates with partial extraction failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnmatchedPolicy {
    #[default]
    Drop,
    ScoreAsMiss,
}

/// Text normalization applied before comparing string values.
///
/// All knobs default to off: exact equality is the baseline policy.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct NormalizeConfig {
    #[serde(default)]
    pub fold_case: bool,
    #[serde(default)]
    pub trim: bool,
    #[serde(default)]
    pub strip_punctuation: bool,
}

/// Report rendering settings
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Maximum mismatch record ids shown per field; 0 means unlimited.
    /// Display-only; the underlying report always keeps the full list.
    #[serde(default)]
    pub mismatch_limit: usize,
}

impl ReportConfig {
    pub fn display_limit(&self) -> Option<usize> {
        if self.mismatch_limit > 0 {
            Some(self.mismatch_limit)
        } else {
            None
        }
    }
}

fn default_id_field() -> String {
    "record_id".to_string()
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a default config location or return defaults
    pub fn load_or_default() -> Self {
        let config_paths = ["eval.toml", "config/eval.toml"];

        for path in &config_paths {
            if let Ok(config) = Self::from_file(path) {
                tracing::info!("loaded configuration from {}", path);
                return config;
            }
        }

        tracing::info!("using default configuration");
        Self::default()
    }

    /// Save configuration to a TOML file
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))?;
        fs::write(path, content).map_err(|e| ConfigError::Io(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.matching.id_field, "record_id");
        assert_eq!(config.matching.unmatched, UnmatchedPolicy::Drop);
        assert!(!config.normalize.fold_case);
        assert_eq!(config.report.display_limit(), None);
    }

    #[test]
    fn test_parse_toml_config() {
        let toml = r#"
[matching]
id_field = "patient.record_id"
unmatched = "score-as-miss"

[matching.field_aliases]
policy = "policy_details"

[normalize]
fold_case = true
trim = true

[report]
mismatch_limit = 10
"#;
        let config = Config::from_toml(toml).unwrap();
        assert_eq!(config.matching.id_field, "patient.record_id");
        assert_eq!(config.matching.unmatched, UnmatchedPolicy::ScoreAsMiss);
        assert_eq!(
            config.matching.field_aliases.get("policy").map(String::as_str),
            Some("policy_details")
        );
        assert!(config.normalize.fold_case);
        assert!(!config.normalize.strip_punctuation);
        assert_eq!(config.report.display_limit(), Some(10));
    }

    #[test]
    fn test_roundtrip_toml() {
        let config = Config::default();
        let toml = toml::to_string_pretty(&config).unwrap();
        let parsed = Config::from_toml(&toml).unwrap();
        assert_eq!(parsed.matching.id_field, config.matching.id_field);
    }
}
