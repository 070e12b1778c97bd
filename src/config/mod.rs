mod defaults;
mod types;

pub use types::*;

use crate::budget::BudgetOptions;
use crate::error::ConfigError;
use defaults::*;
use std::path::Path;
use tracing::debug;

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            budget: BudgetConfig::default(),
            gating: GatingConfig::default(),
            github: GithubConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a YAML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Load config if the file exists, otherwise fall back to defaults
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            debug!("Config '{}' not found, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.budget.compaction_threshold;
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(ConfigError::InvalidThreshold(threshold));
        }

        if self.gating.test_timeout_sec == 0 {
            return Err(ConfigError::ZeroTestTimeout);
        }

        Ok(())
    }
}

impl BudgetConfig {
    /// Ledger options this section describes
    pub fn options(&self) -> BudgetOptions {
        BudgetOptions {
            compaction_threshold: self.compaction_threshold,
            allow_reallocation: self.allow_reallocation,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::GateType;

    #[test]
    fn test_defaults_from_empty_yaml() {
        let config: Config = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.version, 1);
        assert_eq!(config.budget.compaction_threshold, 0.8);
        assert!(config.budget.allow_reallocation);
        assert!(!config.gating.require_tests);
        assert!(config.gating.allow_manual_override);
        assert_eq!(config.gating.test_timeout_sec, 300);
        assert_eq!(config.gating.test_commands.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_gating_section() {
        let yaml = r#"
gating:
  require_tests: true
  require_docs: true
  critical_gates: [tests]
  test_commands: ["make test"]
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.gating.require_tests);
        assert_eq!(config.gating.critical_gates, vec![GateType::Tests]);
        assert_eq!(config.gating.test_commands, vec!["make test".to_string()]);
        assert_eq!(config.gating.required_docs.len(), 2);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let mut config = Config::default();
        config.budget.compaction_threshold = 1.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidThreshold(_))
        ));

        config.budget.compaction_threshold = 0.8;
        config.gating.test_timeout_sec = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTestTimeout)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = Config::load_or_default(Path::new("/nonexistent/epicflow.yaml")).unwrap();
        assert_eq!(config.budget.default_total, 200_000);
    }
}
