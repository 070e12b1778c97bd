use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::defaults::*;
use crate::gates::GateType;

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub budget: BudgetConfig,

    #[serde(default)]
    pub gating: GatingConfig,

    #[serde(default)]
    pub github: GithubConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct BudgetConfig {
    /// Total used by `budget init` when --total is not given
    #[serde(default = "default_total_budget")]
    pub default_total: i64,

    /// Usage ratio at which a child is flagged for context compaction
    #[serde(default = "default_compaction_threshold")]
    pub compaction_threshold: f64,

    #[serde(default = "default_true")]
    pub allow_reallocation: bool,

    /// Where the CLI persists the ledger between invocations
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            default_total: default_total_budget(),
            compaction_threshold: default_compaction_threshold(),
            allow_reallocation: default_true(),
            state_file: default_state_file(),
        }
    }
}

/// Which gates guard a roadmap transition and how they may be bypassed
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct GatingConfig {
    #[serde(default = "default_false")]
    pub require_tests: bool,

    #[serde(default = "default_false")]
    pub require_docs: bool,

    #[serde(default = "default_true")]
    pub allow_manual_override: bool,

    /// Gates that can never be overridden by a human decision
    #[serde(default = "default_critical_gates")]
    pub critical_gates: Vec<GateType>,

    #[serde(default = "default_test_timeout_sec")]
    pub test_timeout_sec: u64,

    #[serde(default = "default_test_commands")]
    pub test_commands: Vec<String>,

    /// Files every `phases/<phase>/exploration/` directory must contain
    #[serde(default = "default_required_docs")]
    pub required_docs: Vec<String>,
}

impl Default for GatingConfig {
    fn default() -> Self {
        Self {
            require_tests: false,
            require_docs: false,
            allow_manual_override: true,
            critical_gates: default_critical_gates(),
            test_timeout_sec: default_test_timeout_sec(),
            test_commands: default_test_commands(),
            required_docs: default_required_docs(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
pub struct GithubConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Default repository (owner/repo) for closing tracker issues
    #[serde(default)]
    pub repo: Option<String>,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            repo: None,
        }
    }
}
