use std::path::PathBuf;

use crate::gates::GateType;

pub fn default_version() -> u32 {
    1
}

pub fn default_total_budget() -> i64 {
    200_000
}

pub fn default_compaction_threshold() -> f64 {
    0.8
}

pub fn default_state_file() -> PathBuf {
    PathBuf::from(".epicflow/budget.json")
}

pub fn default_test_timeout_sec() -> u64 {
    300 // 5 minutes
}

/// Test runner invocations, tried in order until one is installed
pub fn default_test_commands() -> Vec<String> {
    vec![
        "npm test".to_string(),
        "pytest".to_string(),
        "cargo test".to_string(),
        "go test ./...".to_string(),
    ]
}

pub fn default_required_docs() -> Vec<String> {
    vec![
        "EXPLORATION_SUMMARY.md".to_string(),
        "PHASE_BREAKDOWN.md".to_string(),
    ]
}

pub fn default_critical_gates() -> Vec<GateType> {
    Vec::new()
}

pub fn default_true() -> bool {
    true
}

pub fn default_false() -> bool {
    false
}
