//! Quality gates checked before a roadmap may advance

mod docs;
mod overrides;
mod runner;
mod test_gate;
mod types;

pub use docs::check_docs_gate;
pub use overrides::{apply_gate_override, can_override_gate, request_manual_override};
pub use runner::{CommandOutput, ShellRunner, TestRunner, COMMAND_NOT_FOUND};
pub use test_gate::check_test_gate;
pub use types::{
    GateOutcome, GateReport, GateResult, GateResults, GateType, OverrideDecision, OverrideRequest,
};

use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::config::GatingConfig;

/// Gates run against the roadmap's directory; accept ROADMAP.json itself too
pub fn roadmap_dir(path: &Path) -> PathBuf {
    if path.is_file() {
        path.parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    } else {
        path.to_path_buf()
    }
}

/// Run every enabled gate for a roadmap.
///
/// The overall result fails if any enabled gate fails. `can_override` is
/// set only when it fails and every failing gate may be overridden.
pub async fn check_gates(
    roadmap_path: &Path,
    config: &GatingConfig,
    runner: &dyn TestRunner,
) -> GateReport {
    let dir = roadmap_dir(roadmap_path);

    let mut gates = GateResults::default();
    if config.require_tests {
        let timeout = Duration::from_secs(config.test_timeout_sec);
        gates.tests = Some(check_test_gate(&dir, &config.test_commands, timeout, runner).await);
    }
    if config.require_docs {
        gates.docs = Some(check_docs_gate(&dir, &config.required_docs));
    }

    let report = summarize(gates, config);
    info!(
        "Gates for {}: {}{}",
        dir.display(),
        report.overall,
        if report.can_override { " (overridable)" } else { "" }
    );
    report
}

/// Recompute overall outcome and overridability from per-gate results
pub fn summarize(gates: GateResults, config: &GatingConfig) -> GateReport {
    let (any_failed, can_override) = {
        let mut failed = gates.iter().filter(|g| g.is_fail()).peekable();
        let any_failed = failed.peek().is_some();
        (
            any_failed,
            any_failed && failed.all(|g| can_override_gate(config, g.gate_type)),
        )
    };

    GateReport {
        overall: if any_failed {
            GateOutcome::Fail
        } else {
            GateOutcome::Pass
        },
        gates,
        can_override,
    }
}

/// Override every failing gate in a report with one reason, then
/// re-summarize. Gates that may not be overridden are left failing.
pub fn override_report(report: GateReport, config: &GatingConfig, reason: &str) -> GateReport {
    let mut gates = report.gates;
    for gate in gates.iter_mut() {
        if gate.is_fail() && can_override_gate(config, gate.gate_type) {
            *gate = apply_gate_override(gate, OverrideDecision::Override, reason);
        }
    }
    summarize(gates, config)
}
