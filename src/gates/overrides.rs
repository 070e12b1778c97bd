use chrono::Utc;
use tracing::info;

use super::types::{GateOutcome, GateResult, GateType, OverrideDecision, OverrideRequest};
use crate::config::GatingConfig;

/// Ask a human to decide on a blocking gate
pub fn request_manual_override(gate_type: GateType, reason: impl Into<String>) -> OverrideRequest {
    OverrideRequest {
        gate_type,
        reason: reason.into(),
        options: vec![
            OverrideDecision::Override,
            OverrideDecision::Fix,
            OverrideDecision::Abort,
        ],
        requested_at: Utc::now(),
    }
}

/// Apply a human decision to a gate result. Only `Override` changes
/// anything: the returned copy passes and carries the reason and time.
pub fn apply_gate_override(
    result: &GateResult,
    decision: OverrideDecision,
    reason: impl Into<String>,
) -> GateResult {
    match decision {
        OverrideDecision::Override => {
            let reason = reason.into();
            info!("Overriding {} gate: {}", result.gate_type, reason);
            GateResult {
                result: GateOutcome::Pass,
                overridden: true,
                override_reason: Some(reason),
                overridden_at: Some(Utc::now()),
                ..result.clone()
            }
        }
        OverrideDecision::Fix | OverrideDecision::Abort => result.clone(),
    }
}

pub fn can_override_gate(config: &GatingConfig, gate_type: GateType) -> bool {
    config.allow_manual_override && !config.critical_gates.contains(&gate_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_offers_three_options() {
        let req = request_manual_override(GateType::Tests, "flaky CI");
        assert_eq!(req.gate_type, GateType::Tests);
        assert_eq!(req.reason, "flaky CI");
        assert_eq!(
            req.options,
            vec![
                OverrideDecision::Override,
                OverrideDecision::Fix,
                OverrideDecision::Abort
            ]
        );
    }

    #[test]
    fn test_override_marks_pass() {
        let failed = GateResult::fail(GateType::Docs, "Missing 2 documentation item(s)");
        let overridden = apply_gate_override(&failed, OverrideDecision::Override, "docs later");

        assert_eq!(overridden.result, GateOutcome::Pass);
        assert!(overridden.overridden);
        assert_eq!(overridden.override_reason.as_deref(), Some("docs later"));
        assert!(overridden.overridden_at.is_some());
        assert_eq!(overridden.message, failed.message);
        // The original is untouched
        assert_eq!(failed.result, GateOutcome::Fail);
    }

    #[test]
    fn test_fix_and_abort_pass_through() {
        let failed = GateResult::fail(GateType::Tests, "Tests failed");
        assert_eq!(apply_gate_override(&failed, OverrideDecision::Fix, "x"), failed);
        assert_eq!(apply_gate_override(&failed, OverrideDecision::Abort, "x"), failed);
    }

    #[test]
    fn test_can_override_gate() {
        let mut config = GatingConfig::default();
        assert!(can_override_gate(&config, GateType::Tests));

        config.critical_gates = vec![GateType::Tests];
        assert!(!can_override_gate(&config, GateType::Tests));
        assert!(can_override_gate(&config, GateType::Docs));

        config.allow_manual_override = false;
        assert!(!can_override_gate(&config, GateType::Docs));
    }
}
