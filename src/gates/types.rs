use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum GateType {
    Tests,
    Docs,
    Manual,
}

impl std::fmt::Display for GateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateType::Tests => write!(f, "tests"),
            GateType::Docs => write!(f, "docs"),
            GateType::Manual => write!(f, "manual"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GateOutcome {
    Pass,
    Fail,
    Skip,
}

impl std::fmt::Display for GateOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GateOutcome::Pass => write!(f, "pass"),
            GateOutcome::Fail => write!(f, "fail"),
            GateOutcome::Skip => write!(f, "skip"),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GateResult {
    #[serde(rename = "type")]
    pub gate_type: GateType,

    pub result: GateOutcome,

    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,

    #[serde(default, skip_serializing_if = "is_false")]
    pub overridden: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overridden_at: Option<DateTime<Utc>>,
}

impl GateResult {
    fn new(gate_type: GateType, result: GateOutcome, message: impl Into<String>) -> Self {
        Self {
            gate_type,
            result,
            message: message.into(),
            details: None,
            overridden: false,
            override_reason: None,
            overridden_at: None,
        }
    }

    pub fn pass(gate_type: GateType, message: impl Into<String>) -> Self {
        Self::new(gate_type, GateOutcome::Pass, message)
    }

    pub fn fail(gate_type: GateType, message: impl Into<String>) -> Self {
        Self::new(gate_type, GateOutcome::Fail, message)
    }

    pub fn skip(gate_type: GateType, message: impl Into<String>) -> Self {
        Self::new(gate_type, GateOutcome::Skip, message)
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn is_fail(&self) -> bool {
        self.result == GateOutcome::Fail
    }
}

/// Per-gate results; gates that are not enabled are absent
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GateResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<GateResult>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<GateResult>,
}

impl GateResults {
    pub fn iter(&self) -> impl Iterator<Item = &GateResult> {
        self.tests.iter().chain(self.docs.iter())
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut GateResult> {
        self.tests.iter_mut().chain(self.docs.iter_mut())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GateReport {
    pub overall: GateOutcome,
    pub gates: GateResults,
    pub can_override: bool,
}

impl GateReport {
    pub fn passed(&self) -> bool {
        self.overall == GateOutcome::Pass
    }

    pub fn failed_gates(&self) -> impl Iterator<Item = &GateResult> {
        self.gates.iter().filter(|g| g.is_fail())
    }
}

/// What a human may decide when a gate blocks a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverrideDecision {
    Override,
    Fix,
    Abort,
}

impl std::fmt::Display for OverrideDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverrideDecision::Override => write!(f, "override"),
            OverrideDecision::Fix => write!(f, "fix"),
            OverrideDecision::Abort => write!(f, "abort"),
        }
    }
}

impl FromStr for OverrideDecision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "override" => Ok(OverrideDecision::Override),
            "fix" => Ok(OverrideDecision::Fix),
            "abort" => Ok(OverrideDecision::Abort),
            other => Err(format!("unknown decision '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OverrideRequest {
    pub gate_type: GateType,
    pub reason: String,
    pub options: Vec<OverrideDecision>,
    pub requested_at: DateTime<Utc>,
}
