//! Ledger records and query results

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Construction options for a [`super::TokenBudget`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BudgetOptions {
    pub compaction_threshold: f64,
    pub allow_reallocation: bool,
}

impl Default for BudgetOptions {
    fn default() -> Self {
        Self {
            compaction_threshold: 0.8,
            allow_reallocation: true,
        }
    }
}

/// Health of a single child allocation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AllocationStatus {
    #[default]
    Healthy,
    Low,
    Exhausted,
    /// Never produced: over-budget usage is reported as `Exhausted`.
    Exceeded,
}

impl std::fmt::Display for AllocationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationStatus::Healthy => write!(f, "healthy"),
            AllocationStatus::Low => write!(f, "low"),
            AllocationStatus::Exhausted => write!(f, "exhausted"),
            AllocationStatus::Exceeded => write!(f, "exceeded"),
        }
    }
}

/// A budget slice handed to one child
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Allocation {
    pub allocated: i64,
    pub used: i64,

    /// `allocated - used`; negative once the child overruns
    pub available: i64,

    #[serde(default)]
    pub status: AllocationStatus,

    /// Caller-supplied context (e.g. the spawned node's title)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    pub allocated_at: DateTime<Utc>,

    /// Set once the unspent remainder went back to the parent; the
    /// allocation is closed to further usage and reallocation
    #[serde(default)]
    pub released: bool,
}

/// One entry of the append-only usage log
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct UsageRecord {
    pub child_id: String,
    pub amount: i64,
    pub timestamp: DateTime<Utc>,
}

/// Result of [`super::TokenBudget::check`]
#[derive(Debug, Clone, PartialEq)]
pub enum BudgetCheck {
    Allocated {
        total: i64,
        used: i64,
        available: i64,
        usage_percentage: f64,
        should_compact: bool,
    },
    NotAllocated {
        message: String,
    },
}

// Serialized flat with a boolean `allocated` discriminator
impl Serialize for BudgetCheck {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            BudgetCheck::Allocated {
                total,
                used,
                available,
                usage_percentage,
                should_compact,
            } => {
                let mut map = serializer.serialize_map(Some(6))?;
                map.serialize_entry("allocated", &true)?;
                map.serialize_entry("total", total)?;
                map.serialize_entry("used", used)?;
                map.serialize_entry("available", available)?;
                map.serialize_entry("usage_percentage", usage_percentage)?;
                map.serialize_entry("should_compact", should_compact)?;
                map.end()
            }
            BudgetCheck::NotAllocated { message } => {
                let mut map = serializer.serialize_map(Some(2))?;
                map.serialize_entry("allocated", &false)?;
                map.serialize_entry("message", message)?;
                map.end()
            }
        }
    }
}

impl BudgetCheck {
    pub fn is_allocated(&self) -> bool {
        matches!(self, BudgetCheck::Allocated { .. })
    }
}

/// Amount handed back to the parent by [`super::TokenBudget::release`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Release {
    pub released: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildBudget {
    pub id: String,
    pub allocated: i64,
    pub used: i64,
    pub available: i64,
    pub status: AllocationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetSummary {
    pub total: i64,
    pub allocated: i64,
    pub used: i64,
    pub unallocated: i64,
    pub children: Vec<ChildBudget>,
}
