//! Epic → Roadmap → Phase → Task tree
//!
//! Children are owned by their parent and never shared. Removing a child
//! hands its unspent tokens back to the parent's ledger before the node is
//! dropped.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

use crate::budget::TokenBudget;
use crate::error::HierarchyError;
use crate::progress::{determine_status, rounded_completion};

/// Depth in the decomposition hierarchy
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize, JsonSchema,
)]
pub enum Level {
    L0,
    L1,
    L2,
    L3,
}

impl Level {
    /// Marker name used in agent output (`PHASE_COMPLETE: ...`)
    pub fn name(&self) -> &'static str {
        match self {
            Level::L0 => "EPIC",
            Level::L1 => "ROADMAP",
            Level::L2 => "PHASE",
            Level::L3 => "TASK",
        }
    }

    pub fn child(&self) -> Option<Level> {
        match self {
            Level::L0 => Some(Level::L1),
            Level::L1 => Some(Level::L2),
            Level::L2 => Some(Level::L3),
            Level::L3 => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Level::L0 => write!(f, "L0"),
            Level::L1 => write!(f, "L1"),
            Level::L2 => write!(f, "L2"),
            Level::L3 => write!(f, "L3"),
        }
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "L0" | "EPIC" => Ok(Level::L0),
            "L1" | "ROADMAP" => Ok(Level::L1),
            "L2" | "PHASE" => Ok(Level::L2),
            "L3" | "TASK" => Ok(Level::L3),
            other => Err(format!("unknown level '{}'", other)),
        }
    }
}

/// Lifecycle state of a node. Completed and failed are terminal; blocked
/// can recover.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
    Blocked,
    Failed,
}

impl NodeStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, NodeStatus::Completed | NodeStatus::Failed)
    }

    /// Map a free-form status string from persisted state; anything
    /// unrecognised is treated as pending.
    pub fn parse_lenient(s: &str) -> NodeStatus {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "in_progress" | "active" | "started" => NodeStatus::InProgress,
            "completed" | "complete" | "done" => NodeStatus::Completed,
            "blocked" => NodeStatus::Blocked,
            "failed" | "error" => NodeStatus::Failed,
            _ => NodeStatus::Pending,
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Pending => write!(f, "pending"),
            NodeStatus::InProgress => write!(f, "in_progress"),
            NodeStatus::Completed => write!(f, "completed"),
            NodeStatus::Blocked => write!(f, "blocked"),
            NodeStatus::Failed => write!(f, "failed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HierarchyNode {
    pub id: String,
    pub title: String,
    pub level: Level,
    #[serde(default)]
    pub status: NodeStatus,
    #[serde(default)]
    pub completion: u8,
    #[serde(default)]
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    pub fn new(id: impl Into<String>, title: impl Into<String>, level: Level) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            level,
            status: NodeStatus::Pending,
            completion: 0,
            children: Vec::new(),
        }
    }

    /// Attach a node one level below this one
    pub fn add_child(&mut self, child: HierarchyNode) -> Result<&mut HierarchyNode, HierarchyError> {
        if self.level.child() != Some(child.level) {
            return Err(HierarchyError::InvalidChildLevel {
                id: child.id,
                parent: self.level.to_string(),
                child: child.level.to_string(),
            });
        }
        if self.child(&child.id).is_some() {
            return Err(HierarchyError::DuplicateChild(self.id.clone()));
        }

        let idx = self.children.len();
        self.children.push(child);
        Ok(&mut self.children[idx])
    }

    pub fn child(&self, id: &str) -> Option<&HierarchyNode> {
        self.children.iter().find(|c| c.id == id)
    }

    pub fn child_mut(&mut self, id: &str) -> Option<&mut HierarchyNode> {
        self.children.iter_mut().find(|c| c.id == id)
    }

    /// Detach a child, first returning its unspent tokens to `ledger`.
    ///
    /// Children that never received an allocation are detached with a
    /// release of zero.
    pub fn remove_child(
        &mut self,
        id: &str,
        ledger: &mut TokenBudget,
    ) -> Result<(HierarchyNode, i64), HierarchyError> {
        let idx = self
            .children
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| HierarchyError::UnknownChild(id.to_string()))?;

        let released = if ledger.allocations.contains_key(id) {
            ledger.release(id)?.released
        } else {
            0
        };

        let node = self.children.remove(idx);
        debug!("Removed {} from {} ({} tokens released)", id, self.id, released);
        Ok((node, released))
    }

    pub fn set_status(&mut self, status: NodeStatus) {
        self.status = status;
    }

    pub fn set_completion(&mut self, completion: u8) {
        self.completion = completion.min(100);
    }

    /// Recompute completion and status from direct children.
    ///
    /// Leaves keep their own values. Completion is the rounded unweighted
    /// mean of child completions, and reaches 100 only once every child has.
    pub fn roll_up(&mut self) {
        if self.children.is_empty() {
            return;
        }

        let sum: u32 = self.children.iter().map(|c| c.completion as u32).sum();
        let mean = sum as f64 / self.children.len() as f64;
        let finished = self.children.iter().all(|c| c.completion == 100);
        self.completion = rounded_completion(mean, finished);

        let statuses: Vec<NodeStatus> = self.children.iter().map(|c| c.status).collect();
        self.status = determine_status(&statuses);
    }
}
