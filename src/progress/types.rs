use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::hierarchy::{Level, NodeStatus};

/// Rolled-up view of one level, recomputed from persisted child state.
/// Never written back to disk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
    /// `None` only when the level could not be detected
    pub level: Option<Level>,

    pub path: PathBuf,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    pub completion: u8,

    pub status: NodeStatus,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ProgressReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_completed: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub tasks_total: Option<usize>,

    /// Weight this report carries in its parent's mean
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,

    /// Tracker issue associated with this level, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_number: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProgressReport {
    pub(crate) fn new(level: Level, path: &Path) -> Self {
        Self {
            level: Some(level),
            path: path.to_path_buf(),
            title: None,
            completion: 0,
            status: NodeStatus::Pending,
            children: Vec::new(),
            tasks_completed: None,
            tasks_total: None,
            weight: None,
            issue_number: None,
            error: None,
        }
    }

    /// Conservative result for unreadable state: nothing done, failed
    pub(crate) fn failed(level: Option<Level>, path: &Path, error: impl Into<String>) -> Self {
        Self {
            level,
            status: NodeStatus::Failed,
            error: Some(error.into()),
            ..Self::new(Level::L0, path)
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completion == 100
    }
}
