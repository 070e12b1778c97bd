//! Delegation message schema exchanged between hierarchy levels

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::hierarchy::{Level, NodeStatus};

/// A signal passed across one level boundary. Every variant carries the
/// level of the node it concerns and the time it was created.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DelegationMessage {
    pub level: Level,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageBody {
    Spawn(SpawnContext),
    Complete(CompletionReport),
    Blocked(BlockedReport),
    Failed(FailureReport),
    Progress(ProgressUpdate),
}

impl MessageBody {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageBody::Spawn(_) => "spawn",
            MessageBody::Complete(_) => "complete",
            MessageBody::Blocked(_) => "blocked",
            MessageBody::Failed(_) => "failed",
            MessageBody::Progress(_) => "progress",
        }
    }
}

impl DelegationMessage {
    pub fn kind(&self) -> &'static str {
        self.body.kind()
    }

    /// Id of the node this message is about (the child, for spawns)
    pub fn subject_id(&self) -> &str {
        match &self.body {
            MessageBody::Spawn(ctx) => &ctx.child_id,
            MessageBody::Complete(r) => &r.id,
            MessageBody::Blocked(r) => &r.id,
            MessageBody::Failed(r) => &r.id,
            MessageBody::Progress(r) => &r.id,
        }
    }
}

/// Everything a child needs to start work
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SpawnContext {
    pub parent_id: String,
    pub child_id: String,
    pub title: String,
    pub scope: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budget: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
}

/// Work metrics reported with a completion. Accepts camelCase keys from
/// executors that emit them.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CompletionMetrics {
    #[serde(default, alias = "itemsCompleted")]
    pub items_completed: u64,

    #[serde(default, alias = "testsPassed", skip_serializing_if = "Option::is_none")]
    pub tests_passed: Option<u64>,

    #[serde(default, alias = "tokensUsed", skip_serializing_if = "Option::is_none")]
    pub tokens_used: Option<i64>,

    #[serde(default, alias = "durationMs", skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CompletionReport {
    pub id: String,
    pub status: NodeStatus,
    pub metrics: CompletionMetrics,
    pub summary: String,
    #[serde(default)]
    pub artifacts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BlockedReport {
    pub id: String,
    pub status: NodeStatus,
    pub blocker: String,
    pub suggested_action: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FailureReport {
    pub id: String,
    pub status: NodeStatus,
    pub error: String,
    #[serde(default)]
    pub attempted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProgressUpdate {
    pub id: String,
    pub status: NodeStatus,
    pub completion: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

fn message(level: Level, body: MessageBody) -> DelegationMessage {
    DelegationMessage {
        level,
        timestamp: Utc::now(),
        body,
    }
}

pub fn create_spawn_message(level: Level, ctx: SpawnContext) -> DelegationMessage {
    message(level, MessageBody::Spawn(ctx))
}

pub fn create_complete_message(
    level: Level,
    id: impl Into<String>,
    metrics: CompletionMetrics,
    summary: impl Into<String>,
    artifacts: Vec<String>,
) -> DelegationMessage {
    message(
        level,
        MessageBody::Complete(CompletionReport {
            id: id.into(),
            status: NodeStatus::Completed,
            metrics,
            summary: summary.into(),
            artifacts,
        }),
    )
}

pub fn create_blocked_message(
    level: Level,
    id: impl Into<String>,
    blocker: impl Into<String>,
    suggested_action: impl Into<String>,
) -> DelegationMessage {
    message(
        level,
        MessageBody::Blocked(BlockedReport {
            id: id.into(),
            status: NodeStatus::Blocked,
            blocker: blocker.into(),
            suggested_action: suggested_action.into(),
        }),
    )
}

pub fn create_failed_message(
    level: Level,
    id: impl Into<String>,
    error: impl Into<String>,
    attempted: Vec<String>,
) -> DelegationMessage {
    message(
        level,
        MessageBody::Failed(FailureReport {
            id: id.into(),
            status: NodeStatus::Failed,
            error: error.into(),
            attempted,
        }),
    )
}

pub fn create_progress_message(
    level: Level,
    id: impl Into<String>,
    completion: u8,
    note: Option<String>,
) -> DelegationMessage {
    message(
        level,
        MessageBody::Progress(ProgressUpdate {
            id: id.into(),
            status: NodeStatus::InProgress,
            completion: completion.min(100),
            note,
        }),
    )
}
