use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EpicflowError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Budget error: {0}")]
    Budget(#[from] BudgetError),

    #[error("Hierarchy error: {0}")]
    Hierarchy(#[from] HierarchyError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Gate error: {0}")]
    Gate(#[from] GateError),

    #[error("GitHub error: {0}")]
    GitHub(#[from] GitHubError),

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("compaction_threshold must be in (0, 1], got {0}")]
    InvalidThreshold(f64),

    #[error("test_timeout_sec must be greater than zero")]
    ZeroTestTimeout,
}

/// Contract violations raised by the token ledger.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BudgetError {
    #[error("Insufficient budget for '{child_id}': requested {requested}, available {available}")]
    InsufficientBudget {
        child_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Budget already allocated to '{0}'")]
    DuplicateAllocation(String),

    #[error("No allocation found for '{0}'")]
    UnknownChild(String),

    #[error("Reallocation is disabled for this budget")]
    ReallocationDisabled,

    #[error("Insufficient available budget in '{child_id}': requested {requested}, available {available}")]
    InsufficientAvailable {
        child_id: String,
        requested: i64,
        available: i64,
    },

    #[error("Token amounts must not be negative, got {0}")]
    NegativeAmount(i64),

    #[error("Allocation for '{0}' has already been released")]
    AlreadyReleased(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HierarchyError {
    #[error("Cannot attach {child} node '{id}' under {parent} node")]
    InvalidChildLevel {
        id: String,
        parent: String,
        child: String,
    },

    #[error("Node '{0}' already has a child with this id")]
    DuplicateChild(String),

    #[error("Child node not found: {0}")]
    UnknownChild(String),

    #[error("Child node '{id}' is already {status}")]
    ChildFinished { id: String, status: String },

    #[error(transparent)]
    Budget(#[from] BudgetError),
}

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Invalid METRICS payload: {0}")]
    InvalidMetrics(#[source] serde_json::Error),

    #[error("Invalid ARTIFACTS payload: {0}")]
    InvalidArtifacts(#[source] serde_json::Error),

    #[error("Invalid ATTEMPTED payload: {0}")]
    InvalidAttempted(#[source] serde_json::Error),

    #[error("Invalid COMPLETION value '{0}'")]
    InvalidCompletion(String),

    #[error("{marker} output is missing required field {field}")]
    MissingField {
        marker: String,
        field: &'static str,
    },

    #[error("Expected a {expected} message, got {actual}")]
    WrongMessageType {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Execution timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Error, Debug)]
pub enum GitHubError {
    #[error("gh CLI failed: {0}")]
    GhCli(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid repository '{0}': expected owner/repo")]
    InvalidRepo(String),
}

#[derive(Error, Debug)]
pub enum StateError {
    #[error("No ledger found at '{0}'. Run `epicflow budget init` first")]
    Missing(PathBuf),

    #[error("Failed to read ledger '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Corrupt ledger '{path}': {source}")]
    Corrupt {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write ledger: {0}")]
    Write(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
