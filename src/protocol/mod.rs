//! Delegation protocol between hierarchy levels
//!
//! Messages are typed [`DelegationMessage`] values in memory. On the wire to
//! and from an external executor they use a small line-oriented text
//! convention:
//!
//! ```text
//! PHASE_COMPLETE: phase-1
//! METRICS: {"items_completed": 4, "tokens_used": 12000}
//! ARTIFACTS: ["src/schema.sql"]
//! SUMMARY: Tables created and migrated.
//! ```
//!
//! [`parse_completion_output`] validates that text into strict types at the
//! boundary; the `format_*` functions produce it.

mod format;
mod lexer;
mod message;
mod parser;

pub use format::{
    format_blocked_output, format_complete_output, format_failed_output, format_message,
    format_progress_output, format_spawn_prompt,
};
pub use message::{
    create_blocked_message, create_complete_message, create_failed_message,
    create_progress_message, create_spawn_message, BlockedReport, CompletionMetrics,
    CompletionReport, DelegationMessage, FailureReport, MessageBody, ProgressUpdate,
    SpawnContext,
};
pub use parser::parse_completion_output;
