use super::lexer::{FieldKey, MarkerKind};
use super::message::{DelegationMessage, MessageBody};
use crate::error::ProtocolError;
use crate::hierarchy::Level;

fn marker(level: Level, kind: MarkerKind, id: &str) -> String {
    format!("{}_{}: {}", level.name(), kind.as_str(), id)
}

fn field(key: FieldKey, value: &str) -> String {
    format!("{}: {}", key.as_str(), value)
}

/// Single-line fields cannot carry newlines on the wire
fn one_line(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn wrong_type(expected: &'static str, msg: &DelegationMessage) -> ProtocolError {
    ProtocolError::WrongMessageType {
        expected,
        actual: msg.kind(),
    }
}

/// Render the instructions handed to a spawned child, ending with the
/// reporting convention it must follow.
pub fn format_spawn_prompt(msg: &DelegationMessage) -> Result<String, ProtocolError> {
    let MessageBody::Spawn(ctx) = &msg.body else {
        return Err(wrong_type("spawn", msg));
    };
    let level = msg.level;

    let mut lines = vec![
        format!("# {} ASSIGNMENT: {}", level.name(), ctx.title),
        String::new(),
        format!("ID: {}", ctx.child_id),
        format!("Parent: {}", ctx.parent_id),
    ];
    if let Some(budget) = ctx.token_budget {
        lines.push(format!("Token budget: {}", budget));
    }

    lines.push(String::new());
    lines.push("## Scope".to_string());
    lines.push(ctx.scope.clone());

    for (heading, items) in [
        ("Dependencies", &ctx.dependencies),
        ("Constraints", &ctx.constraints),
        ("Available tools", &ctx.tools),
    ] {
        if items.is_empty() {
            continue;
        }
        lines.push(String::new());
        lines.push(format!("## {}", heading));
        lines.extend(items.iter().map(|item| format!("- {}", item)));
    }

    let id = ctx.child_id.as_str();
    lines.extend([
        String::new(),
        "## Reporting".to_string(),
        "When the work is done, end your output with:".to_string(),
        String::new(),
        marker(level, MarkerKind::Complete, id),
        field(
            FieldKey::Metrics,
            r#"{"items_completed": <n>, "tests_passed": <n>, "tokens_used": <n>}"#,
        ),
        field(FieldKey::Artifacts, r#"["<path>", ...]"#),
        field(FieldKey::Summary, "<what was done, further lines indented>"),
        String::new(),
        "If you cannot continue without outside help:".to_string(),
        String::new(),
        marker(level, MarkerKind::Blocked, id),
        field(FieldKey::Blocker, "<what is blocking you>"),
        field(FieldKey::SuggestedAction, "<what would unblock you>"),
        String::new(),
        "If the work failed:".to_string(),
        String::new(),
        marker(level, MarkerKind::Failed, id),
        field(FieldKey::Error, "<what went wrong>"),
        field(FieldKey::Attempted, r#"["<approach>", ...]"#),
    ]);

    Ok(lines.join("\n"))
}

pub fn format_complete_output(msg: &DelegationMessage) -> Result<String, ProtocolError> {
    let MessageBody::Complete(report) = &msg.body else {
        return Err(wrong_type("complete", msg));
    };

    // SUMMARY goes last; continuation lines are indented so none of them
    // can be read back as a field or marker
    let lines = [
        marker(msg.level, MarkerKind::Complete, &report.id),
        field(FieldKey::Metrics, &serde_json::to_string(&report.metrics)?),
        field(FieldKey::Artifacts, &serde_json::to_string(&report.artifacts)?),
        field(FieldKey::Summary, &report.summary.replace('\n', "\n ")),
    ];
    Ok(lines.join("\n"))
}

pub fn format_blocked_output(msg: &DelegationMessage) -> Result<String, ProtocolError> {
    let MessageBody::Blocked(report) = &msg.body else {
        return Err(wrong_type("blocked", msg));
    };

    let lines = [
        marker(msg.level, MarkerKind::Blocked, &report.id),
        field(FieldKey::Blocker, &one_line(&report.blocker)),
        field(FieldKey::SuggestedAction, &one_line(&report.suggested_action)),
    ];
    Ok(lines.join("\n"))
}

pub fn format_failed_output(msg: &DelegationMessage) -> Result<String, ProtocolError> {
    let MessageBody::Failed(report) = &msg.body else {
        return Err(wrong_type("failed", msg));
    };

    let mut lines = vec![
        marker(msg.level, MarkerKind::Failed, &report.id),
        field(FieldKey::Error, &one_line(&report.error)),
    ];
    if !report.attempted.is_empty() {
        lines.push(field(
            FieldKey::Attempted,
            &serde_json::to_string(&report.attempted)?,
        ));
    }
    Ok(lines.join("\n"))
}

pub fn format_progress_output(msg: &DelegationMessage) -> Result<String, ProtocolError> {
    let MessageBody::Progress(update) = &msg.body else {
        return Err(wrong_type("progress", msg));
    };

    let mut lines = vec![
        marker(msg.level, MarkerKind::Progress, &update.id),
        field(FieldKey::Completion, &format!("{}%", update.completion)),
    ];
    if let Some(note) = &update.note {
        lines.push(field(FieldKey::Note, &one_line(note)));
    }
    Ok(lines.join("\n"))
}

/// Format any message in its wire form. Spawn messages render as a prompt.
pub fn format_message(msg: &DelegationMessage) -> Result<String, ProtocolError> {
    match &msg.body {
        MessageBody::Spawn(_) => format_spawn_prompt(msg),
        MessageBody::Complete(_) => format_complete_output(msg),
        MessageBody::Blocked(_) => format_blocked_output(msg),
        MessageBody::Failed(_) => format_failed_output(msg),
        MessageBody::Progress(_) => format_progress_output(msg),
    }
}
