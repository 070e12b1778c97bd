use serde::de::DeserializeOwned;
use tracing::debug;

use super::lexer::{lex, FieldKey, MarkerKind, Token};
use super::message::{
    create_blocked_message, create_complete_message, create_failed_message,
    create_progress_message, CompletionMetrics, DelegationMessage,
};
use crate::error::ProtocolError;
use crate::hierarchy::Level;

/// Fields collected after a marker line
#[derive(Debug, Default)]
struct Fields<'a> {
    metrics: Option<&'a str>,
    artifacts: Option<&'a str>,
    summary: Vec<&'a str>,
    blocker: Option<&'a str>,
    suggested_action: Option<&'a str>,
    error: Option<&'a str>,
    attempted: Option<&'a str>,
    completion: Option<&'a str>,
    note: Option<&'a str>,
}

impl<'a> Fields<'a> {
    fn set(&mut self, key: FieldKey, value: &'a str) {
        let slot = match key {
            FieldKey::Metrics => &mut self.metrics,
            FieldKey::Artifacts => &mut self.artifacts,
            FieldKey::Blocker => &mut self.blocker,
            FieldKey::SuggestedAction => &mut self.suggested_action,
            FieldKey::Error => &mut self.error,
            FieldKey::Attempted => &mut self.attempted,
            FieldKey::Completion => &mut self.completion,
            FieldKey::Note => &mut self.note,
            FieldKey::Summary => {
                self.summary = vec![value];
                return;
            }
        };
        // Repeated fields keep the first occurrence
        if slot.is_none() {
            *slot = Some(value);
        }
    }

    fn summary(&self) -> String {
        let mut lines = self.summary.as_slice();
        while let Some((last, rest)) = lines.split_last() {
            if !last.trim().is_empty() {
                break;
            }
            lines = rest;
        }
        lines.join("\n")
    }
}

/// Parse executor output into a delegation message.
///
/// Returns `Ok(None)` when the text carries no completion marker, which
/// callers treat as "not finished yet". The first marker wins; any later
/// marker ends its field block.
pub fn parse_completion_output(text: &str) -> Result<Option<DelegationMessage>, ProtocolError> {
    let mut tokens = lex(text);

    let Some((level, kind, id)) = tokens.by_ref().find_map(|token| match token {
        Token::Marker { level, kind, id } => Some((level, kind, id)),
        _ => None,
    }) else {
        return Ok(None);
    };

    let mut fields = Fields::default();
    let mut in_summary = false;
    for token in tokens {
        match token {
            Token::Marker { .. } => break,
            Token::Field { key, value } => {
                in_summary = key == FieldKey::Summary;
                fields.set(key, value);
            }
            Token::Text(line) if in_summary => fields.summary.push(line),
            Token::Blank if in_summary => fields.summary.push(""),
            Token::Text(_) | Token::Blank => {}
        }
    }

    debug!("Parsed {}_{} marker for {}", level.name(), kind.as_str(), id);
    build(level, kind, id, &fields).map(Some)
}

fn build(
    level: Level,
    kind: MarkerKind,
    id: &str,
    fields: &Fields<'_>,
) -> Result<DelegationMessage, ProtocolError> {
    let marker = || format!("{}_{}", level.name(), kind.as_str());

    match kind {
        MarkerKind::Complete => {
            let metrics: CompletionMetrics = match non_empty(fields.metrics) {
                Some(raw) => serde_json::from_str(raw).map_err(ProtocolError::InvalidMetrics)?,
                None => CompletionMetrics::default(),
            };
            let artifacts =
                parse_list(fields.artifacts).map_err(ProtocolError::InvalidArtifacts)?;
            Ok(create_complete_message(
                level,
                id,
                metrics,
                fields.summary(),
                artifacts,
            ))
        }
        MarkerKind::Blocked => {
            let blocker = non_empty(fields.blocker).ok_or_else(|| ProtocolError::MissingField {
                marker: marker(),
                field: "BLOCKER",
            })?;
            Ok(create_blocked_message(
                level,
                id,
                blocker.trim(),
                fields.suggested_action.unwrap_or_default().trim(),
            ))
        }
        MarkerKind::Failed => {
            let error = non_empty(fields.error).ok_or_else(|| ProtocolError::MissingField {
                marker: marker(),
                field: "ERROR",
            })?;
            let attempted =
                parse_list(fields.attempted).map_err(ProtocolError::InvalidAttempted)?;
            Ok(create_failed_message(level, id, error.trim(), attempted))
        }
        MarkerKind::Progress => {
            let raw = non_empty(fields.completion).ok_or_else(|| ProtocolError::MissingField {
                marker: marker(),
                field: "COMPLETION",
            })?;
            let completion = parse_percentage(raw)?;
            let note = non_empty(fields.note).map(|n| n.trim().to_string());
            Ok(create_progress_message(level, id, completion, note))
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_list<T: DeserializeOwned>(raw: Option<&str>) -> Result<Vec<T>, serde_json::Error> {
    match non_empty(raw) {
        Some(raw) => serde_json::from_str(raw.trim()),
        None => Ok(Vec::new()),
    }
}

/// Accepts `40`, `40%` or `40.5` and clamps into 0..=100
fn parse_percentage(raw: &str) -> Result<u8, ProtocolError> {
    let trimmed = raw.trim().trim_end_matches('%').trim();
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ProtocolError::InvalidCompletion(raw.trim().to_string()))?;
    if !value.is_finite() {
        return Err(ProtocolError::InvalidCompletion(raw.trim().to_string()));
    }
    Ok(value.round().clamp(0.0, 100.0) as u8)
}
