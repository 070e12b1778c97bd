//! Line lexer for the plain-text completion convention
//!
//! Each line of executor output becomes one [`Token`]. Marker lines look like
//! `PHASE_COMPLETE: phase-1`; field lines like `METRICS: {...}`. Everything
//! else is free text, which only matters as SUMMARY continuation.

use regex::Regex;
use std::sync::OnceLock;

use crate::hierarchy::Level;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Complete,
    Blocked,
    Failed,
    Progress,
}

impl MarkerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MarkerKind::Complete => "COMPLETE",
            MarkerKind::Blocked => "BLOCKED",
            MarkerKind::Failed => "FAILED",
            MarkerKind::Progress => "PROGRESS",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "COMPLETE" => Some(MarkerKind::Complete),
            "BLOCKED" => Some(MarkerKind::Blocked),
            "FAILED" => Some(MarkerKind::Failed),
            "PROGRESS" => Some(MarkerKind::Progress),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Metrics,
    Artifacts,
    Summary,
    Blocker,
    SuggestedAction,
    Error,
    Attempted,
    Completion,
    Note,
}

impl FieldKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::Metrics => "METRICS",
            FieldKey::Artifacts => "ARTIFACTS",
            FieldKey::Summary => "SUMMARY",
            FieldKey::Blocker => "BLOCKER",
            FieldKey::SuggestedAction => "SUGGESTED_ACTION",
            FieldKey::Error => "ERROR",
            FieldKey::Attempted => "ATTEMPTED",
            FieldKey::Completion => "COMPLETION",
            FieldKey::Note => "NOTE",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "METRICS" => Some(FieldKey::Metrics),
            "ARTIFACTS" => Some(FieldKey::Artifacts),
            "SUMMARY" => Some(FieldKey::Summary),
            "BLOCKER" => Some(FieldKey::Blocker),
            "SUGGESTED_ACTION" => Some(FieldKey::SuggestedAction),
            "ERROR" => Some(FieldKey::Error),
            "ATTEMPTED" => Some(FieldKey::Attempted),
            "COMPLETION" => Some(FieldKey::Completion),
            "NOTE" => Some(FieldKey::Note),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token<'a> {
    Marker {
        level: Level,
        kind: MarkerKind,
        id: &'a str,
    },
    Field {
        key: FieldKey,
        value: &'a str,
    },
    Text(&'a str),
    Blank,
}

fn marker_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z0-9]+)_(COMPLETE|BLOCKED|FAILED|PROGRESS)\s*:\s*(\S.*?)\s*$").ok()
    })
    .as_ref()
}

fn field_re() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*([A-Z_]+)\s*:[ \t]?(.*)$").ok())
        .as_ref()
}

/// Classify a single line
pub fn lex_line(line: &str) -> Token<'_> {
    if line.trim().is_empty() {
        return Token::Blank;
    }

    if let Some(caps) = marker_re().and_then(|re| re.captures(line)) {
        let level = caps.get(1).and_then(|m| m.as_str().parse::<Level>().ok());
        let kind = caps.get(2).and_then(|m| MarkerKind::parse(m.as_str()));
        if let (Some(level), Some(kind), Some(id)) = (level, kind, caps.get(3)) {
            return Token::Marker {
                level,
                kind,
                id: id.as_str(),
            };
        }
    }

    if let Some(caps) = field_re().and_then(|re| re.captures(line)) {
        let key = caps.get(1).and_then(|m| FieldKey::parse(m.as_str()));
        if let (Some(key), Some(value)) = (key, caps.get(2)) {
            return Token::Field {
                key,
                value: value.as_str(),
            };
        }
    }

    Token::Text(line)
}

/// Classify every line of `text`.
///
/// Once a SUMMARY field has been seen, an indented line is summary text no
/// matter what it looks like, with one leading space or tab dropped. This
/// lets a summary carry lines such as `ERROR: none` or `TASK_COMPLETE: x`.
pub fn lex(text: &str) -> impl Iterator<Item = Token<'_>> {
    let mut in_summary = false;
    text.lines().map(move |line| {
        if in_summary {
            if let Some(rest) = line.strip_prefix(|c: char| c == ' ' || c == '\t') {
                return Token::Text(rest);
            }
        }
        let token = lex_line(line);
        match token {
            Token::Field { key, .. } => in_summary = key == FieldKey::Summary,
            Token::Marker { .. } => in_summary = false,
            Token::Text(_) | Token::Blank => {}
        }
        token
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_lines() {
        assert_eq!(
            lex_line("PHASE_COMPLETE: phase-1"),
            Token::Marker {
                level: Level::L2,
                kind: MarkerKind::Complete,
                id: "phase-1"
            }
        );
        assert_eq!(
            lex_line("  L3_BLOCKED:task-9  "),
            Token::Marker {
                level: Level::L3,
                kind: MarkerKind::Blocked,
                id: "task-9"
            }
        );
    }

    #[test]
    fn test_unknown_level_is_text() {
        assert_eq!(
            lex_line("SPRINT_COMPLETE: s1"),
            Token::Text("SPRINT_COMPLETE: s1")
        );
    }

    #[test]
    fn test_field_lines() {
        assert_eq!(
            lex_line("METRICS: {\"items_completed\": 2}"),
            Token::Field {
                key: FieldKey::Metrics,
                value: "{\"items_completed\": 2}"
            }
        );
        assert_eq!(
            lex_line("SUGGESTED_ACTION:"),
            Token::Field {
                key: FieldKey::SuggestedAction,
                value: ""
            }
        );
    }

    #[test]
    fn test_unknown_field_and_blank() {
        assert_eq!(lex_line("NOTES: hi"), Token::Text("NOTES: hi"));
        assert_eq!(lex_line("   "), Token::Blank);
        assert_eq!(lex("a\n\nb").count(), 3);
    }

    #[test]
    fn test_indented_lines_after_summary_are_text() {
        let tokens: Vec<_> = lex("SUMMARY: one\n ERROR: none\n\tTASK_COMPLETE: x\n  ok\nNOTE: n").collect();
        assert_eq!(tokens[1], Token::Text("ERROR: none"));
        assert_eq!(tokens[2], Token::Text("TASK_COMPLETE: x"));
        assert_eq!(tokens[3], Token::Text(" ok"));
        assert_eq!(
            tokens[4],
            Token::Field {
                key: FieldKey::Note,
                value: "n"
            }
        );

        // Outside a summary indentation means nothing
        assert_eq!(
            lex(" ERROR: boom").next(),
            Some(Token::Field {
                key: FieldKey::Error,
                value: "boom"
            })
        );
    }
}
