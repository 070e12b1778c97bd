use serde_json::json;
use std::path::Path;
use tracing::{debug, warn};

use super::types::{GateResult, GateType};

pub const PHASES_DIR: &str = "phases";
pub const EXPLORATION_DIR: &str = "exploration";

/// Every `phases/<phase>/` directory under `dir` must hold an
/// `exploration/` directory containing each of `required_docs`. All missing
/// entries are reported together in `details.missing`.
pub fn check_docs_gate(dir: &Path, required_docs: &[String]) -> GateResult {
    let phases_dir = dir.join(PHASES_DIR);
    if !phases_dir.is_dir() {
        return GateResult::fail(GateType::Docs, "Missing phases/ directory")
            .with_details(json!({ "missing": [format!("{}/", PHASES_DIR)] }));
    }

    let entries = match std::fs::read_dir(&phases_dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read {}: {}", phases_dir.display(), e);
            return GateResult::fail(
                GateType::Docs,
                format!("Failed to read {}: {}", phases_dir.display(), e),
            );
        }
    };

    let mut phase_names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().is_dir())
        .map(|entry| entry.file_name().to_string_lossy().to_string())
        .collect();
    phase_names.sort();

    let mut missing = Vec::new();
    for name in &phase_names {
        let exploration = phases_dir.join(name).join(EXPLORATION_DIR);
        let prefix = format!("{}/{}/{}", PHASES_DIR, name, EXPLORATION_DIR);
        if !exploration.is_dir() {
            missing.push(format!("{}/", prefix));
            continue;
        }
        for doc in required_docs {
            if !exploration.join(doc).is_file() {
                missing.push(format!("{}/{}", prefix, doc));
            }
        }
    }

    debug!(
        "Docs gate checked {} phase(s), {} missing",
        phase_names.len(),
        missing.len()
    );

    if missing.is_empty() {
        GateResult::pass(
            GateType::Docs,
            format!("Documentation complete for {} phase(s)", phase_names.len()),
        )
        .with_details(json!({ "phases": phase_names.len() }))
    } else {
        GateResult::fail(
            GateType::Docs,
            format!("Missing {} documentation item(s)", missing.len()),
        )
        .with_details(json!({ "missing": missing }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gates::types::GateOutcome;
    use std::fs;

    fn docs() -> Vec<String> {
        vec![
            "EXPLORATION_SUMMARY.md".to_string(),
            "PHASE_BREAKDOWN.md".to_string(),
        ]
    }

    fn write_phase(root: &Path, name: &str, files: &[&str]) {
        let exploration = root.join(PHASES_DIR).join(name).join(EXPLORATION_DIR);
        fs::create_dir_all(&exploration).unwrap();
        for file in files {
            fs::write(exploration.join(file), "# doc").unwrap();
        }
    }

    #[test]
    fn test_missing_phases_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = check_docs_gate(dir.path(), &docs());
        assert_eq!(result.result, GateOutcome::Fail);
        assert_eq!(result.details.unwrap()["missing"][0], "phases/");
    }

    #[test]
    fn test_complete_docs_pass() {
        let dir = tempfile::tempdir().unwrap();
        write_phase(dir.path(), "phase-1", &["EXPLORATION_SUMMARY.md", "PHASE_BREAKDOWN.md"]);
        write_phase(dir.path(), "phase-2", &["EXPLORATION_SUMMARY.md", "PHASE_BREAKDOWN.md"]);

        let result = check_docs_gate(dir.path(), &docs());
        assert_eq!(result.result, GateOutcome::Pass);
        assert_eq!(result.details.unwrap()["phases"], 2);
    }

    #[test]
    fn test_all_missing_items_reported_together() {
        let dir = tempfile::tempdir().unwrap();
        write_phase(dir.path(), "phase-1", &["EXPLORATION_SUMMARY.md"]);
        fs::create_dir_all(dir.path().join(PHASES_DIR).join("phase-2")).unwrap();
        // Stray files are not phases
        fs::write(dir.path().join(PHASES_DIR).join("notes.txt"), "x").unwrap();

        let result = check_docs_gate(dir.path(), &docs());
        assert_eq!(result.result, GateOutcome::Fail);
        let details = result.details.unwrap();
        let missing: Vec<&str> = details["missing"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(
            missing,
            vec![
                "phases/phase-1/exploration/PHASE_BREAKDOWN.md",
                "phases/phase-2/exploration/",
            ]
        );
    }

    #[test]
    fn test_no_phases_passes() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join(PHASES_DIR)).unwrap();
        let result = check_docs_gate(dir.path(), &docs());
        assert_eq!(result.result, GateOutcome::Pass);
    }
}
