use std::path::Path;
use tracing::{debug, warn};

use super::refs::{
    load_epic, load_roadmap, read_json, resolve_file, ProgressFile, EPIC_FILE, PROGRESS_FILE,
    ROADMAP_FILE,
};
use super::status::{determine_status, rounded_completion};
use super::types::ProgressReport;
use crate::hierarchy::{Level, NodeStatus};

/// Completion of one phase from its PROGRESS.json task list.
///
/// Never fails: unreadable state yields completion 0, status failed and the
/// reason in `error`.
pub fn aggregate_phase_progress(path: &Path) -> ProgressReport {
    let file_path = resolve_file(path, PROGRESS_FILE);
    let progress: ProgressFile = match read_json(&file_path) {
        Ok(p) => p,
        Err(e) => {
            warn!("{}", e);
            return ProgressReport::failed(Some(Level::L2), &file_path, e);
        }
    };

    let statuses: Vec<NodeStatus> = progress
        .phases
        .iter()
        .flat_map(|phase| phase.tasks.iter())
        .map(|task| NodeStatus::parse_lenient(&task.status))
        .collect();

    let total = statuses.len();
    let completed = statuses
        .iter()
        .filter(|s| **s == NodeStatus::Completed)
        .count();
    let completion = if total == 0 {
        0
    } else {
        rounded_completion(100.0 * completed as f64 / total as f64, completed == total)
    };

    let stored = progress
        .status
        .as_deref()
        .map(NodeStatus::parse_lenient)
        .unwrap_or_default();
    let status = if completion == 100 {
        NodeStatus::Completed
    } else if completed > 0 {
        NodeStatus::InProgress
    } else {
        stored
    };

    debug!(
        "Phase {}: {}/{} tasks completed ({}%)",
        file_path.display(),
        completed,
        total,
        completion
    );

    ProgressReport {
        completion,
        status,
        tasks_completed: Some(completed),
        tasks_total: Some(total),
        ..ProgressReport::new(Level::L2, &file_path)
    }
}

/// Unweighted mean of every referenced phase's completion
pub fn aggregate_roadmap_progress(path: &Path) -> ProgressReport {
    let file_path = resolve_file(path, ROADMAP_FILE);
    let roadmap = match load_roadmap(&file_path) {
        Ok(r) => r,
        Err(e) => {
            warn!("{}", e);
            return ProgressReport::failed(Some(Level::L1), &file_path, e);
        }
    };

    let children: Vec<ProgressReport> = roadmap
        .phases
        .iter()
        .map(|phase| {
            let mut report = match &phase.progress_path {
                Some(progress_path) => aggregate_phase_progress(progress_path),
                None => ProgressReport::failed(
                    Some(Level::L2),
                    &file_path,
                    format!("Phase reference '{}' has no progress path", phase.title),
                ),
            };
            report.title = Some(phase.title.clone());
            report
        })
        .collect();

    let completion = if children.is_empty() {
        0
    } else {
        let sum: f64 = children.iter().map(|c| c.completion as f64).sum();
        let finished = children.iter().all(|c| c.completion == 100);
        rounded_completion(sum / children.len() as f64, finished)
    };

    finish(
        ProgressReport {
            title: roadmap.title,
            completion,
            issue_number: roadmap.issue_number,
            ..ProgressReport::new(Level::L1, &file_path)
        },
        children,
    )
}

/// Weighted mean of every referenced roadmap's completion (weight defaults to 1)
pub fn aggregate_epic_progress(path: &Path) -> ProgressReport {
    let file_path = resolve_file(path, EPIC_FILE);
    let epic = match load_epic(&file_path) {
        Ok(e) => e,
        Err(e) => {
            warn!("{}", e);
            return ProgressReport::failed(Some(Level::L0), &file_path, e);
        }
    };

    let children: Vec<ProgressReport> = epic
        .roadmaps
        .iter()
        .map(|roadmap| {
            let mut report = match &roadmap.roadmap_path {
                Some(roadmap_path) => aggregate_roadmap_progress(roadmap_path),
                None => ProgressReport::failed(
                    Some(Level::L1),
                    &file_path,
                    format!("Roadmap reference '{}' has no roadmap path", roadmap.title),
                ),
            };
            report.title = Some(roadmap.title.clone());
            report.weight = Some(roadmap.weight);
            report
        })
        .collect();

    let total_weight: f64 = children.iter().filter_map(|c| c.weight).sum();
    let completion = if total_weight > 0.0 {
        let weighted: f64 = children
            .iter()
            .map(|c| c.completion as f64 * c.weight.unwrap_or(1.0))
            .sum();
        let finished = children.iter().all(|c| c.completion == 100);
        rounded_completion(weighted / total_weight, finished)
    } else {
        0
    };

    finish(
        ProgressReport {
            title: epic.title,
            completion,
            issue_number: epic.issue_number,
            ..ProgressReport::new(Level::L0, &file_path)
        },
        children,
    )
}

fn finish(mut report: ProgressReport, children: Vec<ProgressReport>) -> ProgressReport {
    let statuses: Vec<NodeStatus> = children.iter().map(|c| c.status).collect();
    report.status = determine_status(&statuses);
    report.children = children;
    report
}

/// Aggregate whatever level lives at `path`.
///
/// With a hint the matching aggregator runs directly. Otherwise the level is
/// detected from the file name, or for a directory from which state file it
/// holds (epic, then roadmap, then phase).
pub fn get_progress_at_level(path: &Path, level_hint: Option<Level>) -> ProgressReport {
    let level = level_hint.or_else(|| detect_level(path));
    debug!("Aggregating {} at level {:?}", path.display(), level);

    match level {
        Some(Level::L0) => aggregate_epic_progress(path),
        Some(Level::L1) => aggregate_roadmap_progress(path),
        Some(Level::L2) => aggregate_phase_progress(path),
        Some(Level::L3) => ProgressReport::failed(
            Some(Level::L3),
            path,
            "Tasks have no progress file; aggregate their phase instead",
        ),
        None => ProgressReport::failed(
            None,
            path,
            format!("Could not detect hierarchy level at {}", path.display()),
        ),
    }
}

fn detect_level(path: &Path) -> Option<Level> {
    if path.is_dir() {
        return [
            (EPIC_FILE, Level::L0),
            (ROADMAP_FILE, Level::L1),
            (PROGRESS_FILE, Level::L2),
        ]
        .into_iter()
        .find(|(name, _)| path.join(name).is_file())
        .map(|(_, level)| level);
    }

    match path.file_name().and_then(|n| n.to_str()) {
        Some(EPIC_FILE) => Some(Level::L0),
        Some(ROADMAP_FILE) => Some(Level::L1),
        Some(name) if name.ends_with(PROGRESS_FILE) => Some(Level::L2),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::path::PathBuf;

    fn write_phase(dir: &Path, name: &str, statuses: &[&str]) -> PathBuf {
        let phase_dir = dir.join(name);
        fs::create_dir_all(&phase_dir).unwrap();
        let tasks: Vec<_> = statuses
            .iter()
            .enumerate()
            .map(|(i, s)| json!({"id": format!("{}-{}", name, i), "title": "t", "status": s}))
            .collect();
        let path = phase_dir.join(PROGRESS_FILE);
        fs::write(
            &path,
            json!({"phases": [{"tasks": tasks}], "status": "pending"}).to_string(),
        )
        .unwrap();
        path
    }

    fn write_roadmap(dir: &Path, phases: &[(&str, &[&str])]) -> PathBuf {
        fs::create_dir_all(dir).unwrap();
        let refs: Vec<_> = phases
            .iter()
            .map(|(name, statuses)| {
                write_phase(dir, name, statuses);
                json!({"progress_path": format!("{}/PROGRESS.json", name), "title": name})
            })
            .collect();
        let path = dir.join(ROADMAP_FILE);
        fs::write(&path, json!({"phase_dev_refs": refs}).to_string()).unwrap();
        path
    }

    #[test]
    fn test_phase_half_done() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_phase(
            dir.path(),
            "p1",
            &["completed", "completed", "pending", "in_progress"],
        );

        let report = aggregate_phase_progress(&path);
        assert_eq!(report.completion, 50);
        assert_eq!(report.status, NodeStatus::InProgress);
        assert_eq!(report.tasks_completed, Some(2));
        assert_eq!(report.tasks_total, Some(4));
        assert!(report.error.is_none());
    }

    #[test]
    fn test_phase_all_done_overrides_stored_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_phase(dir.path(), "p1", &["completed", "completed"]);
        let report = aggregate_phase_progress(&path.parent().unwrap().to_path_buf());
        assert_eq!(report.completion, 100);
        assert_eq!(report.status, NodeStatus::Completed);
    }

    #[test]
    fn test_phase_without_progress_keeps_stored_status() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(PROGRESS_FILE);
        fs::write(&path, r#"{"phases": [{"tasks": []}], "status": "blocked"}"#).unwrap();

        let report = aggregate_phase_progress(&path);
        assert_eq!(report.completion, 0);
        assert_eq!(report.status, NodeStatus::Blocked);
        assert_eq!(report.tasks_total, Some(0));
    }

    #[test]
    fn test_phase_missing_or_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let report = aggregate_phase_progress(&dir.path().join("missing/PROGRESS.json"));
        assert_eq!(report.completion, 0);
        assert_eq!(report.status, NodeStatus::Failed);
        assert!(report.error.is_some());

        let corrupt = dir.path().join(PROGRESS_FILE);
        fs::write(&corrupt, "{{{").unwrap();
        let report = aggregate_phase_progress(&corrupt);
        assert_eq!(report.status, NodeStatus::Failed);
        assert!(report.error.unwrap().contains("Failed to parse"));
    }

    #[test]
    fn test_roadmap_unweighted_mean() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_roadmap(
            dir.path(),
            &[
                ("p1", &["completed", "completed"]),
                ("p2", &["completed"]),
                ("p3", &["completed", "pending"]),
            ],
        );

        let report = aggregate_roadmap_progress(&path);
        assert_eq!(report.completion, 83);
        assert_eq!(report.status, NodeStatus::InProgress);
        assert_eq!(report.children.len(), 3);
        assert_eq!(report.children[2].title.as_deref(), Some("p3"));
    }

    #[test]
    fn test_roadmap_complete_only_when_every_phase_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_roadmap(
            dir.path(),
            &[("p1", &["completed"]), ("p2", &["completed", "completed"])],
        );
        let report = aggregate_roadmap_progress(&path);
        assert_eq!(report.completion, 100);
        assert_eq!(report.status, NodeStatus::Completed);
    }

    #[test]
    fn test_roadmap_missing_phase_fails_rollup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(ROADMAP_FILE);
        fs::write(
            &path,
            r#"{"phases": [{"path": "ghost", "title": "Ghost"}, {"title": "No path"}]}"#,
        )
        .unwrap();

        let report = aggregate_roadmap_progress(&path);
        assert_eq!(report.completion, 0);
        assert_eq!(report.status, NodeStatus::Failed);
        assert!(report.children.iter().all(|c| c.error.is_some()));
    }

    #[test]
    fn test_epic_weighted_mean() {
        let dir = tempfile::tempdir().unwrap();
        write_roadmap(&dir.path().join("r1"), &[("p1", &["completed"])]);
        write_roadmap(&dir.path().join("r2"), &[("p1", &["pending", "pending"])]);
        let path = dir.path().join(EPIC_FILE);
        fs::write(
            &path,
            json!({
                "roadmap_refs": [
                    {"roadmap_id": "r1", "title": "R1", "roadmap_path": "r1/ROADMAP.json", "weight": 3},
                    {"roadmap_id": "r2", "title": "R2", "roadmap_path": "r2"}
                ],
                "github_epic_number": 12
            })
            .to_string(),
        )
        .unwrap();

        let report = aggregate_epic_progress(&path);
        // (100 * 3 + 0 * 1) / 4
        assert_eq!(report.completion, 75);
        assert_eq!(report.status, NodeStatus::Pending);
        assert_eq!(report.issue_number, Some(12));
        assert_eq!(report.children[0].weight, Some(3.0));
    }

    #[test]
    fn test_detects_level_from_directory_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let roadmap = write_roadmap(dir.path(), &[("p1", &["completed"])]);

        let report = get_progress_at_level(dir.path(), None);
        assert_eq!(report.level, Some(Level::L1));
        assert_eq!(report.completion, 100);

        let phase = get_progress_at_level(&dir.path().join("p1/PROGRESS.json"), None);
        assert_eq!(phase.level, Some(Level::L2));

        let hinted = get_progress_at_level(&roadmap, Some(Level::L1));
        assert_eq!(hinted.completion, 100);
    }

    #[test]
    fn test_undetectable_level() {
        let dir = tempfile::tempdir().unwrap();
        let report = get_progress_at_level(dir.path(), None);
        assert_eq!(report.level, None);
        assert_eq!(report.status, NodeStatus::Failed);
        assert!(report.error.unwrap().contains("Could not detect"));
    }

    #[test]
    fn test_phase_never_rounds_up_to_complete() {
        let dir = tempfile::tempdir().unwrap();
        let mut statuses = vec!["completed"; 199];
        statuses.push("pending");
        let path = write_phase(dir.path(), "p1", &statuses);

        let report = aggregate_phase_progress(&path);
        assert_eq!(report.completion, 99);
        assert_eq!(report.status, NodeStatus::InProgress);
        assert_eq!(report.tasks_completed, Some(199));
    }

    #[test]
    fn test_roadmap_never_rounds_up_to_complete() {
        let dir = tempfile::tempdir().unwrap();
        let mut nearly = vec!["completed"; 199];
        nearly.push("pending");
        let path = write_roadmap(
            dir.path(),
            &[("p1", &["completed"]), ("p2", nearly.as_slice())],
        );

        let report = aggregate_roadmap_progress(&path);
        assert_eq!(report.children[1].completion, 99);
        // mean of [100, 99] is 99.5
        assert_eq!(report.completion, 99);
        assert_ne!(report.status, NodeStatus::Completed);
    }
}
