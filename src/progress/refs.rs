//! On-disk shapes of EPIC.json, ROADMAP.json and PROGRESS.json
//!
//! Both ROADMAP.json reference shapes are normalized into [`PhaseRef`] here
//! so aggregation never has to sniff field names.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const EPIC_FILE: &str = "EPIC.json";
pub const ROADMAP_FILE: &str = "ROADMAP.json";
pub const PROGRESS_FILE: &str = "PROGRESS.json";

#[derive(Debug, Deserialize)]
pub struct ProgressFile {
    #[serde(default)]
    pub phases: Vec<ProgressPhase>,

    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressPhase {
    #[serde(default)]
    pub tasks: Vec<ProgressTask>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressTask {
    #[serde(default)]
    pub status: String,
}

#[derive(Debug, Deserialize)]
struct RoadmapFile {
    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    phase_dev_refs: Option<Vec<RawPhaseRef>>,

    /// Legacy name for `phase_dev_refs`
    #[serde(default)]
    phases: Option<Vec<RawPhaseRef>>,

    #[serde(default)]
    metadata: RoadmapMetadata,
}

#[derive(Debug, Default, Deserialize)]
struct RoadmapMetadata {
    #[serde(default)]
    github_epic_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawPhaseRef {
    #[serde(default)]
    progress_path: Option<String>,

    /// Legacy name for `progress_path`
    #[serde(default)]
    path: Option<String>,

    #[serde(default, alias = "name")]
    title: Option<String>,

    #[serde(default)]
    weight: Option<f64>,
}

/// Canonical reference from a roadmap to one phase's PROGRESS.json
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseRef {
    pub progress_path: Option<PathBuf>,
    pub title: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Roadmap {
    pub title: Option<String>,
    pub phases: Vec<PhaseRef>,
    pub issue_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct EpicFile {
    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    roadmap_refs: Vec<RawRoadmapRef>,

    #[serde(default)]
    github_epic_number: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawRoadmapRef {
    #[serde(default)]
    roadmap_id: Option<String>,

    #[serde(default)]
    title: Option<String>,

    #[serde(default)]
    roadmap_path: Option<String>,

    #[serde(default)]
    weight: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RoadmapRef {
    pub id: Option<String>,
    pub title: String,
    pub roadmap_path: Option<PathBuf>,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Epic {
    pub title: Option<String>,
    pub roadmaps: Vec<RoadmapRef>,
    pub issue_number: Option<u64>,
}

/// Read and deserialize a JSON file, describing failures as plain text
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| format!("Failed to parse {}: {}", path.display(), e))
}

/// Accept either the state file itself or the directory holding it
pub fn resolve_file(path: &Path, file_name: &str) -> PathBuf {
    if path.is_dir() {
        path.join(file_name)
    } else {
        path.to_path_buf()
    }
}

/// Resolve a reference relative to the referencing file's directory,
/// falling back to the working directory when only that location exists.
pub fn resolve_ref(base_dir: &Path, raw: &str) -> PathBuf {
    let raw_path = Path::new(raw);
    if raw_path.is_absolute() {
        return raw_path.to_path_buf();
    }
    let candidate = base_dir.join(raw_path);
    if !candidate.exists() && raw_path.exists() {
        debug!("Resolved {} against the working directory", raw);
        return raw_path.to_path_buf();
    }
    candidate
}

pub fn load_roadmap(path: &Path) -> Result<Roadmap, String> {
    let file: RoadmapFile = read_json(path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));

    let raw_refs = file.phase_dev_refs.or(file.phases).unwrap_or_default();
    let phases = raw_refs
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| PhaseRef {
            progress_path: raw
                .progress_path
                .or(raw.path)
                .map(|p| resolve_ref(base_dir, &p)),
            title: raw.title.unwrap_or_else(|| format!("Phase {}", idx + 1)),
            weight: raw.weight.unwrap_or(1.0),
        })
        .collect();

    Ok(Roadmap {
        title: file.title,
        phases,
        issue_number: file.metadata.github_epic_number,
    })
}

pub fn load_epic(path: &Path) -> Result<Epic, String> {
    let file: EpicFile = read_json(path)?;
    let base_dir = path.parent().unwrap_or(Path::new("."));

    let roadmaps = file
        .roadmap_refs
        .into_iter()
        .enumerate()
        .map(|(idx, raw)| RoadmapRef {
            title: raw
                .title
                .or_else(|| raw.roadmap_id.clone())
                .unwrap_or_else(|| format!("Roadmap {}", idx + 1)),
            id: raw.roadmap_id,
            roadmap_path: raw.roadmap_path.map(|p| resolve_ref(base_dir, &p)),
            weight: raw.weight.unwrap_or(1.0),
        })
        .collect();

    Ok(Epic {
        title: file.title,
        roadmaps,
        issue_number: file.github_epic_number,
    })
}
