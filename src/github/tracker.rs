use std::process::Command;
use tracing::{debug, info, warn};

use crate::error::GitHubError;
use crate::progress::ProgressReport;

/// External issue tracker that mirrors hierarchy completion
pub trait IssueTracker {
    /// Close an issue with a summary comment. Failures are reported as
    /// `false`, never raised.
    fn close_issue(&self, owner: &str, repo: &str, issue_number: u64, summary: &str) -> bool;
}

/// Closes issues through the `gh` CLI
#[derive(Debug, Clone)]
pub struct GhIssueTracker {
    pub binary: String,
}

impl Default for GhIssueTracker {
    fn default() -> Self {
        Self {
            binary: "gh".to_string(),
        }
    }
}

impl GhIssueTracker {
    fn try_close(
        &self,
        owner: &str,
        repo: &str,
        issue_number: u64,
        summary: &str,
    ) -> Result<(), GitHubError> {
        let full_repo = format!("{}/{}", owner, repo);

        let mut cmd = Command::new(&self.binary);
        cmd.arg("issue")
            .arg("close")
            .arg(issue_number.to_string())
            .arg("--repo")
            .arg(&full_repo)
            .arg("--comment")
            .arg(summary);

        debug!("Closing {}#{}", full_repo, issue_number);
        let output = cmd.output().map_err(GitHubError::Io)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GitHubError::GhCli(stderr.trim().to_string()));
        }
        Ok(())
    }
}

impl IssueTracker for GhIssueTracker {
    fn close_issue(&self, owner: &str, repo: &str, issue_number: u64, summary: &str) -> bool {
        match self.try_close(owner, repo, issue_number, summary) {
            Ok(()) => {
                info!("Closed {}/{}#{}", owner, repo, issue_number);
                true
            }
            Err(e) => {
                warn!("Failed to close {}/{}#{}: {}", owner, repo, issue_number, e);
                false
            }
        }
    }
}

/// Split `owner/repo`
pub fn parse_repo(full: &str) -> Result<(String, String), GitHubError> {
    match full.trim().split_once('/') {
        Some((owner, repo))
            if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
        {
            Ok((owner.to_string(), repo.to_string()))
        }
        _ => Err(GitHubError::InvalidRepo(full.to_string())),
    }
}

/// Issue that should be closed for this report, if any
pub fn closable_issue(report: &ProgressReport) -> Option<u64> {
    if report.is_complete() && report.error.is_none() {
        report.issue_number
    } else {
        None
    }
}

/// Comment posted when a level's issue is closed
pub fn completion_summary(report: &ProgressReport) -> String {
    let name = report
        .title
        .clone()
        .unwrap_or_else(|| report.path.display().to_string());
    let level = report
        .level
        .map(|l| l.name().to_ascii_lowercase())
        .unwrap_or_else(|| "work item".to_string());

    let mut summary = format!("{} {} reached 100% completion.", capitalize(&level), name);
    if !report.children.is_empty() {
        let lines: Vec<String> = report
            .children
            .iter()
            .map(|c| {
                format!(
                    "- {}: {}%",
                    c.title.as_deref().unwrap_or("(untitled)"),
                    c.completion
                )
            })
            .collect();
        summary.push_str("\n\n");
        summary.push_str(&lines.join("\n"));
    }
    summary
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Close the report's tracker issue once it is fully complete.
///
/// Returns whether an issue was closed.
pub fn close_if_complete(
    report: &ProgressReport,
    owner: &str,
    repo: &str,
    tracker: &dyn IssueTracker,
) -> bool {
    let Some(issue_number) = closable_issue(report) else {
        debug!(
            "{} at {}%, no issue to close",
            report.path.display(),
            report.completion
        );
        return false;
    };
    tracker.close_issue(owner, repo, issue_number, &completion_summary(report))
}
