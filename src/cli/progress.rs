use crate::cli::ProgressArgs;
use chrono::Utc;
use epicflow::progress::{get_progress_at_level, ProgressReport};
use epicflow::state::record_sample;
use tracing::{info, warn};

pub fn execute(args: ProgressArgs) -> anyhow::Result<()> {
    let report = get_progress_at_level(&args.path, args.level);

    if let Some(error) = &report.error {
        warn!("{}", error);
    }

    if let Some(history_path) = &args.record {
        if report.error.is_none() {
            let history = record_sample(history_path, report.completion, Utc::now())?;
            info!(
                "Recorded sample {} in {}",
                history.len(),
                history_path.display()
            );
        } else {
            warn!("Not recording a sample for a failed report");
        }
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report));
    }

    Ok(())
}

/// Indented tree, one line per level
pub fn render(report: &ProgressReport) -> String {
    let mut out = String::new();
    render_into(report, 0, &mut out);
    out
}

fn render_into(report: &ProgressReport, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let level = report.level.map(|l| l.name()).unwrap_or("UNKNOWN");
    let name = report
        .title
        .clone()
        .unwrap_or_else(|| report.path.display().to_string());

    out.push_str(&format!(
        "{}{} {} [{}] {}%",
        indent,
        level,
        name,
        report.status,
        report.completion
    ));
    if let (Some(done), Some(total)) = (report.tasks_completed, report.tasks_total) {
        out.push_str(&format!(" ({}/{} tasks)", done, total));
    }
    if let Some(issue) = report.issue_number {
        out.push_str(&format!(" #{}", issue));
    }
    out.push('\n');

    if let Some(error) = &report.error {
        out.push_str(&format!("{}  error: {}\n", indent, error));
    }
    for child in &report.children {
        render_into(child, depth + 1, out);
    }
}
