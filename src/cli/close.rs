use crate::cli::{load_config, CloseArgs};
use epicflow::github::{
    closable_issue, close_if_complete, completion_summary, parse_repo, GhIssueTracker,
};
use epicflow::progress::get_progress_at_level;
use tracing::info;

pub fn execute(args: CloseArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;

    let full_repo = args.repo.clone().or_else(|| config.github.repo.clone());
    let Some(full_repo) = full_repo else {
        anyhow::bail!(
            "No GitHub repository specified. Use --repo owner/repo or set github.repo in config"
        );
    };
    let (owner, repo) = parse_repo(&full_repo)?;

    let report = get_progress_at_level(&args.path, None);
    if let Some(error) = &report.error {
        anyhow::bail!("Cannot read progress: {}", error);
    }

    let Some(issue_number) = closable_issue(&report) else {
        println!(
            "Nothing to close: {}% complete{}",
            report.completion,
            if report.issue_number.is_none() {
                ", no tracker issue recorded"
            } else {
                ""
            }
        );
        return Ok(());
    };

    if args.dry_run {
        info!("DRY RUN - not closing");
        println!("Would close {}#{} with comment:", full_repo, issue_number);
        println!("{}", completion_summary(&report));
        return Ok(());
    }

    if !config.github.enabled {
        anyhow::bail!("GitHub integration is disabled in config. Set github.enabled: true");
    }

    if close_if_complete(&report, &owner, &repo, &GhIssueTracker::default()) {
        println!("Closed {}#{}", full_repo, issue_number);
        Ok(())
    } else {
        anyhow::bail!("Failed to close {}#{}", full_repo, issue_number)
    }
}
