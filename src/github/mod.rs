mod tracker;

pub use tracker::{
    closable_issue, close_if_complete, completion_summary, parse_repo, GhIssueTracker,
    IssueTracker,
};
