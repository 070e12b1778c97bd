//! One parent's side of the delegation loop
//!
//! A [`Coordinator`] owns a parent node and its ledger. It allocates a
//! slice of budget to each child it spawns, folds the child's reported
//! results back into the tree and the ledger, and checks gates before the
//! parent advances.

use std::path::Path;
use tracing::{debug, info, warn};

use crate::budget::TokenBudget;
use crate::config::GatingConfig;
use crate::error::{EpicflowError, HierarchyError, ProtocolError};
use crate::gates::{check_gates, GateReport, TestRunner};
use crate::hierarchy::{HierarchyNode, NodeStatus};
use crate::protocol::{
    create_spawn_message, parse_completion_output, DelegationMessage, MessageBody, SpawnContext,
};

#[derive(Debug, Clone)]
pub struct Advance {
    pub report: GateReport,
    /// True when every child completed and the gates let the parent through
    pub advanced: bool,
}

#[derive(Debug, Clone)]
pub struct Coordinator {
    root: HierarchyNode,
    budget: TokenBudget,
}

impl Coordinator {
    pub fn new(root: HierarchyNode, budget: TokenBudget) -> Self {
        Self { root, budget }
    }

    pub fn root(&self) -> &HierarchyNode {
        &self.root
    }

    pub fn budget(&self) -> &TokenBudget {
        &self.budget
    }

    pub fn into_parts(self) -> (HierarchyNode, TokenBudget) {
        (self.root, self.budget)
    }

    /// Allocate `amount` to a new child, attach it in progress, and return
    /// the spawn message to hand to the executor.
    ///
    /// `ctx.parent_id` and `ctx.token_budget` are filled in from the
    /// coordinator. Nothing is allocated if the child cannot be attached.
    pub fn spawn(
        &mut self,
        mut ctx: SpawnContext,
        amount: i64,
    ) -> Result<DelegationMessage, EpicflowError> {
        let level = self
            .root
            .level
            .child()
            .ok_or_else(|| HierarchyError::InvalidChildLevel {
                id: ctx.child_id.clone(),
                parent: self.root.level.to_string(),
                child: "none".to_string(),
            })?;
        if self.root.child(&ctx.child_id).is_some() {
            return Err(HierarchyError::DuplicateChild(self.root.id.clone()).into());
        }

        self.budget.allocate(&ctx.child_id, amount, None)?;

        let mut child = HierarchyNode::new(&ctx.child_id, &ctx.title, level);
        child.set_status(NodeStatus::InProgress);
        self.root.add_child(child)?;
        self.root.roll_up();

        ctx.parent_id = self.root.id.clone();
        ctx.token_budget = Some(amount);
        info!("Spawned {} under {} with {} tokens", ctx.child_id, self.root.id, amount);
        Ok(create_spawn_message(level, ctx))
    }

    /// Fold executor output into the tree and the ledger.
    ///
    /// Returns `Ok(None)` when the output carries no completion marker yet.
    pub fn handle_output(&mut self, text: &str) -> Result<Option<DelegationMessage>, EpicflowError> {
        let Some(msg) = parse_completion_output(text)? else {
            debug!("No completion marker in output for {}", self.root.id);
            return Ok(None);
        };
        self.apply(&msg)?;
        Ok(Some(msg))
    }

    /// Apply an already-parsed message from a child.
    ///
    /// Completed and failed children are final: later reports for them are
    /// rejected and change nothing.
    pub fn apply(&mut self, msg: &DelegationMessage) -> Result<(), EpicflowError> {
        let id = msg.subject_id();
        let Some(child) = self.root.child_mut(id) else {
            return Err(HierarchyError::UnknownChild(id.to_string()).into());
        };
        if child.level != msg.level {
            warn!("{} reported as {} but is {}", id, msg.level, child.level);
        }
        if child.status.is_terminal() {
            warn!("Ignoring {} report for {} child {}", msg.kind(), child.status, id);
            return Err(HierarchyError::ChildFinished {
                id: id.to_string(),
                status: child.status.to_string(),
            }
            .into());
        }

        match &msg.body {
            MessageBody::Complete(report) => {
                if let Some(tokens) = report.metrics.tokens_used {
                    self.budget.track_usage(id, tokens)?;
                }
                child.set_status(NodeStatus::Completed);
                child.set_completion(100);
            }
            MessageBody::Blocked(report) => {
                warn!("{} blocked: {}", id, report.blocker);
                child.set_status(NodeStatus::Blocked);
            }
            MessageBody::Failed(report) => {
                warn!("{} failed: {}", id, report.error);
                child.set_status(NodeStatus::Failed);
            }
            MessageBody::Progress(update) => {
                child.set_status(NodeStatus::InProgress);
                child.set_completion(update.completion);
            }
            MessageBody::Spawn(_) => {
                return Err(ProtocolError::WrongMessageType {
                    expected: "child report",
                    actual: msg.kind(),
                }
                .into());
            }
        }

        self.root.roll_up();
        debug!(
            "{} now {} at {}%",
            self.root.id, self.root.status, self.root.completion
        );
        Ok(())
    }

    /// Return a child's unspent budget and detach it
    pub fn retire(&mut self, child_id: &str) -> Result<(HierarchyNode, i64), EpicflowError> {
        let (node, released) = self.root.remove_child(child_id, &mut self.budget)?;
        self.root.roll_up();
        info!("Retired {} ({} tokens released)", child_id, released);
        Ok((node, released))
    }

    /// Check gates before the parent advances.
    ///
    /// A parent whose children are all complete becomes completed only when
    /// the gates pass; otherwise it is held as blocked until they are fixed
    /// or overridden.
    pub async fn advance(
        &mut self,
        roadmap_path: &Path,
        gating: &GatingConfig,
        runner: &dyn TestRunner,
    ) -> Advance {
        self.root.roll_up();
        let report = check_gates(roadmap_path, gating, runner).await;

        let work_done = !self.root.children.is_empty()
            && self
                .root
                .children
                .iter()
                .all(|c| c.status == NodeStatus::Completed);

        let advanced = work_done && report.passed();
        if advanced {
            self.root.set_status(NodeStatus::Completed);
            self.root.set_completion(100);
            info!("{} advanced", self.root.id);
        } else if work_done {
            self.root.set_status(NodeStatus::Blocked);
            warn!("{} held by failing gates", self.root.id);
        }

        Advance { report, advanced }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::{AllocationStatus, BudgetOptions};
    use crate::error::BudgetError;
    use crate::gates::{CommandOutput, COMMAND_NOT_FOUND};
    use crate::hierarchy::Level;
    use async_trait::async_trait;
    use std::time::Duration;

    struct NoTests;

    #[async_trait]
    impl TestRunner for NoTests {
        async fn run(
            &self,
            _command: &str,
            _cwd: &Path,
            _timeout: Duration,
        ) -> Result<CommandOutput, crate::error::GateError> {
            Ok(CommandOutput {
                exit_code: COMMAND_NOT_FOUND,
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::ZERO,
            })
        }
    }

    fn roadmap() -> Coordinator {
        Coordinator::new(
            HierarchyNode::new("roadmap-1", "Auth", Level::L1),
            TokenBudget::new(100_000, BudgetOptions::default()),
        )
    }

    fn ctx(id: &str) -> SpawnContext {
        SpawnContext {
            child_id: id.to_string(),
            title: format!("Phase {}", id),
            scope: "do the work".to_string(),
            ..SpawnContext::default()
        }
    }

    #[test]
    fn test_spawn_allocates_and_attaches() {
        let mut coord = roadmap();
        let msg = coord.spawn(ctx("p1"), 40_000).unwrap();

        assert_eq!(msg.level, Level::L2);
        let MessageBody::Spawn(spawn) = &msg.body else {
            panic!("expected spawn");
        };
        assert_eq!(spawn.parent_id, "roadmap-1");
        assert_eq!(spawn.token_budget, Some(40_000));

        assert_eq!(coord.budget().available, 60_000);
        assert_eq!(coord.root().child("p1").unwrap().status, NodeStatus::InProgress);
        assert_eq!(coord.root().status, NodeStatus::InProgress);
    }

    #[test]
    fn test_spawn_over_budget_attaches_nothing() {
        let mut coord = roadmap();
        let err = coord.spawn(ctx("p1"), 200_000).unwrap_err();
        assert!(matches!(
            err,
            EpicflowError::Budget(BudgetError::InsufficientBudget { .. })
        ));
        assert!(coord.root().children.is_empty());
    }

    #[test]
    fn test_duplicate_spawn_keeps_ledger_unchanged() {
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 10_000).unwrap();
        let err = coord.spawn(ctx("p1"), 10_000).unwrap_err();
        assert!(matches!(
            err,
            EpicflowError::Hierarchy(HierarchyError::DuplicateChild(_))
        ));
        assert_eq!(coord.budget().available, 90_000);
    }

    #[test]
    fn test_task_cannot_spawn() {
        let mut coord = Coordinator::new(
            HierarchyNode::new("t1", "Leaf", Level::L3),
            TokenBudget::new(1_000, BudgetOptions::default()),
        );
        let err = coord.spawn(ctx("x"), 10).unwrap_err();
        assert!(matches!(
            err,
            EpicflowError::Hierarchy(HierarchyError::InvalidChildLevel { .. })
        ));
        assert_eq!(coord.budget().available, 1_000);
    }

    #[test]
    fn test_complete_output_meters_usage_and_rolls_up() {
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 40_000).unwrap();
        coord.spawn(ctx("p2"), 20_000).unwrap();

        let out = "PHASE_COMPLETE: p1\nMETRICS: {\"tokens_used\": 35000}\nSUMMARY: done";
        let msg = coord.handle_output(out).unwrap().unwrap();
        assert_eq!(msg.kind(), "complete");

        let alloc = &coord.budget().allocations["p1"];
        assert_eq!(alloc.used, 35_000);
        assert_eq!(alloc.status, AllocationStatus::Low);
        assert!(coord.budget().should_compact("p1", None));

        let root = coord.root();
        assert_eq!(root.child("p1").unwrap().completion, 100);
        assert_eq!(root.completion, 50);
        assert_eq!(root.status, NodeStatus::InProgress);
    }

    #[test]
    fn test_blocked_child_blocks_parent() {
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 10_000).unwrap();
        coord
            .handle_output("PHASE_BLOCKED: p1\nBLOCKER: no creds")
            .unwrap();
        assert_eq!(coord.root().status, NodeStatus::Blocked);
    }

    #[test]
    fn test_progress_and_unmarked_output() {
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 10_000).unwrap();
        assert!(coord.handle_output("thinking...").unwrap().is_none());

        coord
            .handle_output("PHASE_PROGRESS: p1\nCOMPLETION: 40")
            .unwrap();
        assert_eq!(coord.root().completion, 40);
    }

    #[test]
    fn test_duplicate_complete_is_metered_once() {
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 40_000).unwrap();
        coord.spawn(ctx("p2"), 10_000).unwrap();

        let out = "PHASE_COMPLETE: p1\nMETRICS: {\"tokens_used\": 4000}\nSUMMARY: done";
        coord.handle_output(out).unwrap();
        let err = coord.handle_output(out).unwrap_err();
        assert!(matches!(
            err,
            EpicflowError::Hierarchy(HierarchyError::ChildFinished { .. })
        ));
        assert_eq!(coord.budget().allocations["p1"].used, 4_000);
        assert_eq!(coord.budget().usage_history.len(), 1);
    }

    #[test]
    fn test_late_reports_leave_finished_child_alone() {
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 10_000).unwrap();
        coord.handle_output("PHASE_COMPLETE: p1\nSUMMARY: done").unwrap();

        assert!(coord
            .handle_output("PHASE_FAILED: p1\nERROR: late")
            .is_err());
        assert!(coord
            .handle_output("PHASE_PROGRESS: p1\nCOMPLETION: 10")
            .is_err());

        let child = coord.root().child("p1").unwrap();
        assert_eq!(child.status, NodeStatus::Completed);
        assert_eq!(child.completion, 100);
        assert_eq!(coord.root().status, NodeStatus::Completed);

        coord.spawn(ctx("p2"), 10_000).unwrap();
        coord.handle_output("PHASE_FAILED: p2\nERROR: boom").unwrap();
        assert!(coord
            .handle_output("PHASE_COMPLETE: p2\nSUMMARY: retried")
            .is_err());
        assert_eq!(coord.root().child("p2").unwrap().status, NodeStatus::Failed);
    }

    #[test]
    fn test_rejected_usage_leaves_child_running() {
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 10_000).unwrap();

        let err = coord
            .handle_output("PHASE_COMPLETE: p1\nMETRICS: {\"tokens_used\": -5}\nSUMMARY: done")
            .unwrap_err();
        assert!(matches!(
            err,
            EpicflowError::Budget(BudgetError::NegativeAmount(-5))
        ));

        let child = coord.root().child("p1").unwrap();
        assert_eq!(child.status, NodeStatus::InProgress);
        assert_eq!(child.completion, 0);
        assert_eq!(coord.budget().allocations["p1"].used, 0);
    }

    #[test]
    fn test_unknown_child_in_output() {
        let mut coord = roadmap();
        let err = coord
            .handle_output("PHASE_FAILED: ghost\nERROR: boom")
            .unwrap_err();
        assert!(matches!(
            err,
            EpicflowError::Hierarchy(HierarchyError::UnknownChild(_))
        ));
    }

    #[test]
    fn test_retire_releases_unspent() {
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 40_000).unwrap();
        coord
            .handle_output("PHASE_COMPLETE: p1\nMETRICS: {\"tokensUsed\": 15000}")
            .unwrap();

        let (node, released) = coord.retire("p1").unwrap();
        assert_eq!(node.id, "p1");
        assert_eq!(released, 25_000);
        assert_eq!(coord.budget().available, 85_000);
        assert!(coord.root().children.is_empty());
    }

    #[tokio::test]
    async fn test_advance_after_all_children_complete() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 10_000).unwrap();

        let gating = GatingConfig {
            require_tests: true,
            ..GatingConfig::default()
        };
        let early = coord.advance(dir.path(), &gating, &NoTests).await;
        assert!(!early.advanced);
        assert_eq!(coord.root().status, NodeStatus::InProgress);

        coord.handle_output("PHASE_COMPLETE: p1").unwrap();
        let done = coord.advance(dir.path(), &gating, &NoTests).await;
        assert!(done.advanced);
        assert_eq!(coord.root().status, NodeStatus::Completed);
    }

    #[tokio::test]
    async fn test_failing_gate_holds_parent() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = roadmap();
        coord.spawn(ctx("p1"), 10_000).unwrap();
        coord.handle_output("PHASE_COMPLETE: p1").unwrap();

        let gating = GatingConfig {
            require_docs: true,
            ..GatingConfig::default()
        };
        let outcome = coord.advance(dir.path(), &gating, &NoTests).await;
        assert!(!outcome.advanced);
        assert!(outcome.report.can_override);
        assert_eq!(coord.root().status, NodeStatus::Blocked);
    }
}
