//! Token budget ledger: top-down allocation, bottom-up usage metering

mod ledger;
mod types;

pub use ledger::TokenBudget;
pub use types::{
    Allocation, AllocationStatus, BudgetCheck, BudgetOptions, BudgetSummary, ChildBudget,
    Release, UsageRecord,
};
