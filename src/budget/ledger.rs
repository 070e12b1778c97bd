use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::types::{
    Allocation, AllocationStatus, BudgetCheck, BudgetOptions, BudgetSummary, ChildBudget,
    Release, UsageRecord,
};
use crate::error::BudgetError;

/// Token ledger owned by one parent node.
///
/// The ledger is a plain value: every mutating method takes `&mut self`, so
/// the borrow checker enforces the single-writer contract. Wrap it in a
/// `Mutex` if several threads must share one parent's ledger.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TokenBudget {
    pub total: i64,
    pub used: i64,
    pub available: i64,
    pub compaction_threshold: f64,
    pub allow_reallocation: bool,
    #[serde(default)]
    pub allocations: BTreeMap<String, Allocation>,
    #[serde(default)]
    pub usage_history: Vec<UsageRecord>,
}

impl TokenBudget {
    pub fn new(total: i64, options: BudgetOptions) -> Self {
        Self {
            total,
            used: 0,
            available: total,
            compaction_threshold: options.compaction_threshold,
            allow_reallocation: options.allow_reallocation,
            allocations: BTreeMap::new(),
            usage_history: Vec::new(),
        }
    }

    /// Carve `amount` out of the parent's available pool for `child_id`
    pub fn allocate(
        &mut self,
        child_id: &str,
        amount: i64,
        metadata: Option<serde_json::Value>,
    ) -> Result<&Allocation, BudgetError> {
        if amount < 0 {
            return Err(BudgetError::NegativeAmount(amount));
        }
        if amount > self.available {
            return Err(BudgetError::InsufficientBudget {
                child_id: child_id.to_string(),
                requested: amount,
                available: self.available,
            });
        }
        if self.allocations.contains_key(child_id) {
            return Err(BudgetError::DuplicateAllocation(child_id.to_string()));
        }

        self.available -= amount;
        debug!(
            "Allocated {} tokens to {} ({} left unallocated)",
            amount, child_id, self.available
        );

        let allocation = self
            .allocations
            .entry(child_id.to_string())
            .or_insert(Allocation {
                allocated: amount,
                used: 0,
                available: amount,
                status: AllocationStatus::Healthy,
                metadata,
                allocated_at: Utc::now(),
                released: false,
            });
        Ok(allocation)
    }

    /// Record `amount` tokens consumed by `child_id`
    pub fn track_usage(&mut self, child_id: &str, amount: i64) -> Result<&Allocation, BudgetError> {
        if amount < 0 {
            return Err(BudgetError::NegativeAmount(amount));
        }
        let threshold = self.compaction_threshold;
        let allocation = self
            .allocations
            .get_mut(child_id)
            .ok_or_else(|| BudgetError::UnknownChild(child_id.to_string()))?;
        if allocation.released {
            return Err(BudgetError::AlreadyReleased(child_id.to_string()));
        }

        allocation.used += amount;
        allocation.available = allocation.allocated - allocation.used;
        allocation.status = derive_status(allocation, threshold);
        self.used += amount;

        self.usage_history.push(UsageRecord {
            child_id: child_id.to_string(),
            amount,
            timestamp: Utc::now(),
        });

        if allocation.status == AllocationStatus::Exhausted {
            warn!(
                "Budget for {} exhausted: {} of {} tokens used",
                child_id, allocation.used, allocation.allocated
            );
        }

        Ok(allocation)
    }

    pub fn check(&self, child_id: &str) -> BudgetCheck {
        match self.allocations.get(child_id) {
            Some(allocation) => {
                let ratio = usage_ratio(allocation);
                BudgetCheck::Allocated {
                    total: allocation.allocated,
                    used: allocation.used,
                    available: allocation.available,
                    usage_percentage: ratio * 100.0,
                    should_compact: ratio >= self.compaction_threshold,
                }
            }
            None => BudgetCheck::NotAllocated {
                message: format!("No budget allocated for {}", child_id),
            },
        }
    }

    /// Whether `child_id` has consumed enough of its slice to warrant compaction.
    /// Unknown children never need compaction.
    pub fn should_compact(&self, child_id: &str, threshold_override: Option<f64>) -> bool {
        let threshold = threshold_override.unwrap_or(self.compaction_threshold);
        self.allocations
            .get(child_id)
            .map(|a| usage_ratio(a) >= threshold)
            .unwrap_or(false)
    }

    /// Move `amount` of unspent allocation from one child to another
    pub fn reallocate(&mut self, from_id: &str, to_id: &str, amount: i64) -> Result<(), BudgetError> {
        if !self.allow_reallocation {
            return Err(BudgetError::ReallocationDisabled);
        }
        if amount < 0 {
            return Err(BudgetError::NegativeAmount(amount));
        }
        match self.allocations.get(to_id) {
            None => return Err(BudgetError::UnknownChild(to_id.to_string())),
            Some(to) if to.released => {
                return Err(BudgetError::AlreadyReleased(to_id.to_string()))
            }
            Some(_) => {}
        }

        let threshold = self.compaction_threshold;
        let from = self
            .allocations
            .get_mut(from_id)
            .ok_or_else(|| BudgetError::UnknownChild(from_id.to_string()))?;
        if from.released {
            return Err(BudgetError::AlreadyReleased(from_id.to_string()));
        }
        if from.available < amount {
            return Err(BudgetError::InsufficientAvailable {
                child_id: from_id.to_string(),
                requested: amount,
                available: from.available,
            });
        }
        from.allocated -= amount;
        from.available -= amount;
        from.status = derive_status(from, threshold);

        if let Some(to) = self.allocations.get_mut(to_id) {
            to.allocated += amount;
            to.available += amount;
            to.status = derive_status(to, threshold);
        }

        info!("Reallocated {} tokens from {} to {}", amount, from_id, to_id);
        Ok(())
    }

    /// Return a child's unspent tokens to the parent pool.
    ///
    /// Calling this twice for the same child releases nothing the second time,
    /// and usage can no longer be tracked against the allocation.
    pub fn release(&mut self, child_id: &str) -> Result<Release, BudgetError> {
        let allocation = self
            .allocations
            .get_mut(child_id)
            .ok_or_else(|| BudgetError::UnknownChild(child_id.to_string()))?;

        if allocation.released {
            return Ok(Release { released: 0 });
        }

        // An overrun child has nothing left to give back
        let released = allocation.available.max(0);
        allocation.available = 0;
        allocation.released = true;
        self.available += released;

        debug!("Released {} tokens from {}", released, child_id);
        Ok(Release { released })
    }

    pub fn summary(&self) -> BudgetSummary {
        let children: Vec<ChildBudget> = self
            .allocations
            .iter()
            .map(|(id, a)| ChildBudget {
                id: id.clone(),
                allocated: a.allocated,
                used: a.used,
                available: a.available,
                status: a.status,
            })
            .collect();

        BudgetSummary {
            total: self.total,
            allocated: children.iter().map(|c| c.allocated).sum(),
            used: children.iter().map(|c| c.used).sum(),
            unallocated: self.available,
            children,
        }
    }

    /// Usage records for one child, oldest first
    pub fn usage_for<'a>(&'a self, child_id: &'a str) -> impl Iterator<Item = &'a UsageRecord> + 'a {
        self.usage_history
            .iter()
            .filter(move |r| r.child_id == child_id)
    }
}

/// Share of the allocation consumed; a zero-sized slice counts as fully used
fn usage_ratio(allocation: &Allocation) -> f64 {
    if allocation.allocated > 0 {
        allocation.used as f64 / allocation.allocated as f64
    } else {
        1.0
    }
}

// Order matters: a negative balance is reported as exhausted, never exceeded.
fn derive_status(allocation: &Allocation, threshold: f64) -> AllocationStatus {
    if allocation.available <= 0 {
        AllocationStatus::Exhausted
    } else if usage_ratio(allocation) >= threshold {
        AllocationStatus::Low
    } else {
        AllocationStatus::Healthy
    }
}
