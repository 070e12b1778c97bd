use crate::cli::{load_config, BudgetArgs, BudgetCommand};
use anyhow::Context;
use epicflow::budget::{BudgetCheck, TokenBudget};
use epicflow::state::{load_ledger, save_ledger};
use tracing::info;

pub fn execute(args: BudgetArgs) -> anyhow::Result<()> {
    let config = load_config(&args.config)?;
    let ledger_path = args
        .ledger
        .clone()
        .unwrap_or_else(|| config.budget.state_file.clone());

    if let BudgetCommand::Init { total, force } = &args.action {
        if ledger_path.exists() && !force {
            anyhow::bail!(
                "Ledger already exists at {:?}. Use --force to replace it",
                ledger_path
            );
        }
        let total = total.unwrap_or(config.budget.default_total);
        if total < 0 {
            anyhow::bail!("Total budget must not be negative (got {})", total);
        }
        let ledger = TokenBudget::new(total, config.budget.options());
        save_ledger(&ledger_path, &ledger)?;
        info!("Created ledger at {:?}", ledger_path);
        println!("Initialized ledger with {} tokens", total);
        return Ok(());
    }

    let mut ledger = load_ledger(&ledger_path)?;

    match args.action {
        BudgetCommand::Init { .. } => {}
        BudgetCommand::Allocate {
            child,
            amount,
            metadata,
        } => {
            let metadata = metadata
                .map(|raw| serde_json::from_str(&raw))
                .transpose()
                .context("--metadata must be valid JSON")?;
            let allocated = ledger.allocate(&child, amount, metadata)?.allocated;
            println!(
                "Allocated {} to {} ({} left in pool)",
                allocated, child, ledger.available
            );
            save_ledger(&ledger_path, &ledger)?;
        }
        BudgetCommand::Track { child, amount } => {
            let allocation = ledger.track_usage(&child, amount)?;
            println!(
                "{}: used {}/{} ({})",
                child, allocation.used, allocation.allocated, allocation.status
            );
            let compact = ledger.should_compact(&child, None);
            save_ledger(&ledger_path, &ledger)?;
            if compact {
                println!("{} should compact its context", child);
            }
        }
        BudgetCommand::Check { child, threshold } => {
            let mut check = ledger.check(&child);
            if let Some(t) = threshold {
                check = with_threshold(check, ledger.should_compact(&child, Some(t)));
            }
            println!("{}", serde_json::to_string_pretty(&check)?);
        }
        BudgetCommand::Release { child } => {
            let release = ledger.release(&child)?;
            save_ledger(&ledger_path, &ledger)?;
            println!("Released {} from {}", release.released, child);
        }
        BudgetCommand::Reallocate { from, to, amount } => {
            ledger.reallocate(&from, &to, amount)?;
            save_ledger(&ledger_path, &ledger)?;
            println!("Moved {} from {} to {}", amount, from, to);
        }
        BudgetCommand::Summary { json } => {
            let summary = ledger.summary();
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!(
                    "Total {}  allocated {}  used {}  unallocated {}",
                    summary.total, summary.allocated, summary.used, summary.unallocated
                );
                for child in &summary.children {
                    println!(
                        "  {:<24} {:>10} used {:>10} left {:>10}  {}",
                        child.id, child.allocated, child.used, child.available, child.status
                    );
                }
            }
        }
    }

    Ok(())
}

fn with_threshold(check: BudgetCheck, should: bool) -> BudgetCheck {
    match check {
        BudgetCheck::Allocated {
            total,
            used,
            available,
            usage_percentage,
            ..
        } => BudgetCheck::Allocated {
            total,
            used,
            available,
            usage_percentage,
            should_compact: should,
        },
        other => other,
    }
}
