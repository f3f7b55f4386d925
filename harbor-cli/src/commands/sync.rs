//! Sync command - reconcile with the remote server

use anyhow::{bail, Result};
use colored::Colorize;

use harbor_core::services::PullScope;

use super::get_context;

pub fn run(push_only: bool, pull: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;

    let report = if push_only {
        ctx.sync_service.push_only()
    } else if let Some(scope) = pull {
        ctx.sync_service.pull_only(parse_scope(scope)?)
    } else {
        ctx.sync_service.perform_full_sync()
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if report.skipped {
        println!("{}", "A sync is already running; nothing to do".yellow());
        return Ok(());
    }

    if let Some(push) = &report.push {
        if push.deauthorized {
            println!("{}", "Push stopped: server rejected credentials".red());
        } else if let Some(error) = &push.error {
            println!("{} {}", "Push error:".red(), error);
        } else {
            println!(
                "{} {} delivered, {} failed of {} attempted",
                "Push:".green(),
                push.delivered,
                push.failed,
                push.attempted
            );
        }
    }

    if let Some(pull) = &report.pull {
        for resource in &pull.resources {
            println!(
                "{} {} - {} upserted, {} existing, {} dirty kept, {} malformed skipped",
                "Pulled:".green(),
                resource.resource,
                resource.upserted,
                resource.skipped_existing,
                resource.skipped_dirty,
                resource.skipped_malformed
            );
        }
        if let Some(error) = &pull.error {
            println!("{} {}", "Pull aborted:".red(), error);
        }
    }

    Ok(())
}

fn parse_scope(s: &str) -> Result<PullScope> {
    Ok(match s {
        "tags" => PullScope::Tags,
        "accounts" => PullScope::Accounts,
        "units" => PullScope::Units,
        "transactions" => PullScope::Transactions,
        "prices" => PullScope::Prices,
        "reports" => PullScope::Reports,
        "full" => PullScope::Full,
        other => bail!(
            "Unknown pull scope '{}'. Expected tags, accounts, units, transactions, prices, or reports.",
            other
        ),
    })
}
