//! Status command - local store and queue summary

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let summary = ctx.status_service.get_status()?;
    let state = ctx.sync_service.state();

    if json {
        let payload = serde_json::json!({
            "store": summary,
            "sync": state,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["", "Count"]);
    table.add_row(vec!["Accounts".to_string(), summary.total_accounts.to_string()]);
    table.add_row(vec![
        "Transactions".to_string(),
        summary.total_transactions.to_string(),
    ]);
    table.add_row(vec!["Tags".to_string(), summary.total_tags.to_string()]);
    table.add_row(vec!["Units".to_string(), summary.total_units.to_string()]);
    table.add_row(vec!["Prices".to_string(), summary.total_prices.to_string()]);
    println!("{table}");

    println!(
        "Queue: {} pending, {} retrying, {} failed",
        summary.queue_pending, summary.queue_retrying, summary.queue_failed
    );

    match state.last_sync_at {
        Some(t) => println!("Last sync: {}", t.format("%Y-%m-%d %H:%M:%S UTC")),
        None => output::warning("Never synced"),
    }

    Ok(())
}
