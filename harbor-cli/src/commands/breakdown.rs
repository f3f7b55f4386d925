//! Breakdown command - expense totals per tag

use anyhow::Result;

use super::{get_context, parse_range};
use crate::output;

pub fn run(from: Option<&str>, to: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let range = parse_range(from, to)?;
    let entries = ctx.analytics_service.tag_breakdown(range)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        output::warning("No tagged expenses in range");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Tag", "Spent"]);
    for entry in &entries {
        table.add_row(vec![entry.name.clone(), output::format_money(entry.total)]);
    }
    println!("{table}");

    Ok(())
}
