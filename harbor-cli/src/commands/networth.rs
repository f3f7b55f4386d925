//! Networth command - monthly net worth history

use anyhow::Result;

use super::{get_context, parse_range};
use crate::output;

pub fn run(from: Option<&str>, to: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let range = parse_range(from, to)?;
    let points = ctx.analytics_service.net_worth_history(range)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&points)?);
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Date", "Net worth"]);
    for point in &points {
        table.add_row(vec![
            point.date.to_string(),
            output::format_money(point.total),
        ]);
    }
    println!("{table}");

    Ok(())
}
