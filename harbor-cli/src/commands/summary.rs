//! Summary command - income, expense, net worth, and KPIs

use anyhow::Result;

use super::{get_context, parse_range};
use crate::output;

pub fn run(from: Option<&str>, to: Option<&str>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let range = parse_range(from, to)?;
    let summary = ctx.analytics_service.summary(range)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    output::info(&format!("Summary {} to {}", range.start, range.end));

    let mut table = output::create_table();
    table.set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Income".to_string(), output::format_money(summary.income)]);
    table.add_row(vec!["Expense".to_string(), output::format_money(summary.expense)]);
    table.add_row(vec![
        "Net worth".to_string(),
        output::format_money(summary.net_worth),
    ]);
    table.add_row(vec![
        "Savings rate".to_string(),
        format!("{:.1}%", summary.savings_rate * 100.0),
    ]);
    table.add_row(vec![
        "Fiscal YTD income".to_string(),
        output::format_money(summary.fiscal_ytd_income),
    ]);
    table.add_row(vec![
        "Fiscal YTD expense".to_string(),
        output::format_money(summary.fiscal_ytd_expense),
    ]);
    table.add_row(vec![
        "MoM income delta".to_string(),
        output::format_money(summary.mom_income_delta),
    ]);
    table.add_row(vec![
        "MoM expense delta".to_string(),
        output::format_money(summary.mom_expense_delta),
    ]);
    table.add_row(vec![
        "Cash-flow ratio".to_string(),
        output::format_ratio(summary.cash_flow_ratio),
    ]);
    table.add_row(vec![
        "Monthly burn".to_string(),
        output::format_money(summary.monthly_burn),
    ]);
    table.add_row(vec![
        "Runway (days)".to_string(),
        format!("{:.0}", summary.runway_days),
    ]);
    table.add_row(vec![
        "Debt-to-asset".to_string(),
        format!("{:.1}%", summary.debt_to_asset_pct),
    ]);
    println!("{table}");

    Ok(())
}
