//! Xirr command - recompute an account's annualized return

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(account: &str, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let rate = ctx.analytics_service.refresh_account_xirr(account)?;

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "account": account,
                "xirr": rate,
            }))?
        );
        return Ok(());
    }

    match rate {
        Some(r) => output::success(&format!("{}: {:.2}% annualized", account, r * 100.0)),
        None => output::warning(&format!(
            "{}: no annualized return (needs both inflows and outflows)",
            account
        )),
    }

    Ok(())
}
