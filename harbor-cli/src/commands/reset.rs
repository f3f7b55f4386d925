//! Reset command - wipe all local data

use anyhow::Result;

use super::get_context;
use crate::output;

pub fn run(force: bool) -> Result<()> {
    if !force {
        output::warning(
            "This wipes the local replica, including unsent local writes. Re-run with --force.",
        );
        return Ok(());
    }

    let ctx = get_context()?;
    ctx.clear_all_local_data()?;
    output::success("Local data cleared. Run 'hb sync' to repopulate from the server.");
    Ok(())
}
