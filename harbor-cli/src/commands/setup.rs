//! Setup command - configure the remote server connection

use anyhow::Result;

use harbor_core::config::Config;

use super::get_harbor_dir;
use crate::output;

pub fn run(url: &str, token: &str) -> Result<()> {
    let harbor_dir = get_harbor_dir();
    std::fs::create_dir_all(&harbor_dir)?;

    let mut config = Config::load(&harbor_dir)?;
    config.server_url = Some(url.trim_end_matches('/').to_string());
    config.api_token = Some(token.to_string());
    config.save(&harbor_dir)?;

    output::success(&format!("Server configured: {}", url));
    output::info("Run 'hb sync' to pull your ledger.");
    Ok(())
}
