//! Demo command - manage demo mode

use anyhow::Result;
use clap::Subcommand;

use harbor_core::config::Config;

use super::get_harbor_dir;
use crate::output;

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode (fixture data, separate database)
    On,
    /// Disable demo mode
    Off,
    /// Show demo mode status (default)
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let harbor_dir = get_harbor_dir();
    std::fs::create_dir_all(&harbor_dir)?;
    let mut config = Config::load(&harbor_dir)?;

    match command.unwrap_or(DemoCommands::Status) {
        DemoCommands::On => {
            config.enable_demo_mode();
            config.save(&harbor_dir)?;
            output::success("Demo mode enabled. Run 'hb sync' to load fixture data.");
        }
        DemoCommands::Off => {
            config.disable_demo_mode();
            config.save(&harbor_dir)?;
            output::success("Demo mode disabled.");
        }
        DemoCommands::Status => {
            if config.demo_mode {
                output::info("Demo mode is on");
            } else {
                output::info("Demo mode is off");
            }
        }
    }

    Ok(())
}
