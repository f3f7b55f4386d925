//! Harbor CLI - offline-first personal ledger in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod output;

use commands::{breakdown, demo, networth, queue, reset, setup, status, summary, sync, xirr};

/// Harbor - offline-first personal ledger
#[derive(Parser)]
#[command(name = "hb", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show local store, queue, and sync status
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile with the server (push queued writes, then pull)
    Sync {
        /// Push queued writes only, skip the pull
        #[arg(long)]
        push_only: bool,
        /// Pull a single resource: tags, accounts, units, transactions, prices, reports
        #[arg(long)]
        pull: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Income, expense, net worth, and KPI summary for a date range
    Summary {
        /// Range start (YYYY-MM-DD), defaults to one year before the end
        #[arg(long)]
        from: Option<String>,
        /// Range end (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Monthly net worth history for a date range
    Networth {
        /// Range start (YYYY-MM-DD), defaults to one year before the end
        #[arg(long)]
        from: Option<String>,
        /// Range end (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Expense totals per tag, largest first
    Breakdown {
        /// Range start (YYYY-MM-DD), defaults to one year before the end
        #[arg(long)]
        from: Option<String>,
        /// Range end (YYYY-MM-DD), defaults to today
        #[arg(long)]
        to: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Recompute the annualized return of an investment account
    Xirr {
        /// Account path, e.g. Assets:Brokerage
        account: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or clear the offline write queue
    Queue {
        #[command(subcommand)]
        command: Option<queue::QueueCommands>,
    },

    /// Configure the remote server connection
    Setup {
        /// Server base URL
        url: String,
        /// API token
        #[arg(long)]
        token: String,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },

    /// Wipe all local data (debug; the next sync repopulates from the server)
    Reset {
        /// Skip confirmation
        #[arg(long, short)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Status { json } => status::run(json),
        Commands::Sync {
            push_only,
            pull,
            json,
        } => sync::run(push_only, pull.as_deref(), json),
        Commands::Summary { from, to, json } => summary::run(from.as_deref(), to.as_deref(), json),
        Commands::Networth { from, to, json } => {
            networth::run(from.as_deref(), to.as_deref(), json)
        }
        Commands::Breakdown { from, to, json } => {
            breakdown::run(from.as_deref(), to.as_deref(), json)
        }
        Commands::Xirr { account, json } => xirr::run(&account, json),
        Commands::Queue { command } => queue::run(command),
        Commands::Setup { url, token } => setup::run(&url, &token),
        Commands::Demo { command } => demo::run(command),
        Commands::Reset { force } => reset::run(force),
    }
}
