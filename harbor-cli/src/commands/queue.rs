//! Queue command - inspect or clear the offline write queue

use anyhow::Result;
use clap::Subcommand;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum QueueCommands {
    /// List queued operations (default)
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Drop every queued operation, including failed ones (destructive)
    Clear {
        /// Skip confirmation
        #[arg(long, short)]
        force: bool,
    },
}

pub fn run(command: Option<QueueCommands>) -> Result<()> {
    match command.unwrap_or(QueueCommands::List { json: false }) {
        QueueCommands::List { json } => list(json),
        QueueCommands::Clear { force } => clear(force),
    }
}

fn list(json: bool) -> Result<()> {
    let ctx = get_context()?;
    let items = ctx.queue_service.list()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    if items.is_empty() {
        output::success("Queue is empty");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Operation", "Created", "Retries", "Status"]);
    for item in &items {
        table.add_row(vec![
            item.operation.clone(),
            item.created_at.format("%Y-%m-%d %H:%M").to_string(),
            item.retry_count.to_string(),
            item.status.as_str().to_string(),
        ]);
    }
    println!("{table}");

    Ok(())
}

fn clear(force: bool) -> Result<()> {
    if !force {
        output::warning("This drops unsent local writes permanently. Re-run with --force.");
        return Ok(());
    }

    let ctx = get_context()?;
    let result = ctx.queue_service.clear()?;
    output::success(&format!("Cleared {} queued operations", result.deleted));
    Ok(())
}
