//! Spellcast CLI library.

mod cli;
mod command_registry;
mod commands;
mod dispatch;
mod observability;

use anyhow::Result;
use clap::Parser;
use cli::Cli;
use command_registry::CommandRegistry;

/// Parse args, initialise tracing and dispatch to the command handlers.
pub fn run_cli() -> Result<()> {
    spellcast_core::config::load_dotenv();
    let cli = Cli::parse();
    observability::init_tracing();

    let ctx = commands::AppContext::from_cli(&cli);
    let mut registry = CommandRegistry::new();
    dispatch::register_all(&mut registry);
    registry.dispatch(&cli.command, &ctx)
}
