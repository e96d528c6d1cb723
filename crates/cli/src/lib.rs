//! Command line interface for pledge.
//!
//! - [`Cli`] - Top-level CLI parser
//! - [`Commands`] - `deal` and `wallet` subcommands
//! - [`PledgeConfig`] - layered configuration
//!
//! Configuration is loaded using Figment with the following priority
//! (highest wins):
//!
//! 1. CLI arguments
//! 2. Config file (TOML)
//! 3. Environment variables (`PLEDGE_` prefix)
//! 4. Defaults

mod cli;
pub mod commands;
pub mod config;
mod error;
pub mod logging;
mod prompt;

pub use cli::{Cli, Commands, DealArgs, LogArgs, WalletCommand};
pub use config::PledgeConfig;
pub use error::CliError;
pub use prompt::confirm;

use clap::Parser;
use color_eyre::eyre;
use tracing::debug;

/// Run pledge with the process's command line arguments.
///
/// This is the main entry point that should be called from the binary.
pub async fn run() -> eyre::Result<()> {
    // Setup error handling
    color_eyre::install()?;

    // Parse command line arguments
    let cli = Cli::parse();

    // Initialize logging
    logging::init_logging(&cli.logs)?;

    let config = PledgeConfig::load(cli.config.as_deref())?;
    config.chain.network.apply();
    debug!(api_url = %config.chain.api_url, network = ?config.chain.network, "Loaded configuration");

    // Dispatch command
    match cli.command {
        Commands::Deal(args) => commands::deal::run(args, &config).await?,
        Commands::Wallet(command) => commands::wallet::run(command, &config)?,
    }

    Ok(())
}
