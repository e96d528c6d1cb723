//! Command line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::{Deserialize, Serialize};

/// Pledge - propose storage deals directly to Filecoin storage providers
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Logging configuration.
    #[command(flatten)]
    pub logs: LogArgs,

    /// Path to the configuration file.
    ///
    /// Defaults to `~/.pledge/config.toml`.
    #[arg(long, global = true, value_name = "PATH", env = "PLEDGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Propose an offline storage deal to a provider.
    Deal(DealArgs),
    /// Manage client wallet keys.
    #[command(subcommand)]
    Wallet(WalletCommand),
}

/// Logging configuration.
#[derive(Debug, Args, Clone, Default, Serialize, Deserialize)]
#[command(next_help_heading = "Logging")]
#[serde(default)]
pub struct LogArgs {
    /// Silence all output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (-v, -vv, -vvv, etc.).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    #[serde(skip)]
    pub verbosity: u8,

    /// Log filter directive (e.g., "pledge_session=debug,libp2p=info").
    #[arg(long = "log.filter", global = true, value_name = "DIRECTIVE")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,

    /// Use JSON format for log output.
    #[arg(long = "log.json", global = true)]
    pub json: bool,
}

/// Arguments for the `deal` command.
#[derive(Debug, Args)]
pub struct DealArgs {
    /// Storage provider address, e.g. f01000.
    #[arg(long)]
    pub provider: String,

    /// Piece commitment (commP) of the CAR file.
    #[arg(long)]
    pub commp: String,

    /// Padded piece size in bytes. Derived from the CAR size when omitted.
    #[arg(long, value_name = "BYTES")]
    pub piece_size: Option<u64>,

    /// Root cid of the payload DAG.
    #[arg(long)]
    pub payload_cid: String,

    /// Size of the CAR file in bytes.
    #[arg(long, value_name = "BYTES")]
    pub car_size: u64,

    /// Deal start epoch. Defaults to two days after the chain head.
    #[arg(long)]
    pub start_epoch: Option<i64>,

    /// Deal duration in epochs.
    #[arg(long)]
    pub duration: Option<i64>,

    /// Provider collateral in attoFIL. Defaults to the chain minimum plus 20%.
    #[arg(long, value_name = "ATTOFIL")]
    pub collateral: Option<String>,

    /// Provider ask in attoFIL per GiB per epoch.
    #[arg(long, value_name = "ATTOFIL")]
    pub price: Option<String>,

    /// Wallet address to sign with.
    #[arg(long)]
    pub wallet: Option<String>,

    /// Use verified datacap for this deal.
    #[arg(long)]
    pub verified: bool,

    /// Ask the provider to keep an unsealed copy.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub fast_retrieval: bool,

    /// Ask the provider not to announce the deal to IPNI.
    #[arg(long)]
    pub skip_ipni_announce: bool,

    /// Skip the confirmation prompt.
    #[arg(short, long)]
    pub yes: bool,
}

#[derive(Debug, Subcommand)]
pub enum WalletCommand {
    /// Generate a new secp256k1 key.
    New,
    /// Import a hex encoded key file as written by `lotus wallet export`.
    Import {
        /// Path to the key file.
        path: PathBuf,
    },
    /// List the addresses in the keystore.
    List,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_deal() {
        let cli = Cli::try_parse_from([
            "pledge",
            "-v",
            "deal",
            "--provider",
            "f01000",
            "--commp",
            "baga",
            "--payload-cid",
            "bafy",
            "--car-size",
            "26666",
            "--fast-retrieval",
            "false",
            "--yes",
        ])
        .unwrap();

        assert_eq!(cli.logs.verbosity, 1);
        let Commands::Deal(args) = cli.command else { panic!("expected deal") };
        assert_eq!(args.provider, "f01000");
        assert_eq!(args.car_size, 26_666);
        assert!(!args.fast_retrieval);
        assert!(args.yes);
        assert!(args.piece_size.is_none());
    }

    #[test]
    fn test_parse_wallet_import() {
        let cli = Cli::try_parse_from(["pledge", "wallet", "import", "key.hex"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Wallet(WalletCommand::Import { ref path }) if path == &PathBuf::from("key.hex")
        ));
    }
}
