//! `pledge wallet` subcommands.

use std::fs;

use eyre::{Result, WrapErr};
use pledge_wallet::{KeyInfo, LocalWallet};

use crate::{cli::WalletCommand, config::PledgeConfig};

use super::open_wallet;

pub fn run(command: WalletCommand, config: &PledgeConfig) -> Result<()> {
    let wallet = open_wallet(&config.wallet)?;
    for line in execute(command, &wallet)? {
        println!("{line}");
    }
    Ok(())
}

/// Runs `command` against `wallet`, returning the lines to print.
fn execute(command: WalletCommand, wallet: &LocalWallet) -> Result<Vec<String>> {
    match command {
        WalletCommand::New => {
            let address = wallet.generate()?;
            tracing::info!(%address, "Generated new wallet key");
            Ok(vec![address.to_string()])
        }
        WalletCommand::Import { path } => {
            let text = fs::read_to_string(&path)
                .wrap_err_with(|| format!("Failed to read key file {}", path.display()))?;
            let key: KeyInfo = text.parse()?;
            let address = wallet.import(key)?;
            tracing::info!(%address, "Imported wallet key");
            Ok(vec![address.to_string()])
        }
        WalletCommand::List => Ok(wallet.list()?.iter().map(ToString::to_string).collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WalletConfig;
    use tempfile::TempDir;

    #[test]
    fn test_new_import_list() {
        let dir = TempDir::new().unwrap();
        let config = WalletConfig { keystore_dir: dir.path().join("keystore"), default_address: None };
        let wallet = open_wallet(&config).unwrap();

        let created = execute(WalletCommand::New, &wallet).unwrap();
        assert_eq!(created.len(), 1);
        assert!(created[0].starts_with("f1"));

        // Export the key and import it into a second keystore.
        let address = wallet.list().unwrap()[0];
        let exported = wallet.export(&address).unwrap().export().unwrap();
        let key_path = dir.path().join("key.hex");
        fs::write(&key_path, exported).unwrap();

        let other = open_wallet(&WalletConfig {
            keystore_dir: dir.path().join("other"),
            default_address: None,
        })
        .unwrap();
        let imported = execute(WalletCommand::Import { path: key_path }, &other).unwrap();
        assert_eq!(imported, created);

        assert_eq!(execute(WalletCommand::List, &other).unwrap(), created);
    }

    #[test]
    fn test_import_missing_file() {
        let dir = TempDir::new().unwrap();
        let wallet = open_wallet(&WalletConfig {
            keystore_dir: dir.path().to_path_buf(),
            default_address: None,
        })
        .unwrap();
        let result =
            execute(WalletCommand::Import { path: dir.path().join("absent.hex") }, &wallet);
        assert!(result.is_err());
    }
}
