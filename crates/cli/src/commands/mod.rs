pub mod deal;
pub mod wallet;

use std::str::FromStr;

use num_bigint::BigInt;
use pledge_primitives::{Address, TokenAmount};
use pledge_wallet::{FileKeystore, LocalWallet};

use crate::{CliError, config::WalletConfig};

pub(crate) fn parse_address(field: &'static str, input: &str) -> Result<Address, CliError> {
    Address::from_str(input.trim()).map_err(|e| CliError::InvalidArgument {
        field,
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Parses a decimal attoFIL amount.
pub(crate) fn parse_atto(field: &'static str, input: &str) -> Result<TokenAmount, CliError> {
    BigInt::from_str(input.trim()).map(TokenAmount::from_atto).map_err(|e| {
        CliError::InvalidArgument { field, input: input.to_string(), reason: e.to_string() }
    })
}

pub(crate) fn open_wallet(config: &WalletConfig) -> Result<LocalWallet, CliError> {
    let default_address = config
        .default_address
        .as_deref()
        .map(|address| parse_address("wallet.default_address", address))
        .transpose()?;
    Ok(LocalWallet::new(FileKeystore::new(&config.keystore_dir))
        .with_default_address(default_address))
}
