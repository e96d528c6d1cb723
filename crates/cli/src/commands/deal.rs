//! `pledge deal`: price, confirm and propose one offline deal.

use std::{io::Write, sync::Arc, time::Duration};

use eyre::Result;
use pledge_chain::{LotusClient, LotusConfig};
use pledge_net_dialer::{Libp2pTransport, TransportConfig};
use pledge_primitives::{DealEconomics, PaddedPieceSize, START_EPOCH_SAFETY_WINDOW, TokenAmount};
use pledge_session::{DealOutcome, DealRequest, DealSession, SessionConfig, SessionError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{CliError, cli::DealArgs, config::PledgeConfig, prompt::confirm};

use super::{open_wallet, parse_address, parse_atto};

pub async fn run(args: DealArgs, config: &PledgeConfig) -> Result<()> {
    let yes = args.yes;
    let request = deal_request(args, config)?;

    let economics = match request.piece_size {
        Some(piece_size) => DealEconomics::with_piece_size(
            request.car_size,
            piece_size,
            &request.price,
            request.verified,
        ),
        None => DealEconomics::compute(request.car_size, &request.price, request.verified),
    }
    .map_err(|e| CliError::Session(SessionError::from(e)))?;

    if !yes {
        let stdin = std::io::stdin();
        let mut stderr = std::io::stderr();
        describe(&request, &economics, &mut stderr)?;
        if !confirm(stdin.lock(), &mut stderr)? {
            return Err(CliError::UserDeclined.into());
        }
    }

    // The confirmed piece size is the one proposed.
    let request = DealRequest { piece_size: Some(economics.piece_size), ..request };

    let chain = Arc::new(LotusClient::new(
        &LotusConfig::new(&config.chain.api_url).with_token(config.chain.token.clone()),
    )?);
    let wallet = Arc::new(open_wallet(&config.wallet)?);

    let connect_timeout = Duration::from_secs(config.deal.connect_timeout_secs);
    let transport = Arc::new(Libp2pTransport::spawn(TransportConfig {
        connect_timeout,
        identify_timeout: connect_timeout,
        ..Default::default()
    })?);
    debug!(local_peer_id = %transport.local_peer_id(), "Transport started");

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling deal");
            on_interrupt.cancel();
        }
    });

    let mut session = DealSession::new(
        chain,
        wallet,
        transport,
        SessionConfig {
            exchange_timeout: Duration::from_secs(config.deal.exchange_timeout_secs),
        },
    )
    .with_cancellation(cancel);

    match session.run(&request).await.map_err(CliError::Session)? {
        DealOutcome::Accepted(summary) => {
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        DealOutcome::Rejected { deal_uuid, message } => {
            Err(CliError::Rejected { deal_uuid, message }.into())
        }
    }
}

/// Merges command line flags over configured defaults.
fn deal_request(args: DealArgs, config: &PledgeConfig) -> Result<DealRequest, CliError> {
    let provider = parse_address("provider", &args.provider)?;
    let price = parse_atto("price", args.price.as_deref().unwrap_or(&config.deal.price))?;
    let provider_collateral =
        args.collateral.as_deref().map(|c| parse_atto("collateral", c)).transpose()?;

    Ok(DealRequest {
        wallet: args.wallet,
        piece_size: args.piece_size.map(PaddedPieceSize),
        start_epoch: args.start_epoch,
        duration: args.duration.unwrap_or(config.deal.duration),
        provider_collateral,
        price,
        verified: args.verified,
        fast_retrieval: args.fast_retrieval,
        skip_ipni_announce: args.skip_ipni_announce,
        ..DealRequest::new(provider, args.commp, args.payload_cid, args.car_size)
    })
}

/// Prints the priced terms ahead of the confirmation prompt.
fn describe(
    request: &DealRequest,
    economics: &DealEconomics,
    mut out: impl Write,
) -> std::io::Result<()> {
    let total = TokenAmount::from_atto(economics.price_per_epoch.atto() * request.duration);
    writeln!(out, "Provider:            {}", request.provider)?;
    writeln!(out, "Piece CID:           {}", request.piece_cid)?;
    writeln!(out, "Payload CID:         {}", request.payload_cid)?;
    writeln!(out, "CAR size:            {} bytes", request.car_size)?;
    writeln!(
        out,
        "Piece size:          {} bytes (sector {:?})",
        economics.piece_size.0, economics.sector_size
    )?;
    writeln!(out, "Price per epoch:     {} attoFIL", economics.price_per_epoch.atto())?;
    writeln!(out, "Duration:            {} epochs", request.duration)?;
    writeln!(out, "Total price:         {} FIL", total)?;
    writeln!(out, "Verified:            {}", request.verified)?;
    writeln!(out, "Fast retrieval:      {}", request.fast_retrieval)?;
    match request.start_epoch {
        Some(epoch) => writeln!(out, "Start epoch:         {epoch}")?,
        None => writeln!(out, "Start epoch:         chain head + {START_EPOCH_SAFETY_WINDOW}")?,
    }
    match &request.provider_collateral {
        Some(collateral) => writeln!(out, "Provider collateral: {} attoFIL", collateral.atto())?,
        None => writeln!(out, "Provider collateral: chain minimum + 20%")?,
    }
    Ok(())
}
