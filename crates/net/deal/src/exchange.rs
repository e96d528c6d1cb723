//! One request/response round trip of the deal protocol.

use std::time::Duration;

use asynchronous_codec::Framed;
use futures::{AsyncRead, AsyncWrite, AsyncWriteExt, SinkExt, TryStreamExt};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::{
    DealCodecError, DealParams, DealParamsCodec, DealResponse, DealResponseCodec, MAX_MESSAGE_SIZE,
};

/// Upper bound on closing a stream once the exchange is over.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Why an exchange stopped before a response arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum CancelReason {
    /// The caller's cancellation token fired.
    Cancelled,
    /// The exchange deadline elapsed.
    DeadlineExceeded,
}

/// Errors from [`exchange`].
#[derive(Debug, thiserror::Error)]
pub enum ExchangeError {
    /// No response within budget. The provider may or may not have seen the
    /// proposal.
    #[error("deal exchange cancelled: {0}")]
    Cancelled(CancelReason),
    #[error("deal exchange failed: {0}")]
    Transport(#[from] DealCodecError),
}

impl From<std::io::Error> for ExchangeError {
    fn from(error: std::io::Error) -> Self {
        Self::Transport(DealCodecError::Io(error))
    }
}

fn connection_closed() -> DealCodecError {
    DealCodecError::Io(std::io::Error::new(
        std::io::ErrorKind::UnexpectedEof,
        "connection closed",
    ))
}

// ============================================================================
// Outbound (Client) - Sends proposal, receives verdict
// ============================================================================

/// Sends `request` over `stream` and waits for the provider's response.
///
/// The write and the read form one unit raced against `cancel` and `deadline`;
/// whichever finishes first decides the outcome and no partial response is
/// ever returned. The stream is closed before this returns, on every path.
pub async fn exchange<S>(
    mut stream: S,
    request: DealParams,
    cancel: &CancellationToken,
    deadline: Duration,
) -> Result<DealResponse, ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let deal_uuid = request.deal_uuid;

    let outcome = tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ExchangeError::Cancelled(CancelReason::Cancelled)),
        result = tokio::time::timeout(deadline, round_trip(&mut stream, request)) => {
            result.unwrap_or(Err(ExchangeError::Cancelled(CancelReason::DeadlineExceeded)))
        }
    };

    match tokio::time::timeout(CLOSE_TIMEOUT, stream.close()).await {
        Ok(Ok(())) => debug!(%deal_uuid, "Deal: Stream closed"),
        Ok(Err(e)) => debug!(%deal_uuid, error = %e, "Deal: Stream close failed"),
        Err(_) => debug!(%deal_uuid, "Deal: Stream close timed out"),
    }

    outcome
}

async fn round_trip<S>(stream: &mut S, request: DealParams) -> Result<DealResponse, ExchangeError>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let deal_uuid = request.deal_uuid;
    let mut framed = Framed::new(stream, DealParamsCodec::new(MAX_MESSAGE_SIZE));

    debug!(%deal_uuid, "Deal: Sending proposal");
    framed.send(request).await?;

    let mut framed = Framed::new(framed.into_inner(), DealResponseCodec::new(MAX_MESSAGE_SIZE));

    debug!(%deal_uuid, "Deal: Reading response");
    let response = framed.try_next().await?.ok_or_else(connection_closed)?;
    debug!(%deal_uuid, accepted = response.accepted, "Deal: Received response");
    Ok(response)
}

// ============================================================================
// Inbound (Provider) - Receives proposal, sends verdict
// ============================================================================

/// Reads a proposal from `stream`, returning a responder for the verdict.
pub async fn read_request<S>(stream: S) -> Result<(DealParams, DealResponder<S>), DealCodecError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, DealParamsCodec::new(MAX_MESSAGE_SIZE));

    debug!("Deal: Reading proposal");
    let request = framed.try_next().await?.ok_or_else(connection_closed)?;

    let responder = DealResponder {
        framed: Framed::new(framed.into_inner(), DealResponseCodec::new(MAX_MESSAGE_SIZE)),
    };
    Ok((request, responder))
}

/// Handle for answering a proposal read with [`read_request`].
pub struct DealResponder<S> {
    framed: Framed<S, DealResponseCodec>,
}

impl<S> std::fmt::Debug for DealResponder<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DealResponder").finish_non_exhaustive()
    }
}

impl<S> DealResponder<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub async fn accept(self) -> Result<(), DealCodecError> {
        self.respond(DealResponse::accepted()).await
    }

    pub async fn reject(self, message: impl Into<String>) -> Result<(), DealCodecError> {
        self.respond(DealResponse::rejected(message)).await
    }

    /// Writes `response` and closes the stream.
    pub async fn respond(mut self, response: DealResponse) -> Result<(), DealCodecError> {
        debug!(accepted = response.accepted, "Deal: Sending response");
        self.framed.send(response).await?;
        self.framed.close().await
    }
}
