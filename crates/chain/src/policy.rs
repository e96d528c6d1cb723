use std::sync::Arc;

use pledge_primitives::{
    COLLATERAL_MARGIN_DENOMINATOR, COLLATERAL_MARGIN_NUMERATOR, ChainEpoch, PaddedPieceSize,
    START_EPOCH_SAFETY_WINDOW, TokenAmount,
};
use tracing::debug;

use crate::{ChainError, ChainState};

/// `min * 6 / 5` in integer arithmetic, truncating.
pub fn collateral_with_margin(min: &TokenAmount) -> TokenAmount {
    TokenAmount::from_atto(min.atto() * COLLATERAL_MARGIN_NUMERATOR / COLLATERAL_MARGIN_DENOMINATOR)
}

/// Fills in deal terms the caller left unset, using chain state.
#[derive(Clone)]
pub struct PolicyResolver {
    chain: Arc<dyn ChainState>,
}

impl std::fmt::Debug for PolicyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyResolver").finish_non_exhaustive()
    }
}

impl PolicyResolver {
    pub fn new(chain: Arc<dyn ChainState>) -> Self {
        Self { chain }
    }

    pub fn chain(&self) -> &Arc<dyn ChainState> {
        &self.chain
    }

    /// The explicit start epoch, or the chain head plus the safety window.
    pub async fn start_epoch(&self, explicit: Option<ChainEpoch>) -> Result<ChainEpoch, ChainError> {
        if let Some(epoch) = explicit {
            return Ok(epoch);
        }
        let head = self.chain.current_height().await?;
        let start = head + START_EPOCH_SAFETY_WINDOW;
        debug!(head, start, "defaulted start epoch");
        Ok(start)
    }

    /// The explicit collateral, or the chain's minimum bound plus a 20% margin.
    pub async fn provider_collateral(
        &self,
        explicit: Option<TokenAmount>,
        piece_size: PaddedPieceSize,
        verified: bool,
    ) -> Result<TokenAmount, ChainError> {
        if let Some(collateral) = explicit {
            return Ok(collateral);
        }
        let bounds = self.chain.collateral_bounds(piece_size, verified).await?;
        let collateral = collateral_with_margin(&bounds.min);
        debug!(min = %bounds.min.atto(), collateral = %collateral.atto(), "defaulted provider collateral");
        Ok(collateral)
    }
}
