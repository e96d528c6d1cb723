use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use jsonrpsee::{
    core::client::ClientT,
    http_client::{HeaderMap, HeaderValue, HttpClient, HttpClientBuilder},
    rpc_params,
};
use libp2p::{Multiaddr, PeerId};
use num_bigint::BigInt;
use pledge_primitives::{Address, ChainEpoch, PaddedPieceSize, TokenAmount};
use serde::Deserialize;
use tracing::debug;

use crate::{ChainError, ChainState, CollateralBounds, ProviderPeer};

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection settings for a Lotus full node.
#[derive(Debug, Clone)]
pub struct LotusConfig {
    /// JSON-RPC endpoint, e.g. `https://api.node.glif.io/rpc/v1`.
    pub api_url: String,
    /// Optional bearer token.
    pub token: Option<String>,
    pub request_timeout: Duration,
}

impl LotusConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self { api_url: api_url.into(), token: None, request_timeout: DEFAULT_REQUEST_TIMEOUT }
    }

    pub fn with_token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }
}

/// [`ChainState`] backed by the Lotus JSON-RPC v1 API.
#[derive(Debug, Clone)]
pub struct LotusClient {
    client: HttpClient,
}

impl LotusClient {
    pub fn new(config: &LotusConfig) -> Result<Self, ChainError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = config.token.as_deref().filter(|t| !t.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ChainError::Config(e.to_string()))?;
            headers.insert("Authorization", value);
        }

        let client = HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(config.request_timeout)
            .build(&config.api_url)
            .map_err(|e| ChainError::Config(e.to_string()))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl ChainState for LotusClient {
    async fn current_height(&self) -> Result<ChainEpoch, ChainError> {
        let head: TipSet = self.client.request("Filecoin.ChainHead", rpc_params![]).await?;
        debug!(height = head.height, "fetched chain head");
        Ok(head.height)
    }

    async fn collateral_bounds(
        &self,
        piece_size: PaddedPieceSize,
        verified: bool,
    ) -> Result<CollateralBounds, ChainError> {
        let bounds: DealCollateralBounds = self
            .client
            .request(
                "Filecoin.StateDealProviderCollateralBounds",
                rpc_params![piece_size.0, verified, serde_json::Value::Null],
            )
            .await?;
        debug!(piece_size = piece_size.0, verified, min = %bounds.min, "fetched collateral bounds");
        bounds.try_into()
    }

    async fn resolve_peer(&self, provider: &Address) -> Result<ProviderPeer, ChainError> {
        let info: MinerInfo = self
            .client
            .request(
                "Filecoin.StateMinerInfo",
                rpc_params![provider.to_string(), serde_json::Value::Null],
            )
            .await?;
        info.into_provider_peer(provider)
    }
}

#[derive(Debug, Deserialize)]
struct TipSet {
    #[serde(rename = "Height")]
    height: ChainEpoch,
}

/// Lotus encodes big integers as decimal strings.
#[derive(Debug, Deserialize)]
struct DealCollateralBounds {
    #[serde(rename = "Min")]
    min: String,
    #[serde(rename = "Max")]
    max: String,
}

impl TryFrom<DealCollateralBounds> for CollateralBounds {
    type Error = ChainError;

    fn try_from(bounds: DealCollateralBounds) -> Result<Self, Self::Error> {
        Ok(Self { min: parse_token_amount(&bounds.min)?, max: parse_token_amount(&bounds.max)? })
    }
}

fn parse_token_amount(text: &str) -> Result<TokenAmount, ChainError> {
    BigInt::from_str(text)
        .map(TokenAmount::from_atto)
        .map_err(|e| ChainError::InvalidResponse(format!("bad token amount {text:?}: {e}")))
}

#[derive(Debug, Deserialize)]
struct MinerInfo {
    #[serde(rename = "PeerId")]
    peer_id: Option<String>,
    #[serde(rename = "Multiaddrs")]
    multiaddrs: Option<Vec<String>>,
}

impl MinerInfo {
    fn into_provider_peer(self, provider: &Address) -> Result<ProviderPeer, ChainError> {
        let invalid = |reason: String| ChainError::InvalidPeerRecord {
            provider: provider.to_string(),
            reason,
        };

        let peer_id = self
            .peer_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ChainError::NoPeerRecord(provider.to_string()))?;
        let peer_id = PeerId::from_str(&peer_id).map_err(|e| invalid(e.to_string()))?;

        let multiaddrs = self
            .multiaddrs
            .unwrap_or_default()
            .iter()
            .map(|encoded| {
                let bytes = STANDARD.decode(encoded).map_err(|e| invalid(e.to_string()))?;
                Multiaddr::try_from(bytes).map_err(|e| invalid(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if multiaddrs.is_empty() {
            return Err(ChainError::NoAddresses(provider.to_string()));
        }

        Ok(ProviderPeer { peer_id, multiaddrs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn miner_info(json: serde_json::Value) -> MinerInfo {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_miner_info_into_provider_peer() {
        let peer_id = PeerId::random();
        let addr: Multiaddr = "/ip4/10.0.0.1/tcp/24001".parse().unwrap();
        let info = miner_info(serde_json::json!({
            "Owner": "f01000",
            "PeerId": peer_id.to_base58(),
            "Multiaddrs": [STANDARD.encode(addr.to_vec())],
            "SectorSize": 34359738368u64,
        }));

        let peer = info.into_provider_peer(&Address::new_id(1000)).unwrap();
        assert_eq!(peer.peer_id, peer_id);
        assert_eq!(peer.multiaddrs, vec![addr]);
    }

    #[test]
    fn test_miner_info_without_peer_record() {
        let provider = Address::new_id(1000);

        let info = miner_info(serde_json::json!({ "PeerId": null, "Multiaddrs": null }));
        assert_matches!(info.into_provider_peer(&provider), Err(ChainError::NoPeerRecord(_)));

        let info = miner_info(serde_json::json!({
            "PeerId": PeerId::random().to_base58(),
            "Multiaddrs": [],
        }));
        assert_matches!(info.into_provider_peer(&provider), Err(ChainError::NoAddresses(_)));

        let info = miner_info(serde_json::json!({ "PeerId": "not-a-peer", "Multiaddrs": [] }));
        assert_matches!(
            info.into_provider_peer(&provider),
            Err(ChainError::InvalidPeerRecord { .. })
        );
    }

    #[test]
    fn test_collateral_bounds_parse() {
        let bounds: DealCollateralBounds =
            serde_json::from_str(r#"{"Min":"1000000000000000000","Max":"5"}"#).unwrap();
        let bounds = CollateralBounds::try_from(bounds).unwrap();
        assert_eq!(bounds.min, TokenAmount::from_whole(1));
        assert_eq!(bounds.max, TokenAmount::from_atto(5));

        let bounds: DealCollateralBounds =
            serde_json::from_str(r#"{"Min":"one","Max":"5"}"#).unwrap();
        assert_matches!(CollateralBounds::try_from(bounds), Err(ChainError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_client_builds_with_token() {
        let config = LotusConfig::new("http://127.0.0.1:1234/rpc/v1")
            .with_token(Some("secret".to_string()));
        assert!(LotusClient::new(&config).is_ok());
    }
}
