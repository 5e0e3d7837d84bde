//! Hamlet Client - the HTTP face of remote nodes
//!
//! One client struct per node role, each a thin wrapper over a shared
//! [`reqwest::Client`]. These structs are the production implementations
//! of the transport seams the core crates define ([`CoordinatorHandle`],
//! [`PeerNotifier`], [`MerchantClient`], [`AdvanceNotifier`],
//! [`VillagerGateway`]); tests in those crates substitute in-memory ones.
//!
//! Error mapping: transport failures and timeouts become
//! [`HamletError::Unreachable`]; a non-2xx response carries an
//! [`ErrorBody`] whose embedded structured error is surfaced as-is, so a
//! remote `InsufficientResource` looks the same as a local one.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;

use hamlet_coordinator::AdvanceNotifier;
use hamlet_node::{CoordinatorHandle, MerchantClient, PeerNotifier};
use hamlet_registry::VillagerGateway;
use hamlet_trade::{NoticePayload, TradeNotice};
use hamlet_types::{
    Ack, Clock, CurrencyMutation, ErrorBody, HamletError, InitiateTradeRequest, ItemMutation,
    ListNodesResponse, MerchantExchangeRequest, MerchantExchangeResponse, NodeId, NodeRegistration,
    RegisterRequest, Result,
    SubmitActionRequest, SubmitActionResponse, TimeAdvanceNotice, TradeActionRequest, TradeId,
    TradeListResponse, TradeOffer, TradeRequest, TradeRequestResponse, VillagerInfo,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the shared HTTP client all role clients wrap.
pub fn default_http_client() -> Result<Client> {
    Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| HamletError::validation("http_client", e.to_string()))
}

async fn post_json<B: Serialize, T: DeserializeOwned>(
    client: &Client,
    url: &str,
    body: &B,
) -> Result<T> {
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .map_err(|e| HamletError::unreachable(url, e.to_string()))?;
    decode(url, response).await
}

async fn get_json<T: DeserializeOwned>(client: &Client, url: &str) -> Result<T> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| HamletError::unreachable(url, e.to_string()))?;
    decode(url, response).await
}

async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .map_err(|e| HamletError::unreachable(url, format!("malformed response: {e}")));
    }
    match response.json::<ErrorBody>().await {
        Ok(body) => Err(body
            .error
            .unwrap_or_else(|| HamletError::validation(body.code, body.message))),
        Err(_) => Err(HamletError::unreachable(url, format!("http status {status}"))),
    }
}

// ============================================================================
// Coordinator
// ============================================================================

/// Client for the barrier coordinator.
#[derive(Debug, Clone)]
pub struct CoordinatorClient {
    client: Client,
    base_url: String,
}

impl CoordinatorClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let url = format!("{}/register", self.base_url);
        let _: Ack = post_json(&self.client, &url, request).await?;
        Ok(())
    }

    pub async fn current_time(&self) -> Result<Clock> {
        let url = format!("{}/time", self.base_url);
        get_json(&self.client, &url).await
    }

    pub async fn list_nodes(&self) -> Result<Vec<NodeRegistration>> {
        let url = format!("{}/nodes", self.base_url);
        let response: ListNodesResponse = get_json(&self.client, &url).await?;
        Ok(response.nodes)
    }
}

#[async_trait::async_trait]
impl CoordinatorHandle for CoordinatorClient {
    async fn submit_action(&self, request: SubmitActionRequest) -> Result<SubmitActionResponse> {
        let url = format!("{}/actions", self.base_url);
        post_json(&self.client, &url, &request).await
    }
}

// ============================================================================
// Villager
// ============================================================================

/// Client for villager nodes. Addressed per call, since a node talks to
/// many peers with one client.
#[derive(Debug, Clone)]
pub struct VillagerClient {
    client: Client,
}

impl VillagerClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub async fn info(&self, address: &str) -> Result<VillagerInfo> {
        let url = format!("{address}/info");
        get_json(&self.client, &url).await
    }

    /// Tell a villager node to open a trade against a peer.
    pub async fn initiate_trade(
        &self,
        address: &str,
        request: &InitiateTradeRequest,
    ) -> Result<TradeId> {
        let url = format!("{address}/trades/request");
        let response: TradeRequestResponse = post_json(&self.client, &url, request).await?;
        Ok(response.trade_id)
    }

    pub async fn pending_trades(&self, address: &str) -> Result<Vec<TradeOffer>> {
        let url = format!("{address}/trades/pending");
        let response: TradeListResponse = get_json(&self.client, &url).await?;
        Ok(response.trades)
    }
}

#[async_trait::async_trait]
impl PeerNotifier for VillagerClient {
    async fn request_offer(&self, peer_address: &str, request: &TradeRequest) -> Result<TradeId> {
        let url = format!("{peer_address}/trades");
        let response: TradeRequestResponse = post_json(&self.client, &url, request).await?;
        Ok(response.trade_id)
    }

    async fn deliver(&self, notice: &TradeNotice) -> Result<()> {
        let base = &notice.peer_address;
        let _: Ack = match &notice.payload {
            NoticePayload::Accepted(n) => {
                post_json(&self.client, &format!("{base}/notify/trade-accepted"), n).await?
            }
            NoticePayload::Confirm(n) => {
                post_json(&self.client, &format!("{base}/notify/trade-confirm"), n).await?
            }
            NoticePayload::Settled(n) => {
                post_json(&self.client, &format!("{base}/notify/trade-settled"), n).await?
            }
            NoticePayload::Refund(n) => {
                post_json(&self.client, &format!("{base}/notify/trade-refund"), n).await?
            }
        };
        Ok(())
    }
}

#[async_trait::async_trait]
impl MerchantClient for VillagerClient {
    async fn exchange(
        &self,
        merchant_address: &str,
        request: &MerchantExchangeRequest,
    ) -> Result<u64> {
        let url = format!("{merchant_address}/merchant/exchange");
        let response: MerchantExchangeResponse = post_json(&self.client, &url, request).await?;
        Ok(response.total_amount)
    }
}

#[async_trait::async_trait]
impl AdvanceNotifier for VillagerClient {
    async fn notify_advance(
        &self,
        node: &NodeRegistration,
        notice: TimeAdvanceNotice,
    ) -> Result<()> {
        let url = format!("{}/notify/time", node.address);
        let _: Ack = post_json(&self.client, &url, &notice).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl VillagerGateway for VillagerClient {
    async fn pay(&self, address: &str, mutation: &CurrencyMutation) -> Result<()> {
        let url = format!("{address}/mutate/pay");
        let _: Ack = post_json(&self.client, &url, mutation).await?;
        Ok(())
    }

    async fn receive(&self, address: &str, mutation: &CurrencyMutation) -> Result<()> {
        let url = format!("{address}/mutate/receive");
        let _: Ack = post_json(&self.client, &url, mutation).await?;
        Ok(())
    }

    async fn refund(&self, address: &str, mutation: &CurrencyMutation) -> Result<()> {
        let url = format!("{address}/mutate/refund");
        let _: Ack = post_json(&self.client, &url, mutation).await?;
        Ok(())
    }

    async fn take_items(&self, address: &str, mutation: &ItemMutation) -> Result<()> {
        let url = format!("{address}/mutate/take-items");
        let _: Ack = post_json(&self.client, &url, mutation).await?;
        Ok(())
    }

    async fn grant_items(&self, address: &str, mutation: &ItemMutation) -> Result<()> {
        let url = format!("{address}/mutate/grant-items");
        let _: Ack = post_json(&self.client, &url, mutation).await?;
        Ok(())
    }
}

// ============================================================================
// Trade registry
// ============================================================================

/// Client for the centralized trade registry.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    client: Client,
    base_url: String,
}

impl RegistryClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let url = format!("{}/register", self.base_url);
        let _: Ack = post_json(&self.client, &url, request).await?;
        Ok(())
    }

    pub async fn open_trade(&self, request: &TradeRequest) -> Result<TradeOffer> {
        let url = format!("{}/trades", self.base_url);
        post_json(&self.client, &url, request).await
    }

    pub async fn get_trade(&self, id: &TradeId) -> Result<TradeOffer> {
        let url = format!("{}/trades/{id}", self.base_url);
        get_json(&self.client, &url).await
    }

    pub async fn trades_for(&self, node: &NodeId) -> Result<Vec<TradeOffer>> {
        let url = format!("{}/trades?party={node}", self.base_url);
        let response: TradeListResponse = get_json(&self.client, &url).await?;
        Ok(response.trades)
    }

    pub async fn accept(&self, id: &TradeId, caller: &NodeId) -> Result<TradeOffer> {
        self.action(id, caller, "accept").await
    }

    pub async fn reject(&self, id: &TradeId, caller: &NodeId) -> Result<TradeOffer> {
        self.action(id, caller, "reject").await
    }

    pub async fn confirm(&self, id: &TradeId, caller: &NodeId) -> Result<TradeOffer> {
        self.action(id, caller, "confirm").await
    }

    pub async fn cancel(&self, id: &TradeId, caller: &NodeId) -> Result<TradeOffer> {
        self.action(id, caller, "cancel").await
    }

    async fn action(&self, id: &TradeId, caller: &NodeId, verb: &str) -> Result<TradeOffer> {
        let url = format!("{}/trades/{id}/{verb}", self.base_url);
        let request = TradeActionRequest {
            trade_id: id.clone(),
            caller: caller.clone(),
        };
        post_json(&self.client, &url, &request).await
    }
}
