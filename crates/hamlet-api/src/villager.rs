//! Villager HTTP surface
//!
//! Three groups of routes: operator commands (actions, outbound trades),
//! the peer-facing trade endpoints, and the mutation endpoints the trade
//! registry drives in the centralized variant.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use hamlet_node::Villager;
use hamlet_types::{
    Ack, CurrencyMutation, HamletError, InitiateTradeRequest, ItemKind, ItemMutation,
    MerchantExchangeRequest, MerchantExchangeResponse, TimeAdvanceNotice, TradeAcceptedNotice,
    TradeConfirmNotice, TradeDirection, TradeId, TradeListResponse, TradeOffer,
    TradeRefundNotice, TradeRequest, TradeRequestResponse, TradeSettledNotice, VillagerInfo,
};

use crate::error::ApiResult;

pub fn villager_routes(villager: Arc<Villager>) -> Router {
    Router::new()
        .route("/info", get(info))
        .route("/actions/produce", post(produce))
        .route("/actions/sleep", post(sleep))
        .route("/actions/eat", post(eat))
        .route("/actions/idle", post(idle))
        .route("/merchant/exchange", post(merchant_exchange))
        .route("/merchant/trade", post(merchant_trade))
        .route("/trades", post(receive_trade_request))
        .route("/trades/request", post(initiate_trade))
        .route("/trades/pending", get(pending_trades))
        .route("/trades/sent", get(sent_trades))
        .route("/trades/:id", get(get_trade))
        .route("/trades/:id/accept", post(accept_trade))
        .route("/trades/:id/reject", post(reject_trade))
        .route("/trades/:id/confirm", post(confirm_trade))
        .route("/trades/:id/cancel", post(cancel_trade))
        .route("/notify/time", post(notify_time))
        .route("/notify/trade-accepted", post(notify_accepted))
        .route("/notify/trade-confirm", post(notify_confirm))
        .route("/notify/trade-settled", post(notify_settled))
        .route("/notify/trade-refund", post(notify_refund))
        .route("/mutate/pay", post(mutate_pay))
        .route("/mutate/receive", post(mutate_receive))
        .route("/mutate/refund", post(mutate_refund))
        .route("/mutate/take-items", post(mutate_take_items))
        .route("/mutate/grant-items", post(mutate_grant_items))
        .with_state(villager)
}

fn parse_id(raw: &str) -> Result<TradeId, HamletError> {
    TradeId::parse(raw).map_err(|e| HamletError::validation("trade_id", e.to_string()))
}

async fn info(State(villager): State<Arc<Villager>>) -> Json<VillagerInfo> {
    Json(villager.info().await)
}

// ---------------------------------------------------------------------
// Operator commands
// ---------------------------------------------------------------------

async fn produce(State(villager): State<Arc<Villager>>) -> ApiResult<Json<Ack>> {
    Ok(Json(Ack::ok(villager.produce().await?)))
}

async fn sleep(State(villager): State<Arc<Villager>>) -> ApiResult<Json<Ack>> {
    Ok(Json(Ack::ok(villager.sleep().await?)))
}

async fn eat(State(villager): State<Arc<Villager>>) -> ApiResult<Json<Ack>> {
    Ok(Json(Ack::ok(villager.eat().await?)))
}

async fn idle(State(villager): State<Arc<Villager>>) -> ApiResult<Json<Ack>> {
    Ok(Json(Ack::ok(villager.idle().await?)))
}

/// Operator command: trade against a remote merchant counter.
#[derive(Debug, Deserialize)]
struct MerchantTradeCommand {
    merchant_address: String,
    item: ItemKind,
    quantity: u64,
    direction: TradeDirection,
}

async fn merchant_trade(
    State(villager): State<Arc<Villager>>,
    Json(command): Json<MerchantTradeCommand>,
) -> ApiResult<Json<Ack>> {
    let message = villager
        .trade_with_merchant(
            &command.merchant_address,
            command.item,
            command.quantity,
            command.direction,
        )
        .await?;
    Ok(Json(Ack::ok(message)))
}

async fn initiate_trade(
    State(villager): State<Arc<Villager>>,
    Json(request): Json<InitiateTradeRequest>,
) -> ApiResult<Json<TradeRequestResponse>> {
    let trade_id = villager
        .request_trade(
            request.counterparty,
            request.counterparty_address,
            request.item,
            request.quantity,
            request.price,
            request.direction,
        )
        .await?;
    Ok(Json(TradeRequestResponse {
        success: true,
        trade_id,
    }))
}

async fn accept_trade(
    State(villager): State<Arc<Villager>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    Ok(Json(villager.accept_trade(&id).await?))
}

async fn reject_trade(
    State(villager): State<Arc<Villager>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    Ok(Json(villager.reject_trade(&id).await?))
}

async fn confirm_trade(
    State(villager): State<Arc<Villager>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    Ok(Json(villager.confirm_trade(&id).await?))
}

async fn cancel_trade(
    State(villager): State<Arc<Villager>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    Ok(Json(villager.cancel_trade(&id).await?))
}

async fn pending_trades(State(villager): State<Arc<Villager>>) -> Json<TradeListResponse> {
    Json(TradeListResponse {
        trades: villager.pending_trades().await,
    })
}

async fn sent_trades(State(villager): State<Arc<Villager>>) -> Json<TradeListResponse> {
    Json(TradeListResponse {
        trades: villager.sent_trades().await,
    })
}

async fn get_trade(
    State(villager): State<Arc<Villager>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    let offer = villager
        .trade(&id)
        .await
        .ok_or_else(|| HamletError::not_found("trade", id.to_string()))?;
    Ok(Json(offer))
}

// ---------------------------------------------------------------------
// Peer-facing endpoints
// ---------------------------------------------------------------------

async fn receive_trade_request(
    State(villager): State<Arc<Villager>>,
    Json(request): Json<TradeRequest>,
) -> ApiResult<Json<TradeRequestResponse>> {
    let offer = villager.on_trade_request(&request).await?;
    Ok(Json(TradeRequestResponse {
        success: true,
        trade_id: offer.id,
    }))
}

async fn merchant_exchange(
    State(villager): State<Arc<Villager>>,
    Json(request): Json<MerchantExchangeRequest>,
) -> ApiResult<Json<MerchantExchangeResponse>> {
    let total_amount = villager.serve_merchant_exchange(&request).await?;
    Ok(Json(MerchantExchangeResponse {
        success: true,
        message: format!("exchanged {} {}", request.quantity, request.item),
        total_amount,
    }))
}

async fn notify_time(
    State(villager): State<Arc<Villager>>,
    Json(notice): Json<TimeAdvanceNotice>,
) -> Json<Ack> {
    villager.apply_period_advance(&notice).await;
    Json(Ack::ok("time applied"))
}

async fn notify_accepted(
    State(villager): State<Arc<Villager>>,
    Json(notice): Json<TradeAcceptedNotice>,
) -> Json<Ack> {
    villager.on_trade_accepted(&notice).await;
    Json(Ack::ok("notice applied"))
}

async fn notify_confirm(
    State(villager): State<Arc<Villager>>,
    Json(notice): Json<TradeConfirmNotice>,
) -> Json<Ack> {
    villager.on_trade_confirm(&notice).await;
    Json(Ack::ok("notice applied"))
}

async fn notify_settled(
    State(villager): State<Arc<Villager>>,
    Json(notice): Json<TradeSettledNotice>,
) -> Json<Ack> {
    villager.on_trade_settled(&notice).await;
    Json(Ack::ok("notice applied"))
}

async fn notify_refund(
    State(villager): State<Arc<Villager>>,
    Json(notice): Json<TradeRefundNotice>,
) -> Json<Ack> {
    villager.on_trade_refund(&notice).await;
    Json(Ack::ok("notice applied"))
}

// ---------------------------------------------------------------------
// Registry-issued mutations
// ---------------------------------------------------------------------

async fn mutate_pay(
    State(villager): State<Arc<Villager>>,
    Json(mutation): Json<CurrencyMutation>,
) -> ApiResult<Json<Ack>> {
    villager.pay(&mutation).await?;
    Ok(Json(Ack::ok("paid")))
}

async fn mutate_receive(
    State(villager): State<Arc<Villager>>,
    Json(mutation): Json<CurrencyMutation>,
) -> Json<Ack> {
    villager.receive_currency(&mutation).await;
    Json(Ack::ok("received"))
}

async fn mutate_refund(
    State(villager): State<Arc<Villager>>,
    Json(mutation): Json<CurrencyMutation>,
) -> Json<Ack> {
    villager.refund_currency(&mutation).await;
    Json(Ack::ok("refunded"))
}

async fn mutate_take_items(
    State(villager): State<Arc<Villager>>,
    Json(mutation): Json<ItemMutation>,
) -> ApiResult<Json<Ack>> {
    villager.take_items(&mutation).await?;
    Ok(Json(Ack::ok("taken")))
}

async fn mutate_grant_items(
    State(villager): State<Arc<Villager>>,
    Json(mutation): Json<ItemMutation>,
) -> Json<Ack> {
    villager.grant_items(&mutation).await;
    Json(Ack::ok("granted"))
}
