//! Trade registry HTTP surface

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use hamlet_registry::TradeRegistry;
use hamlet_types::{
    Ack, HamletError, NodeId, RegisterRequest, TradeActionRequest, TradeId, TradeListResponse,
    TradeOffer, TradeRequest,
};

use crate::error::ApiResult;

pub fn registry_routes(registry: Arc<TradeRegistry>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/trades", post(open_trade).get(list_trades))
        .route("/trades/:id", get(get_trade))
        .route("/trades/:id/accept", post(accept))
        .route("/trades/:id/reject", post(reject))
        .route("/trades/:id/confirm", post(confirm))
        .route("/trades/:id/cancel", post(cancel))
        .with_state(registry)
}

fn parse_id(raw: &str) -> Result<TradeId, HamletError> {
    TradeId::parse(raw).map_err(|e| HamletError::validation("trade_id", e.to_string()))
}

async fn register(
    State(registry): State<Arc<TradeRegistry>>,
    Json(request): Json<RegisterRequest>,
) -> Json<Ack> {
    let id = request.id.clone();
    registry.register_party(request.id, request.address).await;
    Json(Ack::ok(format!("{id} registered")))
}

async fn open_trade(
    State(registry): State<Arc<TradeRegistry>>,
    Json(request): Json<TradeRequest>,
) -> ApiResult<Json<TradeOffer>> {
    Ok(Json(registry.open_trade(&request).await?))
}

#[derive(Deserialize)]
struct PartyQuery {
    party: NodeId,
}

async fn list_trades(
    State(registry): State<Arc<TradeRegistry>>,
    Query(query): Query<PartyQuery>,
) -> Json<TradeListResponse> {
    Json(TradeListResponse {
        trades: registry.trades_for(&query.party).await,
    })
}

async fn get_trade(
    State(registry): State<Arc<TradeRegistry>>,
    Path(id): Path<String>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    let offer = registry
        .get(&id)
        .await
        .ok_or_else(|| HamletError::not_found("trade", id.to_string()))?;
    Ok(Json(offer))
}

async fn accept(
    State(registry): State<Arc<TradeRegistry>>,
    Path(id): Path<String>,
    Json(request): Json<TradeActionRequest>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    Ok(Json(registry.accept(&id, &request.caller).await?))
}

async fn reject(
    State(registry): State<Arc<TradeRegistry>>,
    Path(id): Path<String>,
    Json(request): Json<TradeActionRequest>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    Ok(Json(registry.reject(&id, &request.caller).await?))
}

async fn confirm(
    State(registry): State<Arc<TradeRegistry>>,
    Path(id): Path<String>,
    Json(request): Json<TradeActionRequest>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    Ok(Json(registry.confirm(&id, &request.caller).await?))
}

async fn cancel(
    State(registry): State<Arc<TradeRegistry>>,
    Path(id): Path<String>,
    Json(request): Json<TradeActionRequest>,
) -> ApiResult<Json<TradeOffer>> {
    let id = parse_id(&id)?;
    Ok(Json(registry.cancel(&id, &request.caller).await?))
}
