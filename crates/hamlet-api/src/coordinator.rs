//! Coordinator HTTP surface

use std::sync::Arc;

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};

use hamlet_coordinator::Coordinator;
use hamlet_types::{
    Ack, Clock, ListNodesResponse, RegisterRequest, SubmitActionRequest, SubmitActionResponse,
};

use crate::error::ApiResult;

pub fn coordinator_routes(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/time", get(current_time))
        .route("/nodes", get(list_nodes))
        .route("/actions", post(submit_action))
        .with_state(coordinator)
}

async fn register(
    State(coordinator): State<Arc<Coordinator>>,
    Json(request): Json<RegisterRequest>,
) -> Json<Ack> {
    let id = request.id.clone();
    coordinator.register(request).await;
    Json(Ack::ok(format!("{id} registered")))
}

async fn current_time(State(coordinator): State<Arc<Coordinator>>) -> Json<Clock> {
    Json(coordinator.current_time().await)
}

async fn list_nodes(State(coordinator): State<Arc<Coordinator>>) -> Json<ListNodesResponse> {
    Json(ListNodesResponse {
        nodes: coordinator.list_nodes().await,
    })
}

async fn submit_action(
    State(coordinator): State<Arc<Coordinator>>,
    Json(request): Json<SubmitActionRequest>,
) -> ApiResult<Json<SubmitActionResponse>> {
    Ok(Json(coordinator.submit_action(request).await?))
}
