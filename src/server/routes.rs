//! Route handlers
//!
//! One handler serves every `/connectors/{connector}/{model}/simulate-swap`
//! endpoint; the path picks the route, the query string is the request.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use super::error::ApiError;
use super::AppState;
use crate::simulation::SimulationResult;
use crate::types::{ConnectorRoute, SimulateSwapRequest};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/connectors/:connector/:model/simulate-swap",
            get(simulate_swap),
        )
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    routes: Vec<String>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        routes: ConnectorRoute::ALL
            .iter()
            .map(|route| format!("/connectors/{}/simulate-swap", route.path()))
            .collect(),
    })
}

async fn simulate_swap(
    State(state): State<AppState>,
    Path((connector, model)): Path<(String, String)>,
    query: Result<Query<SimulateSwapRequest>, QueryRejection>,
) -> Result<Json<SimulationResult>, ApiError> {
    let route: ConnectorRoute = format!("{}-{}", connector, model)
        .parse()
        .map_err(ApiError::NotFound)?;
    let Query(request) = query.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;

    let result = state
        .service
        .simulate(route, request)
        .await
        .map_err(|err| ApiError::simulation(err, route.model()))?;
    Ok(Json(result))
}
