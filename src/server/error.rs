//! HTTP error responses
//!
//! Client errors carry their message; everything else collapses into an
//! opaque 500 naming only the pool model, with the detail logged
//! server-side.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::simulation::SimulationError;
use crate::types::PoolModel;

/// Public message for a server-side failure on a route of `model`
pub fn internal_error_message(model: PoolModel) -> &'static str {
    match model {
        PoolModel::ConstantProduct => "Failed to simulate AMM swap.",
        PoolModel::ConcentratedLiquidity => "Failed to simulate CLMM swap.",
        PoolModel::AggregatedRoute => "Failed to simulate Jupiter swap.",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Internal(PoolModel),
}

impl ApiError {
    /// Map a failed simulation on a route of `model`
    pub fn simulation(err: SimulationError, model: PoolModel) -> Self {
        match err {
            SimulationError::InvalidInput(message) => ApiError::BadRequest(message),
            SimulationError::NotFound(message) => ApiError::NotFound(message),
            other => {
                error!("Simulate {} swap failed: {}", model, other);
                ApiError::Internal(model)
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::BadRequest(message) | ApiError::NotFound(message) => message,
            ApiError::Internal(model) => internal_error_message(model).to_string(),
        };
        let body = ErrorResponse {
            status_code: status.as_u16(),
            error: status.canonical_reason().unwrap_or("Error").to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}
