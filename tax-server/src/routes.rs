//! HTTP routes for the tax calculator API.

use std::path::Path;

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::Method;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tax_core::TaxResult;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculateTaxRequest {
    /// Annual salary; must be a JSON number.
    #[serde(with = "rust_decimal::serde::float")]
    pub salary: Decimal,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub timestamp: i64,
    pub uptime_seconds: u64,
}

// ============================================================================
// Router
// ============================================================================

/// JSON API routes, without static files or middleware.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/calculate-tax", post(calculate_tax))
        .route("/api/v1/health", get(health_check))
}

/// Full application: API, front-end files from `static_dir`, CORS and
/// request tracing.
pub fn router(
    state: AppState,
    static_dir: &Path,
) -> Router {
    api_routes()
        .with_state(state)
        .nest_service("/static", ServeDir::new(static_dir))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/v1/calculate-tax
async fn calculate_tax(
    State(state): State<AppState>,
    payload: Result<Json<CalculateTaxRequest>, JsonRejection>,
) -> Result<Json<TaxResult>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        error!(error = %rejection, "invalid request");
        ApiError::InvalidRequest
    })?;

    info!(
        salary = %request.salary,
        year = request.year,
        "processing tax calculation request"
    );

    let result = state
        .calculator
        .calculate_tax(request.salary, request.year)
        .await
        .map_err(|err| {
            error!(error = %err, "tax calculation failed");
            ApiError::from(err)
        })?;

    info!(total_tax = %result.total_tax, "tax calculation completed");
    Ok(Json(result))
}

/// GET /api/v1/health
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "tax-calculator".to_string(),
        timestamp: Utc::now().timestamp(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
    })
}
