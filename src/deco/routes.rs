//! HTTP route handlers for deco planning API.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use sha2::{Digest, Sha256};

use crate::error::AppError;
use crate::AppState;

use super::engine::Engine;
use super::error::DecoError;
use super::models::{DecoStop, PlanRequest, PlanResponse, TOOL, TOOL_VERSION};
use super::model::TissueModel;
use super::planner;

/// Create the deco router with all endpoints.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/plan", post(plan))
}

/// Compute SHA256 hash of input string.
fn sha256_hex(s: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(s.as_bytes());
    let digest = hasher.finalize();
    format!("sha256:{}", hex::encode(digest))
}

/// Health check for deco planning engine.
async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": "deco-planner",
        "version": TOOL_VERSION,
        "model": state.defaults.model.name(),
        "models": [TissueModel::ZhL16bGf.name(), TissueModel::ZhL16cGf.name()],
    }))
}

/// Calculate a dive plan with its decompression stops.
async fn plan(
    State(state): State<AppState>,
    Json(request): Json<PlanRequest>,
) -> Result<Json<PlanResponse>, AppError> {
    // Serialize request for input hash
    let input_json = serde_json::to_string(&request)?;

    request.validate()?;
    let config = request.engine_config(&state.defaults);
    let mut engine = Engine::with_gases(config, &request.gas_mixes())?;
    for mix in request.travel_mixes() {
        engine.add_travel_gas(mix)?;
    }

    // CPU bound, keep it off the async runtime workers
    let (depth, bottom_time) = (request.depth_m, request.bottom_time_min);
    let (engine, plan) = tokio::task::spawn_blocking(move || {
        let plan = planner::plan(&engine, depth, bottom_time)?;
        Ok::<_, DecoError>((engine, plan))
    })
    .await??;

    let stops = plan
        .table
        .iter()
        .map(|s| DecoStop {
            depth_m: s.depth,
            duration_min: s.time,
        })
        .collect();

    let config = engine.config();
    Ok(Json(PlanResponse {
        tool: TOOL,
        tool_version: TOOL_VERSION,
        model: config.model.name(),
        gf_low: config.gf_low,
        gf_high: config.gf_high,
        deco_required: plan.deco_required(),
        stops,
        total_deco_min: plan.table.total(),
        first_stop_m: plan.first_stop().map(|s| s.depth),
        max_depth_m: plan.max_depth,
        runtime_min: plan.runtime / 60.0,
        input_hash: sha256_hex(&input_json),
        steps: request.include_steps.then_some(plan.steps),
    }))
}
