use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use crate::models::view::{RefineResponse, RefinerToggleResponse};
use crate::session::refine_bio;
use crate::state::AppState;

use super::HttpError;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/refiner/toggle", post(toggle_refiner))
        .route("/bio/refine", post(refine))
}

async fn toggle_refiner(
    State(state): State<AppState>,
) -> Result<Json<RefinerToggleResponse>, HttpError> {
    let refiner_open = state.controller.lock().await.toggle_refiner()?;
    Ok(Json(RefinerToggleResponse { refiner_open }))
}

/// Generation failures are reported in the body with `applied: false`; only
/// rejected input maps to an error status.
async fn refine(
    State(state): State<AppState>,
    Json(payload): Json<RefineRequest>,
) -> Result<Json<RefineResponse>, HttpError> {
    let outcome = refine_bio(&state.controller, Arc::clone(&state.refiner), &payload.traits).await?;
    Ok(Json(RefineResponse {
        bio: outcome.bio,
        applied: outcome.applied,
        error: outcome.error,
    }))
}

#[derive(Debug, Deserialize)]
struct RefineRequest {
    traits: String,
}
