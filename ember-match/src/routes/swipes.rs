use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use ember_shared::errors::AppResult;
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;

use crate::models::Direction;
use crate::services::quota::QuotaStats;
use crate::services::swipe_service::{self, SwipeOutcome};
use crate::store::Database;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SwipeRequest {
    #[serde(alias = "targetId")]
    pub target_id: Uuid,
    pub direction: Direction,
}

// --- POST /swipes ---

pub async fn record_swipe<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    Json(req): Json<SwipeRequest>,
) -> AppResult<Json<ApiResponse<SwipeOutcome>>> {
    let outcome = swipe_service::record_action(
        state.db.as_ref(),
        state.events.as_ref(),
        user.id,
        req.target_id,
        req.direction,
        Utc::now(),
    )?;
    let message = outcome.message.clone();
    Ok(Json(ApiResponse::ok_with_message(outcome, message)))
}

// --- GET /swipes/stats ---

pub async fn get_stats<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
) -> AppResult<Json<ApiResponse<QuotaStats>>> {
    let stats = swipe_service::get_stats(state.db.as_ref(), user.id, Utc::now())?;
    Ok(Json(ApiResponse::ok(stats)))
}
