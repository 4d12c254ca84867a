use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use uuid::Uuid;

use ember_shared::errors::AppResult;
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;

use crate::models::ConversationMessage;
use crate::services::conversation_service;
use crate::services::swipe_service::{self, MatchDetail, MatchSummary};
use crate::store::Database;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct PostMessageRequest {
    pub content: String,
}

// --- GET /matches ---

pub async fn list_matches<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
) -> AppResult<Json<ApiResponse<Vec<MatchSummary>>>> {
    let matches = swipe_service::list_matches(state.db.as_ref(), user.id)?;
    Ok(Json(ApiResponse::ok(matches)))
}

// --- GET /matches/:id ---

pub async fn get_match<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<MatchDetail>>> {
    let detail = swipe_service::get_match_details(state.db.as_ref(), match_id, user.id)?;
    Ok(Json(ApiResponse::ok(detail)))
}

// --- GET /matches/:id/messages ---

pub async fn list_messages<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    Path(match_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<ConversationMessage>>>> {
    let messages = conversation_service::list_messages(state.db.as_ref(), match_id, user.id)?;
    Ok(Json(ApiResponse::ok(messages)))
}

// --- POST /matches/:id/messages ---

pub async fn post_message<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    Path(match_id): Path<Uuid>,
    Json(req): Json<PostMessageRequest>,
) -> AppResult<Json<ApiResponse<ConversationMessage>>> {
    let message = conversation_service::post_message(
        state.db.as_ref(),
        state.events.as_ref(),
        match_id,
        user.id,
        &req.content,
        Utc::now(),
    )?;
    Ok(Json(ApiResponse::ok(message)))
}
