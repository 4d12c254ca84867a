use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;

use ember_shared::errors::{AppError, AppResult};
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;

use crate::services::discovery_service::{self, DiscoveryQuery, NearbyResult, Preferences};
use crate::store::Database;
use crate::AppState;

/// GET /discovery?limit=20&offset=0&radius=25&gender_preference=female&min_age=25&max_age=35&same_city=false
pub async fn nearby_profiles<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    query: Result<Query<DiscoveryQuery>, QueryRejection>,
) -> AppResult<Json<ApiResponse<NearbyResult>>> {
    let Query(query) = query.map_err(|e| AppError::Validation(e.body_text()))?;
    let result = discovery_service::get_nearby_profiles(
        state.db.as_ref(),
        user.id,
        &query,
        state.config.discovery_candidate_ceiling,
    )?;
    Ok(Json(ApiResponse::ok(result)))
}

/// GET /discovery/preferences
pub async fn preferences<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
) -> AppResult<Json<ApiResponse<Preferences>>> {
    let prefs = discovery_service::get_preferences(state.db.as_ref(), user.id)?;
    Ok(Json(ApiResponse::ok(prefs)))
}
