use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use ember_shared::errors::AppResult;
use ember_shared::types::api::ApiResponse;
use ember_shared::types::auth::AuthUser;

use crate::models::{Hobby, Photo, Profile, ProfileUpdate};
use crate::services::profile_service::{self, LocationUpdate, PhotoRequest};
use crate::store::Database;
use crate::AppState;

// --- GET /profile ---

pub async fn get_profile<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = profile_service::get_profile(state.db.as_ref(), user.id)?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PATCH /profile ---

pub async fn update_profile<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    Json(payload): Json<ProfileUpdate>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = profile_service::update_profile(state.db.as_ref(), user.id, &payload, Utc::now())?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- PUT /profile/location ---

pub async fn update_location<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    Json(payload): Json<LocationUpdate>,
) -> AppResult<Json<ApiResponse<Profile>>> {
    let profile = profile_service::update_location(state.db.as_ref(), user.id, payload, Utc::now())?;
    Ok(Json(ApiResponse::ok(profile)))
}

// --- POST /profile/photos ---

pub async fn add_photo<D: Database>(
    user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    Json(payload): Json<PhotoRequest>,
) -> AppResult<Json<ApiResponse<Photo>>> {
    let photo = profile_service::add_photo(state.db.as_ref(), user.id, &payload, Utc::now())?;
    Ok(Json(ApiResponse::ok(photo)))
}

#[derive(Debug, Deserialize)]
pub struct HobbyParams {
    pub category: Option<String>,
}

// --- GET /hobbies ---

pub async fn list_hobbies<D: Database>(
    _user: AuthUser,
    State(state): State<Arc<AppState<D>>>,
    Query(params): Query<HobbyParams>,
) -> AppResult<Json<ApiResponse<Vec<Hobby>>>> {
    let hobbies = profile_service::list_hobbies(state.db.as_ref(), params.category.as_deref())?;
    Ok(Json(ApiResponse::ok(hobbies)))
}
