use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use ember_shared::errors::{AppError, AppResult};

use crate::models::{Hobby, Photo, Profile, ProfileUpdate};
use crate::store::{Database, ProfileRepository};

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct LocationUpdate {
    #[validate(range(min = -90.0, max = 90.0, message = "latitude must be between -90 and 90"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude must be between -180 and 180"))]
    pub longitude: f64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PhotoRequest {
    #[validate(url(message = "photo url must be a valid URL"))]
    pub url: String,
    #[serde(default, alias = "isPrimary")]
    pub is_primary: bool,
}

fn validated<T: Validate>(input: &T) -> AppResult<()> {
    input.validate().map_err(|e| AppError::Validation(e.to_string()))
}

pub fn get_profile<D: Database>(db: &D, user_id: Uuid) -> AppResult<Profile> {
    db.transaction(|conn| conn.get_or_create_profile(user_id))
}

pub fn update_profile<D: Database>(
    db: &D,
    user_id: Uuid,
    update: &ProfileUpdate,
    now: DateTime<Utc>,
) -> AppResult<Profile> {
    validated(update)?;
    let profile = db.transaction(|conn| conn.update_profile(user_id, update, now))?;
    tracing::info!(user_id = %user_id, "profile updated");
    Ok(profile)
}

pub fn update_location<D: Database>(
    db: &D,
    user_id: Uuid,
    location: LocationUpdate,
    now: DateTime<Utc>,
) -> AppResult<Profile> {
    validated(&location)?;
    // NaN slips through range checks.
    if !location.latitude.is_finite() || !location.longitude.is_finite() {
        return Err(AppError::Validation("coordinates must be finite numbers".into()));
    }
    db.transaction(|conn| conn.update_location(user_id, location.latitude, location.longitude, now))
}

pub fn add_photo<D: Database>(db: &D, user_id: Uuid, request: &PhotoRequest, now: DateTime<Utc>) -> AppResult<Photo> {
    validated(request)?;
    let photo = db.transaction(|conn| conn.add_photo(user_id, &request.url, request.is_primary, now))?;
    tracing::info!(user_id = %user_id, photo_id = %photo.id, primary = photo.is_primary, "photo added");
    Ok(photo)
}

pub fn list_hobbies<D: Database>(db: &D, category: Option<&str>) -> AppResult<Vec<Hobby>> {
    db.transaction(|conn| conn.list_hobbies(category))
}
