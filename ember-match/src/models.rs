use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use ember_shared::errors::{AppError, AppResult};

use crate::schema::{hobbies, match_messages, matches, profile_photos, profiles, swipe_actions};

// --- Enums stored as varchar ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Gender {
    Male,
    Female,
    NonBinary,
    Other,
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Gender::Male => write!(f, "male"),
            Gender::Female => write!(f, "female"),
            Gender::NonBinary => write!(f, "non-binary"),
            Gender::Other => write!(f, "other"),
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "male" => Ok(Gender::Male),
            "female" => Ok(Gender::Female),
            "non-binary" => Ok(Gender::NonBinary),
            "other" => Ok(Gender::Other),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileStatus {
    Active,
    Inactive,
    Hidden,
}

impl std::fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProfileStatus::Active => write!(f, "active"),
            ProfileStatus::Inactive => write!(f, "inactive"),
            ProfileStatus::Hidden => write!(f, "hidden"),
        }
    }
}

impl std::str::FromStr for ProfileStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(ProfileStatus::Active),
            "inactive" => Ok(ProfileStatus::Inactive),
            "hidden" => Ok(ProfileStatus::Hidden),
            _ => Err(format!("unknown profile status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Like,
    Pass,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Like => write!(f, "like"),
            Direction::Pass => write!(f, "pass"),
        }
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(Direction::Like),
            "pass" => Ok(Direction::Pass),
            _ => Err(format!("unknown swipe direction: {s}")),
        }
    }
}

fn parse_column<T>(value: &str) -> AppResult<T>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e: String| AppError::internal(format!("corrupt stored value: {e}")))
}

// --- Hobby ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Deserialize, Clone, PartialEq)]
#[diesel(table_name = hobbies)]
pub struct Hobby {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category: String,
}

// --- Photo ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Clone, PartialEq)]
#[diesel(table_name = profile_photos)]
pub struct Photo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profile_photos)]
pub struct NewPhoto<'a> {
    pub user_id: Uuid,
    pub url: &'a str,
    pub is_primary: bool,
    pub created_at: DateTime<Utc>,
}

// --- Profile ---

#[derive(Debug, Queryable, Selectable, Clone)]
#[diesel(table_name = profiles)]
pub struct ProfileRow {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub pronouns: Option<String>,
    pub bio: Option<String>,
    pub status: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_preference: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileRow {
    pub fn into_profile(self, hobbies: Vec<Hobby>, photos: Vec<Photo>) -> AppResult<Profile> {
        Ok(Profile {
            user_id: self.user_id,
            display_name: self.display_name,
            age: self.age,
            gender: self.gender.as_deref().map(parse_column).transpose()?,
            pronouns: self.pronouns,
            bio: self.bio,
            status: parse_column(&self.status)?,
            latitude: self.latitude,
            longitude: self.longitude,
            radius_preference: self.radius_preference,
            hobbies,
            photos,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
}

pub const DEFAULT_RADIUS_MILES: i32 = 25;

/// A user's profile with its hobbies and photos attached.
#[derive(Debug, Serialize, Clone)]
pub struct Profile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub pronouns: Option<String>,
    pub bio: Option<String>,
    pub status: ProfileStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub radius_preference: i32,
    pub hobbies: Vec<Hobby>,
    pub photos: Vec<Photo>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// Profile with the defaults applied on first access.
    pub fn with_defaults(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            display_name: None,
            age: None,
            gender: None,
            pronouns: None,
            bio: None,
            status: ProfileStatus::Active,
            latitude: None,
            longitude: None,
            radius_preference: DEFAULT_RADIUS_MILES,
            hobbies: Vec::new(),
            photos: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn location(&self) -> Option<(f64, f64)> {
        self.latitude.zip(self.longitude)
    }

    /// Most recent photo flagged primary.
    pub fn primary_photo(&self) -> Option<&Photo> {
        self.photos
            .iter()
            .filter(|p| p.is_primary)
            .max_by_key(|p| p.created_at)
    }

    pub fn summary(&self) -> ProfileSummary {
        ProfileSummary {
            user_id: self.user_id,
            display_name: self.display_name.clone(),
            age: self.age,
            gender: self.gender,
            bio: self.bio.clone(),
            primary_photo_url: self.primary_photo().map(|p| p.url.clone()),
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct ProfileSummary {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub bio: Option<String>,
    pub primary_photo_url: Option<String>,
}

/// Partial profile update. Absent fields are left untouched; `hobby_ids`
/// replaces the whole hobby set when present.
#[derive(Debug, Default, Clone, Deserialize, Validate)]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 50, message = "display name must be 1-50 characters"))]
    pub display_name: Option<String>,
    #[validate(range(min = 18, max = 120, message = "age must be between 18 and 120"))]
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    #[validate(length(max = 30, message = "pronouns must be at most 30 characters"))]
    pub pronouns: Option<String>,
    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub bio: Option<String>,
    pub status: Option<ProfileStatus>,
    #[validate(range(min = 1, max = 500, message = "radius must be between 1 and 500 miles"))]
    pub radius_preference: Option<i32>,
    pub hobby_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, AsChangeset)]
#[diesel(table_name = profiles)]
pub struct ProfileChangeset {
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub pronouns: Option<String>,
    pub bio: Option<String>,
    pub status: Option<String>,
    pub radius_preference: Option<i32>,
    pub updated_at: DateTime<Utc>,
}

impl ProfileChangeset {
    pub fn from_update(update: &ProfileUpdate, now: DateTime<Utc>) -> Self {
        Self {
            display_name: update.display_name.clone(),
            age: update.age,
            gender: update.gender.map(|g| g.to_string()),
            pronouns: update.pronouns.clone(),
            bio: update.bio.clone(),
            status: update.status.map(|s| s.to_string()),
            radius_preference: update.radius_preference,
            updated_at: now,
        }
    }
}

// --- SwipeAction ---

#[derive(Debug, Queryable, Selectable)]
#[diesel(table_name = swipe_actions)]
pub struct SwipeActionRow {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub direction: String,
    pub action_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct SwipeAction {
    pub id: Uuid,
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub direction: Direction,
    /// UTC day the action counts against for quota purposes.
    pub action_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<SwipeActionRow> for SwipeAction {
    type Error = AppError;

    fn try_from(row: SwipeActionRow) -> AppResult<Self> {
        Ok(Self {
            id: row.id,
            actor_id: row.actor_id,
            target_id: row.target_id,
            direction: parse_column(&row.direction)?,
            action_date: row.action_date,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewSwipeAction {
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub direction: Direction,
    pub action_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = swipe_actions)]
pub struct NewSwipeActionRow {
    pub actor_id: Uuid,
    pub target_id: Uuid,
    pub direction: String,
    pub action_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl From<&NewSwipeAction> for NewSwipeActionRow {
    fn from(action: &NewSwipeAction) -> Self {
        Self {
            actor_id: action.actor_id,
            target_id: action.target_id,
            direction: action.direction.to_string(),
            action_date: action.action_date,
            created_at: action.created_at,
        }
    }
}

// --- Match ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Clone, PartialEq)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_interaction_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Normalized key for an unordered pair: smaller id first.
    pub fn ordered_pair(a: Uuid, b: Uuid) -> (Uuid, Uuid) {
        if a < b {
            (a, b)
        } else {
            (b, a)
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.user1_id == user_id {
            Some(self.user2_id)
        } else if self.user2_id == user_id {
            Some(self.user1_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch {
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub last_interaction_at: Option<DateTime<Utc>>,
}

// --- ConversationMessage ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Clone, PartialEq)]
#[diesel(table_name = match_messages)]
pub struct ConversationMessage {
    pub id: Uuid,
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = match_messages)]
pub struct NewMessage {
    pub match_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
    pub created_at: DateTime<Utc>,
}
