//! Persistence contracts for the matching core.
//!
//! Services only talk to these traits. Each request runs inside a single
//! [`Database::transaction`], so checks and writes made through the
//! repositories commit or roll back together.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use ember_shared::errors::AppResult;

use crate::models::{
    ConversationMessage, Hobby, Match, NewMessage, NewSwipeAction, Photo, Profile, ProfileUpdate,
    SwipeAction,
};
use crate::services::distance::GeoBounds;

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub trait ProfileRepository {
    fn user_exists(&mut self, user_id: Uuid) -> AppResult<bool>;

    /// Records a user id announced by the auth service. Returns false if it was already known.
    fn register_user(&mut self, user_id: Uuid) -> AppResult<bool>;

    /// Loads the profile, creating it with defaults on first access.
    fn get_or_create_profile(&mut self, user_id: Uuid) -> AppResult<Profile>;

    fn update_profile(&mut self, user_id: Uuid, update: &ProfileUpdate, now: DateTime<Utc>) -> AppResult<Profile>;

    fn update_location(&mut self, user_id: Uuid, latitude: f64, longitude: f64, now: DateTime<Utc>) -> AppResult<Profile>;

    /// Adds a photo; a new primary photo clears the flag on the user's other photos.
    fn add_photo(&mut self, user_id: Uuid, url: &str, is_primary: bool, now: DateTime<Utc>) -> AppResult<Photo>;

    /// Active profiles with coordinates inside `bounds`, minus `excluding`,
    /// ordered by user id and capped at `ceiling`.
    fn list_active_profiles_with_location(
        &mut self,
        excluding: &HashSet<Uuid>,
        bounds: &GeoBounds,
        ceiling: usize,
    ) -> AppResult<Vec<Profile>>;

    fn list_hobbies(&mut self, category: Option<&str>) -> AppResult<Vec<Hobby>>;
}

pub trait ActionRepository {
    fn find_action(&mut self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<SwipeAction>>;

    /// Inserts the action unless one already exists for the ordered pair, in
    /// which case `None` is returned and nothing is written.
    fn insert_action(&mut self, action: &NewSwipeAction) -> AppResult<Option<SwipeAction>>;

    /// Counts actions whose `action_date` lies in `[from, to)`.
    fn count_actions_in_range(&mut self, actor_id: Uuid, from: NaiveDate, to: NaiveDate) -> AppResult<i64>;

    fn list_target_ids_acted_on_by(&mut self, actor_id: Uuid) -> AppResult<HashSet<Uuid>>;
}

pub trait MatchRepository {
    fn find_match(&mut self, match_id: Uuid) -> AppResult<Option<Match>>;

    fn find_match_by_pair(&mut self, a: Uuid, b: Uuid) -> AppResult<Option<Match>>;

    /// Inserts a match for the normalized pair. `None` when the pair is already matched.
    fn insert_match(&mut self, user1_id: Uuid, user2_id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Match>>;

    fn update_last_interaction(&mut self, match_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    fn list_matches_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<Match>>;
}

pub trait MessageRepository {
    /// Messages of a match, oldest first.
    fn list_messages(&mut self, match_id: Uuid) -> AppResult<Vec<ConversationMessage>>;

    fn insert_message(&mut self, message: NewMessage) -> AppResult<ConversationMessage>;
}

pub trait Repository: ProfileRepository + ActionRepository + MatchRepository + MessageRepository {}

impl<T> Repository for T where T: ProfileRepository + ActionRepository + MatchRepository + MessageRepository {}

/// Transactional access to the repositories.
pub trait Database: Send + Sync + 'static {
    type Conn: Repository;

    /// Runs `f` in one transaction: committed when it returns `Ok`, rolled back otherwise.
    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut Self::Conn) -> AppResult<T>;

    /// Cheap liveness probe for health checks.
    fn ping(&self) -> AppResult<()>;
}
