//! In-process store used by the test suite. A single mutex serializes
//! transactions; each one works on a snapshot that replaces the committed
//! state only when the closure succeeds.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    ConversationMessage, Hobby, Match, NewMessage, NewSwipeAction, Photo, Profile, ProfileStatus,
    ProfileUpdate, SwipeAction,
};

use crate::services::distance::GeoBounds;

use super::{ActionRepository, Database, MatchRepository, MessageRepository, ProfileRepository};

#[derive(Debug, Default, Clone)]
pub struct MemoryState {
    users: HashSet<Uuid>,
    profiles: HashMap<Uuid, Profile>,
    hobbies: Vec<Hobby>,
    actions: Vec<SwipeAction>,
    matches: Vec<Match>,
    messages: Vec<ConversationMessage>,
}

impl MemoryState {
    pub fn add_hobby(&mut self, name: &str, category: &str) -> Hobby {
        let hobby = Hobby {
            id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            category: category.to_string(),
        };
        self.hobbies.push(hobby.clone());
        hobby
    }

    pub fn actions(&self) -> &[SwipeAction] {
        &self.actions
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    /// Stores a match that has no recorded interaction, as rows written
    /// before `last_interaction_at` existed look.
    pub fn insert_legacy_match(&mut self, a: Uuid, b: Uuid, created_at: DateTime<Utc>) -> Match {
        let (user1_id, user2_id) = Match::ordered_pair(a, b);
        let legacy = Match {
            id: Uuid::new_v4(),
            user1_id,
            user2_id,
            created_at,
            last_interaction_at: None,
        };
        self.matches.push(legacy.clone());
        legacy
    }

    fn profile_mut(&mut self, user_id: Uuid) -> AppResult<&mut Profile> {
        self.get_or_create_profile(user_id)?;
        self.profiles
            .get_mut(&user_id)
            .ok_or_else(|| AppError::internal("profile missing after creation"))
    }
}

#[derive(Debug, Default)]
pub struct MemoryDatabase {
    state: Mutex<MemoryState>,
}

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read-only view of the committed state.
    pub fn inspect<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> T {
        let guard = self.state.lock().expect("memory store poisoned");
        f(&guard)
    }
}

impl Database for MemoryDatabase {
    type Conn = MemoryState;

    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut MemoryState) -> AppResult<T>,
    {
        let mut committed = self
            .state
            .lock()
            .map_err(|_| AppError::unavailable("memory store poisoned"))?;
        let mut working = committed.clone();
        let out = f(&mut working)?;
        *committed = working;
        Ok(out)
    }

    fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

impl ProfileRepository for MemoryState {
    fn user_exists(&mut self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.users.contains(&user_id))
    }

    fn register_user(&mut self, user_id: Uuid) -> AppResult<bool> {
        Ok(self.users.insert(user_id))
    }

    fn get_or_create_profile(&mut self, user_id: Uuid) -> AppResult<Profile> {
        self.users.insert(user_id);
        let profile = self
            .profiles
            .entry(user_id)
            .or_insert_with(|| Profile::with_defaults(user_id, Utc::now()));
        Ok(profile.clone())
    }

    fn update_profile(&mut self, user_id: Uuid, update: &ProfileUpdate, now: DateTime<Utc>) -> AppResult<Profile> {
        let hobbies = match &update.hobby_ids {
            Some(ids) => {
                let wanted: HashSet<Uuid> = ids.iter().copied().collect();
                let mut found: Vec<Hobby> = self
                    .hobbies
                    .iter()
                    .filter(|h| wanted.contains(&h.id))
                    .cloned()
                    .collect();
                if found.len() != wanted.len() {
                    return Err(AppError::new(ErrorCode::HobbyNotFound, "one or more hobbies do not exist"));
                }
                found.sort_by(|a, b| a.name.cmp(&b.name));
                Some(found)
            }
            None => None,
        };

        let profile = self.profile_mut(user_id)?;
        if let Some(v) = &update.display_name {
            profile.display_name = Some(v.clone());
        }
        if let Some(v) = update.age {
            profile.age = Some(v);
        }
        if let Some(v) = update.gender {
            profile.gender = Some(v);
        }
        if let Some(v) = &update.pronouns {
            profile.pronouns = Some(v.clone());
        }
        if let Some(v) = &update.bio {
            profile.bio = Some(v.clone());
        }
        if let Some(v) = update.status {
            profile.status = v;
        }
        if let Some(v) = update.radius_preference {
            profile.radius_preference = v;
        }
        if let Some(hobbies) = hobbies {
            profile.hobbies = hobbies;
        }
        profile.updated_at = now;
        Ok(profile.clone())
    }

    fn update_location(&mut self, user_id: Uuid, latitude: f64, longitude: f64, now: DateTime<Utc>) -> AppResult<Profile> {
        let profile = self.profile_mut(user_id)?;
        profile.latitude = Some(latitude);
        profile.longitude = Some(longitude);
        profile.updated_at = now;
        Ok(profile.clone())
    }

    fn add_photo(&mut self, user_id: Uuid, url: &str, is_primary: bool, now: DateTime<Utc>) -> AppResult<Photo> {
        let profile = self.profile_mut(user_id)?;
        if is_primary {
            for photo in &mut profile.photos {
                photo.is_primary = false;
            }
        }
        let photo = Photo {
            id: Uuid::new_v4(),
            user_id,
            url: url.to_string(),
            is_primary,
            created_at: now,
        };
        profile.photos.push(photo.clone());
        Ok(photo)
    }

    fn list_active_profiles_with_location(
        &mut self,
        excluding: &HashSet<Uuid>,
        bounds: &GeoBounds,
        ceiling: usize,
    ) -> AppResult<Vec<Profile>> {
        let mut found: Vec<Profile> = self
            .profiles
            .values()
            .filter(|p| p.status == ProfileStatus::Active)
            .filter(|p| p.location().is_some_and(|(lat, lng)| bounds.contains(lat, lng)))
            .filter(|p| !excluding.contains(&p.user_id))
            .cloned()
            .collect();
        found.sort_by_key(|p| p.user_id);
        found.truncate(ceiling);
        Ok(found)
    }

    fn list_hobbies(&mut self, category: Option<&str>) -> AppResult<Vec<Hobby>> {
        let mut found: Vec<Hobby> = self
            .hobbies
            .iter()
            .filter(|h| category.map_or(true, |c| h.category == c))
            .cloned()
            .collect();
        found.sort_by(|a, b| (&a.category, &a.name).cmp(&(&b.category, &b.name)));
        Ok(found)
    }
}

impl ActionRepository for MemoryState {
    fn find_action(&mut self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<SwipeAction>> {
        Ok(self
            .actions
            .iter()
            .find(|a| a.actor_id == actor_id && a.target_id == target_id)
            .cloned())
    }

    fn insert_action(&mut self, action: &NewSwipeAction) -> AppResult<Option<SwipeAction>> {
        if self.find_action(action.actor_id, action.target_id)?.is_some() {
            return Ok(None);
        }
        let stored = SwipeAction {
            id: Uuid::new_v4(),
            actor_id: action.actor_id,
            target_id: action.target_id,
            direction: action.direction,
            action_date: action.action_date,
            created_at: action.created_at,
        };
        self.actions.push(stored.clone());
        Ok(Some(stored))
    }

    fn count_actions_in_range(&mut self, actor_id: Uuid, from: NaiveDate, to: NaiveDate) -> AppResult<i64> {
        let count = self
            .actions
            .iter()
            .filter(|a| a.actor_id == actor_id && a.action_date >= from && a.action_date < to)
            .count();
        Ok(count as i64)
    }

    fn list_target_ids_acted_on_by(&mut self, actor_id: Uuid) -> AppResult<HashSet<Uuid>> {
        Ok(self
            .actions
            .iter()
            .filter(|a| a.actor_id == actor_id)
            .map(|a| a.target_id)
            .collect())
    }
}

impl MatchRepository for MemoryState {
    fn find_match(&mut self, match_id: Uuid) -> AppResult<Option<Match>> {
        Ok(self.matches.iter().find(|m| m.id == match_id).cloned())
    }

    fn find_match_by_pair(&mut self, a: Uuid, b: Uuid) -> AppResult<Option<Match>> {
        let (user1_id, user2_id) = Match::ordered_pair(a, b);
        Ok(self
            .matches
            .iter()
            .find(|m| m.user1_id == user1_id && m.user2_id == user2_id)
            .cloned())
    }

    fn insert_match(&mut self, user1_id: Uuid, user2_id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Match>> {
        if self.find_match_by_pair(user1_id, user2_id)?.is_some() {
            return Ok(None);
        }
        let (user1_id, user2_id) = Match::ordered_pair(user1_id, user2_id);
        let created = Match {
            id: Uuid::new_v4(),
            user1_id,
            user2_id,
            created_at: at,
            last_interaction_at: Some(at),
        };
        self.matches.push(created.clone());
        Ok(Some(created))
    }

    fn update_last_interaction(&mut self, match_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(m) = self.matches.iter_mut().find(|m| m.id == match_id) {
            m.last_interaction_at = Some(at);
        }
        Ok(())
    }

    fn list_matches_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<Match>> {
        Ok(self.matches.iter().filter(|m| m.involves(user_id)).cloned().collect())
    }
}

impl MessageRepository for MemoryState {
    fn list_messages(&mut self, match_id: Uuid) -> AppResult<Vec<ConversationMessage>> {
        let mut found: Vec<ConversationMessage> = self
            .messages
            .iter()
            .filter(|m| m.match_id == match_id)
            .cloned()
            .collect();
        found.sort_by_key(|m| m.created_at);
        Ok(found)
    }

    fn insert_message(&mut self, message: NewMessage) -> AppResult<ConversationMessage> {
        let stored = ConversationMessage {
            id: Uuid::new_v4(),
            match_id: message.match_id,
            sender_id: message.sender_id,
            content: message.content,
            created_at: message.created_at,
        };
        self.messages.push(stored.clone());
        Ok(stored)
    }
}
