use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use ember_shared::clients::db::{checkout, DbPool};
use ember_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{
    ConversationMessage, Hobby, Match, NewMatch, NewMessage, NewPhoto, NewProfile, NewSwipeAction,
    NewSwipeActionRow, Photo, Profile, ProfileChangeset, ProfileRow, ProfileUpdate, SwipeAction,
    SwipeActionRow,
};
use crate::schema::{
    hobbies, match_messages, matches, profile_hobbies, profile_photos, profiles, swipe_actions, users,
};

use crate::services::distance::GeoBounds;

use super::{ActionRepository, Database, MatchRepository, MessageRepository, ProfileRepository};

/// Postgres-backed store. Every transaction runs SERIALIZABLE, so the quota
/// count and the inserts that follow it cannot interleave with a concurrent
/// request for the same actor; lost races surface as serialization failures
/// (retryable) or as `ON CONFLICT DO NOTHING` misses on the unique pair keys.
pub struct PgDatabase {
    pool: DbPool,
}

impl PgDatabase {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Database for PgDatabase {
    type Conn = PgConnection;

    fn transaction<T, F>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut PgConnection) -> AppResult<T>,
    {
        let mut conn = checkout(&self.pool)?;
        conn.build_transaction().serializable().run(f)
    }

    fn ping(&self) -> AppResult<()> {
        let mut conn = checkout(&self.pool)?;
        diesel::sql_query("SELECT 1").execute(&mut *conn)?;
        Ok(())
    }
}

fn attach_profile_details(conn: &mut PgConnection, rows: Vec<ProfileRow>) -> AppResult<Vec<Profile>> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.user_id).collect();

    let hobby_rows = profile_hobbies::table
        .inner_join(hobbies::table)
        .filter(profile_hobbies::user_id.eq_any(ids.clone()))
        .order(hobbies::name.asc())
        .select((profile_hobbies::user_id, hobbies::all_columns))
        .load::<(Uuid, Hobby)>(conn)?;

    let photo_rows = profile_photos::table
        .filter(profile_photos::user_id.eq_any(ids))
        .order(profile_photos::created_at.asc())
        .load::<Photo>(conn)?;

    let mut hobbies_by_user: HashMap<Uuid, Vec<Hobby>> = HashMap::new();
    for (user_id, hobby) in hobby_rows {
        hobbies_by_user.entry(user_id).or_default().push(hobby);
    }
    let mut photos_by_user: HashMap<Uuid, Vec<Photo>> = HashMap::new();
    for photo in photo_rows {
        photos_by_user.entry(photo.user_id).or_default().push(photo);
    }

    rows.into_iter()
        .map(|row| {
            let hobbies = hobbies_by_user.remove(&row.user_id).unwrap_or_default();
            let photos = photos_by_user.remove(&row.user_id).unwrap_or_default();
            row.into_profile(hobbies, photos)
        })
        .collect()
}

fn load_profile(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Profile> {
    let row = profiles::table.find(user_id).first::<ProfileRow>(conn)?;
    attach_profile_details(conn, vec![row])?
        .pop()
        .ok_or_else(|| AppError::internal("profile row disappeared while loading"))
}

impl ProfileRepository for PgConnection {
    fn user_exists(&mut self, user_id: Uuid) -> AppResult<bool> {
        let found = diesel::select(diesel::dsl::exists(users::table.find(user_id)))
            .get_result::<bool>(self)?;
        Ok(found)
    }

    fn register_user(&mut self, user_id: Uuid) -> AppResult<bool> {
        let inserted = diesel::insert_into(users::table)
            .values(users::id.eq(user_id))
            .on_conflict(users::id)
            .do_nothing()
            .execute(self)?;
        Ok(inserted == 1)
    }

    fn get_or_create_profile(&mut self, user_id: Uuid) -> AppResult<Profile> {
        // The caller is an authenticated identity, so it is a known user.
        self.register_user(user_id)?;
        let created = diesel::insert_into(profiles::table)
            .values(&NewProfile { user_id })
            .on_conflict(profiles::user_id)
            .do_nothing()
            .execute(self)?;
        if created == 1 {
            tracing::debug!(user_id = %user_id, "default profile created");
        }
        load_profile(self, user_id)
    }

    fn update_profile(&mut self, user_id: Uuid, update: &ProfileUpdate, now: DateTime<Utc>) -> AppResult<Profile> {
        self.get_or_create_profile(user_id)?;

        diesel::update(profiles::table.find(user_id))
            .set(&ProfileChangeset::from_update(update, now))
            .execute(self)?;

        if let Some(hobby_ids) = &update.hobby_ids {
            let wanted: Vec<Uuid> = hobby_ids.iter().copied().collect::<HashSet<_>>().into_iter().collect();
            let found: i64 = hobbies::table
                .filter(hobbies::id.eq_any(wanted.clone()))
                .count()
                .get_result(self)?;
            if found as usize != wanted.len() {
                return Err(AppError::new(ErrorCode::HobbyNotFound, "one or more hobbies do not exist"));
            }

            diesel::delete(profile_hobbies::table.filter(profile_hobbies::user_id.eq(user_id)))
                .execute(self)?;
            if !wanted.is_empty() {
                let rows: Vec<_> = wanted
                    .iter()
                    .map(|hobby_id| (profile_hobbies::user_id.eq(user_id), profile_hobbies::hobby_id.eq(*hobby_id)))
                    .collect();
                diesel::insert_into(profile_hobbies::table).values(&rows).execute(self)?;
            }
        }

        load_profile(self, user_id)
    }

    fn update_location(&mut self, user_id: Uuid, latitude: f64, longitude: f64, now: DateTime<Utc>) -> AppResult<Profile> {
        self.get_or_create_profile(user_id)?;
        diesel::update(profiles::table.find(user_id))
            .set((
                profiles::latitude.eq(latitude),
                profiles::longitude.eq(longitude),
                profiles::updated_at.eq(now),
            ))
            .execute(self)?;
        load_profile(self, user_id)
    }

    fn add_photo(&mut self, user_id: Uuid, url: &str, is_primary: bool, now: DateTime<Utc>) -> AppResult<Photo> {
        self.get_or_create_profile(user_id)?;
        if is_primary {
            diesel::update(profile_photos::table.filter(profile_photos::user_id.eq(user_id)))
                .set(profile_photos::is_primary.eq(false))
                .execute(self)?;
        }
        let photo = diesel::insert_into(profile_photos::table)
            .values(&NewPhoto { user_id, url, is_primary, created_at: now })
            .get_result::<Photo>(self)?;
        Ok(photo)
    }

    fn list_active_profiles_with_location(
        &mut self,
        excluding: &HashSet<Uuid>,
        bounds: &GeoBounds,
        ceiling: usize,
    ) -> AppResult<Vec<Profile>> {
        let excluded: Vec<Uuid> = excluding.iter().copied().collect();
        let mut query = profiles::table
            .filter(profiles::status.eq("active"))
            .filter(profiles::latitude.between(bounds.min_latitude, bounds.max_latitude))
            .filter(profiles::longitude.is_not_null())
            .filter(diesel::dsl::not(profiles::user_id.eq_any(excluded)))
            .into_boxed();
        if let Some((min_lng, max_lng)) = bounds.longitude {
            query = query.filter(profiles::longitude.between(min_lng, max_lng));
        }
        let rows = query
            .order(profiles::user_id.asc())
            .limit(i64::try_from(ceiling).unwrap_or(i64::MAX))
            .load::<ProfileRow>(self)?;
        attach_profile_details(self, rows)
    }

    fn list_hobbies(&mut self, category: Option<&str>) -> AppResult<Vec<Hobby>> {
        let mut query = hobbies::table.into_boxed();
        if let Some(category) = category {
            query = query.filter(hobbies::category.eq(category));
        }
        let found = query
            .order((hobbies::category.asc(), hobbies::name.asc()))
            .load::<Hobby>(self)?;
        Ok(found)
    }
}

impl ActionRepository for PgConnection {
    fn find_action(&mut self, actor_id: Uuid, target_id: Uuid) -> AppResult<Option<SwipeAction>> {
        swipe_actions::table
            .filter(swipe_actions::actor_id.eq(actor_id))
            .filter(swipe_actions::target_id.eq(target_id))
            .first::<SwipeActionRow>(self)
            .optional()?
            .map(SwipeAction::try_from)
            .transpose()
    }

    fn insert_action(&mut self, action: &NewSwipeAction) -> AppResult<Option<SwipeAction>> {
        diesel::insert_into(swipe_actions::table)
            .values(&NewSwipeActionRow::from(action))
            .on_conflict((swipe_actions::actor_id, swipe_actions::target_id))
            .do_nothing()
            .get_result::<SwipeActionRow>(self)
            .optional()?
            .map(SwipeAction::try_from)
            .transpose()
    }

    fn count_actions_in_range(&mut self, actor_id: Uuid, from: NaiveDate, to: NaiveDate) -> AppResult<i64> {
        let count = swipe_actions::table
            .filter(swipe_actions::actor_id.eq(actor_id))
            .filter(swipe_actions::action_date.ge(from))
            .filter(swipe_actions::action_date.lt(to))
            .count()
            .get_result::<i64>(self)?;
        Ok(count)
    }

    fn list_target_ids_acted_on_by(&mut self, actor_id: Uuid) -> AppResult<HashSet<Uuid>> {
        let targets = swipe_actions::table
            .filter(swipe_actions::actor_id.eq(actor_id))
            .select(swipe_actions::target_id)
            .load::<Uuid>(self)?;
        Ok(targets.into_iter().collect())
    }
}

impl MatchRepository for PgConnection {
    fn find_match(&mut self, match_id: Uuid) -> AppResult<Option<Match>> {
        let found = matches::table.find(match_id).first::<Match>(self).optional()?;
        Ok(found)
    }

    fn find_match_by_pair(&mut self, a: Uuid, b: Uuid) -> AppResult<Option<Match>> {
        let (user1_id, user2_id) = Match::ordered_pair(a, b);
        let found = matches::table
            .filter(matches::user1_id.eq(user1_id))
            .filter(matches::user2_id.eq(user2_id))
            .first::<Match>(self)
            .optional()?;
        Ok(found)
    }

    fn insert_match(&mut self, user1_id: Uuid, user2_id: Uuid, at: DateTime<Utc>) -> AppResult<Option<Match>> {
        let (user1_id, user2_id) = Match::ordered_pair(user1_id, user2_id);
        let created = diesel::insert_into(matches::table)
            .values(&NewMatch {
                user1_id,
                user2_id,
                created_at: at,
                last_interaction_at: Some(at),
            })
            .on_conflict((matches::user1_id, matches::user2_id))
            .do_nothing()
            .get_result::<Match>(self)
            .optional()?;
        Ok(created)
    }

    fn update_last_interaction(&mut self, match_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        diesel::update(matches::table.find(match_id))
            .set(matches::last_interaction_at.eq(at))
            .execute(self)?;
        Ok(())
    }

    fn list_matches_for_user(&mut self, user_id: Uuid) -> AppResult<Vec<Match>> {
        let found = matches::table
            .filter(matches::user1_id.eq(user_id).or(matches::user2_id.eq(user_id)))
            .load::<Match>(self)?;
        Ok(found)
    }
}

impl MessageRepository for PgConnection {
    fn list_messages(&mut self, match_id: Uuid) -> AppResult<Vec<ConversationMessage>> {
        let found = match_messages::table
            .filter(match_messages::match_id.eq(match_id))
            .order((match_messages::created_at.asc(), match_messages::id.asc()))
            .load::<ConversationMessage>(self)?;
        Ok(found)
    }

    fn insert_message(&mut self, message: NewMessage) -> AppResult<ConversationMessage> {
        let stored = diesel::insert_into(match_messages::table)
            .values(&message)
            .get_result::<ConversationMessage>(self)?;
        Ok(stored)
    }
}
