//! Nearby-profile feed.
//!
//! Candidates are scanned in memory: every active profile with coordinates
//! that the requester has not acted on yet is measured, filtered and sorted,
//! then the sorted list is sliced with offset/limit. The store only returns
//! profiles inside the lat/lng box around the search radius, and the scan is
//! bounded by the configured candidate ceiling.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::types::pagination::OffsetParams;

use crate::models::{Gender, Hobby, Profile};
use crate::services::distance::{distance_miles, round_tenth, GeoBounds};
use crate::store::{ActionRepository, Database, ProfileRepository};

pub const DEFAULT_LIMIT: i64 = 20;

/// Candidates this close to the requester count as being in the same city.
pub const SAME_CITY_MILES: f64 = 10.0;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[validate(schema(function = "validate_age_bounds"))]
pub struct DiscoveryQuery {
    #[validate(range(min = 1, max = 50, message = "limit must be between 1 and 50"))]
    pub limit: Option<i64>,
    #[validate(range(min = 0, message = "offset cannot be negative"))]
    pub offset: Option<i64>,
    #[validate(range(min = 1, max = 500, message = "radius must be between 1 and 500 miles"))]
    pub radius: Option<i32>,
    #[serde(alias = "genderPreference")]
    pub gender_preference: Option<Gender>,
    #[serde(alias = "minAge")]
    #[validate(range(min = 18, max = 120, message = "min_age must be between 18 and 120"))]
    pub min_age: Option<i32>,
    #[serde(alias = "maxAge")]
    #[validate(range(min = 18, max = 120, message = "max_age must be between 18 and 120"))]
    pub max_age: Option<i32>,
    #[serde(alias = "sameCity")]
    pub same_city: Option<bool>,
}

fn validate_age_bounds(query: &DiscoveryQuery) -> Result<(), ValidationError> {
    match (query.min_age, query.max_age) {
        (Some(min), Some(max)) if min > max => {
            let mut err = ValidationError::new("age_bounds");
            err.message = Some("min_age cannot exceed max_age".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// Conjunctive candidate predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFilter {
    pub radius_miles: f64,
    pub gender: Option<Gender>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub same_city: bool,
}

impl CandidateFilter {
    pub fn from_query(query: &DiscoveryQuery, stored_radius: i32) -> Self {
        Self {
            radius_miles: f64::from(query.radius.unwrap_or(stored_radius)),
            gender: query.gender_preference,
            min_age: query.min_age,
            max_age: query.max_age,
            same_city: query.same_city.unwrap_or(false),
        }
    }

    /// A distance that is not a finite number never passes.
    pub fn admits(&self, candidate: &Profile, distance: f64) -> bool {
        if !distance.is_finite() || distance > self.radius_miles {
            return false;
        }
        if self.same_city && distance > SAME_CITY_MILES {
            return false;
        }
        if let Some(gender) = self.gender {
            if candidate.gender != Some(gender) {
                return false;
            }
        }
        if self.min_age.is_some() || self.max_age.is_some() {
            let Some(age) = candidate.age else {
                return false;
            };
            if self.min_age.is_some_and(|min| age < min) || self.max_age.is_some_and(|max| age > max) {
                return false;
            }
        }
        true
    }
}

#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub profile: Profile,
    /// Unrounded distance in miles.
    pub distance: f64,
    pub shared_hobbies: Vec<Hobby>,
}

/// Measures, filters and orders candidates: nearest first, then more shared
/// hobbies, then user id so equal entries keep a stable position across pages.
pub fn rank_candidates(
    origin: (f64, f64),
    requester_hobbies: &HashSet<Uuid>,
    candidates: Vec<Profile>,
    filter: &CandidateFilter,
) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> = candidates
        .into_iter()
        .filter_map(|profile| {
            let (lat, lng) = profile.location()?;
            let distance = distance_miles(origin.0, origin.1, lat, lng);
            if !filter.admits(&profile, distance) {
                return None;
            }
            let shared_hobbies = profile
                .hobbies
                .iter()
                .filter(|h| requester_hobbies.contains(&h.id))
                .cloned()
                .collect();
            Some(RankedCandidate {
                profile,
                distance,
                shared_hobbies,
            })
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.distance
            .partial_cmp(&b.distance)
            .unwrap_or(Ordering::Equal)
            .then_with(|| b.shared_hobbies.len().cmp(&a.shared_hobbies.len()))
            .then_with(|| a.profile.user_id.cmp(&b.profile.user_id))
    });
    ranked
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub pronouns: Option<String>,
    pub bio: Option<String>,
    pub primary_photo_url: Option<String>,
    /// Miles, rounded to one decimal.
    pub distance: f64,
    pub shared_hobbies: Vec<Hobby>,
}

impl From<RankedCandidate> for NearbyProfile {
    fn from(ranked: RankedCandidate) -> Self {
        let primary_photo_url = ranked.profile.primary_photo().map(|p| p.url.clone());
        let profile = ranked.profile;
        Self {
            user_id: profile.user_id,
            display_name: profile.display_name,
            age: profile.age,
            gender: profile.gender,
            pronouns: profile.pronouns,
            bio: profile.bio,
            primary_photo_url,
            distance: round_tenth(ranked.distance),
            shared_hobbies: ranked.shared_hobbies,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NearbyResult {
    pub profiles: Vec<NearbyProfile>,
    pub has_more: bool,
    pub total: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Preferences {
    pub radius_preference: i32,
    pub has_location: bool,
}

pub fn get_nearby_profiles<D: Database>(
    db: &D,
    requester_id: Uuid,
    query: &DiscoveryQuery,
    candidate_ceiling: usize,
) -> AppResult<NearbyResult> {
    query
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let (requester, origin, filter, candidates) = db.transaction(|conn| {
        let requester = conn.get_or_create_profile(requester_id)?;
        let Some(origin) = requester.location() else {
            return Err(AppError::new(
                ErrorCode::LocationRequired,
                "set your location before browsing nearby profiles",
            ));
        };
        let filter = CandidateFilter::from_query(query, requester.radius_preference);
        let bounds = GeoBounds::around(origin.0, origin.1, filter.radius_miles);

        let mut excluded = conn.list_target_ids_acted_on_by(requester_id)?;
        excluded.insert(requester_id);
        let candidates = conn.list_active_profiles_with_location(&excluded, &bounds, candidate_ceiling)?;
        Ok((requester, origin, filter, candidates))
    })?;

    let requester_hobbies: HashSet<Uuid> = requester.hobbies.iter().map(|h| h.id).collect();

    let scanned = candidates.len();
    if scanned >= candidate_ceiling {
        tracing::warn!(
            requester_id = %requester_id,
            ceiling = candidate_ceiling,
            radius = filter.radius_miles,
            "discovery scan hit the candidate ceiling, results may be incomplete"
        );
    }
    let ranked = rank_candidates(origin, &requester_hobbies, candidates, &filter);

    // Validation guarantees both are non-negative.
    let offset = query.offset.unwrap_or(0) as usize;
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT) as usize;
    let page = OffsetParams::new(offset, limit).apply(ranked);

    tracing::debug!(
        requester_id = %requester_id,
        scanned,
        matched = page.total,
        radius = filter.radius_miles,
        "discovery feed computed"
    );

    Ok(NearbyResult {
        profiles: page.items.into_iter().map(NearbyProfile::from).collect(),
        has_more: page.has_more,
        total: page.total,
    })
}

pub fn get_preferences<D: Database>(db: &D, user_id: Uuid) -> AppResult<Preferences> {
    let profile = db.transaction(|conn| conn.get_or_create_profile(user_id))?;
    Ok(Preferences {
        radius_preference: profile.radius_preference,
        has_location: profile.location().is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    use crate::events::testing::RecordingSink;
    use crate::models::{Direction, ProfileStatus, ProfileUpdate};
    use crate::services::swipe_service::{list_matches, record_action};
    use crate::store::memory::MemoryDatabase;

    const NYC: (f64, f64) = (40.7128, -74.0060);
    const MIDTOWN: (f64, f64) = (40.7589, -73.9851);
    /// About 30 miles north of NYC.
    const THIRTY_NORTH: (f64, f64) = (41.1476, -74.0060);
    /// About 20 miles north of NYC.
    const TWENTY_NORTH: (f64, f64) = (41.0028, -74.0060);

    fn person(db: &MemoryDatabase, at: Option<(f64, f64)>, update: ProfileUpdate) -> Uuid {
        let id = Uuid::new_v4();
        db.transaction(|conn| {
            conn.update_profile(id, &update, Utc::now())?;
            if let Some((lat, lng)) = at {
                conn.update_location(id, lat, lng, Utc::now())?;
            }
            Ok(())
        })
        .unwrap();
        id
    }

    fn woman(age: i32) -> ProfileUpdate {
        ProfileUpdate {
            gender: Some(Gender::Female),
            age: Some(age),
            ..Default::default()
        }
    }

    fn feed(db: &MemoryDatabase, requester: Uuid, query: DiscoveryQuery) -> NearbyResult {
        get_nearby_profiles(db, requester, &query, 5000).unwrap()
    }

    fn ids(result: &NearbyResult) -> Vec<Uuid> {
        result.profiles.iter().map(|p| p.user_id).collect()
    }

    #[test]
    fn manhattan_scenario() {
        let db = MemoryDatabase::new();
        let sink = RecordingSink::default();
        let a = person(&db, Some(NYC), ProfileUpdate { radius_preference: Some(25), ..Default::default() });
        let b = person(&db, Some(MIDTOWN), woman(28));

        let result = feed(&db, a, DiscoveryQuery::default());
        assert_eq!(ids(&result), vec![b]);
        assert_eq!(result.profiles[0].distance, 3.4);
        assert!(!result.has_more);
        assert_eq!(result.total, 1);

        record_action(&db, &sink, a, b, Direction::Like, Utc::now()).unwrap();
        assert!(feed(&db, a, DiscoveryQuery::default()).profiles.is_empty());

        let outcome = record_action(&db, &sink, b, a, Direction::Like, Utc::now()).unwrap();
        assert!(outcome.match_created);
        let for_a = list_matches(&db, a).unwrap();
        let for_b = list_matches(&db, b).unwrap();
        assert_eq!(for_a.len(), 1);
        assert_eq!(for_a[0].other_user_id, b);
        assert_eq!(for_b.len(), 1);
        assert_eq!(for_b[0].other_user_id, a);
    }

    #[test]
    fn requester_without_location_is_rejected() {
        let db = MemoryDatabase::new();
        let a = person(&db, None, ProfileUpdate::default());
        let err = get_nearby_profiles(&db, a, &DiscoveryQuery::default(), 5000).unwrap_err();
        assert_eq!(err.code(), ErrorCode::LocationRequired);
    }

    #[test]
    fn excludes_self_acted_on_and_invisible_profiles() {
        let db = MemoryDatabase::new();
        let sink = RecordingSink::default();
        let me = person(&db, Some(NYC), ProfileUpdate::default());
        let passed = person(&db, Some(MIDTOWN), ProfileUpdate::default());
        let visible = person(&db, Some(MIDTOWN), ProfileUpdate::default());
        person(&db, Some(MIDTOWN), ProfileUpdate { status: Some(ProfileStatus::Hidden), ..Default::default() });
        person(&db, Some(MIDTOWN), ProfileUpdate { status: Some(ProfileStatus::Inactive), ..Default::default() });
        person(&db, None, ProfileUpdate::default());

        record_action(&db, &sink, me, passed, Direction::Pass, Utc::now()).unwrap();

        let result = feed(&db, me, DiscoveryQuery::default());
        assert_eq!(ids(&result), vec![visible]);
    }

    #[test]
    fn radius_defaults_to_stored_preference() {
        let db = MemoryDatabase::new();
        let me = person(&db, Some(NYC), ProfileUpdate::default());
        let twenty = person(&db, Some(TWENTY_NORTH), ProfileUpdate::default());
        let thirty = person(&db, Some(THIRTY_NORTH), ProfileUpdate::default());

        assert_eq!(ids(&feed(&db, me, DiscoveryQuery::default())), vec![twenty]);

        let wide = DiscoveryQuery { radius: Some(50), ..Default::default() };
        assert_eq!(ids(&feed(&db, me, wide)), vec![twenty, thirty]);

        db.transaction(|conn| {
            conn.update_profile(me, &ProfileUpdate { radius_preference: Some(10), ..Default::default() }, Utc::now())
        })
        .unwrap();
        assert!(feed(&db, me, DiscoveryQuery::default()).profiles.is_empty());
    }

    #[test]
    fn filters_are_conjunctive() {
        let db = MemoryDatabase::new();
        let me = person(&db, Some(NYC), ProfileUpdate::default());
        let near_match = person(&db, Some(MIDTOWN), woman(30));
        person(&db, Some(THIRTY_NORTH), woman(30));
        let near_man = person(&db, Some(MIDTOWN), ProfileUpdate { gender: Some(Gender::Male), age: Some(30), ..Default::default() });
        person(&db, Some(MIDTOWN), woman(50));
        person(&db, Some(MIDTOWN), ProfileUpdate { gender: Some(Gender::Female), ..Default::default() });
        let twenty_woman = person(&db, Some(TWENTY_NORTH), woman(30));

        let query = DiscoveryQuery {
            radius: Some(25),
            gender_preference: Some(Gender::Female),
            min_age: Some(25),
            max_age: Some(35),
            ..Default::default()
        };
        assert_eq!(ids(&feed(&db, me, query.clone())), vec![near_match, twenty_woman]);

        let same_city = DiscoveryQuery { same_city: Some(true), ..query };
        assert_eq!(ids(&feed(&db, me, same_city)), vec![near_match]);

        let men = DiscoveryQuery { gender_preference: Some(Gender::Male), ..Default::default() };
        assert_eq!(ids(&feed(&db, me, men)), vec![near_man]);
    }

    #[test]
    fn ties_on_distance_prefer_shared_hobbies() {
        let db = MemoryDatabase::new();
        let (hiking, chess, jazz) = db
            .transaction(|s| {
                Ok((
                    s.add_hobby("Hiking", "outdoors"),
                    s.add_hobby("Chess", "games"),
                    s.add_hobby("Jazz", "music"),
                ))
            })
            .unwrap();
        let with_hobbies = |ids: Vec<Uuid>| ProfileUpdate { hobby_ids: Some(ids), ..Default::default() };

        let me = person(&db, Some(NYC), with_hobbies(vec![hiking.id, chess.id, jazz.id]));
        let one = person(&db, Some(MIDTOWN), with_hobbies(vec![chess.id]));
        let none = person(&db, Some(MIDTOWN), ProfileUpdate::default());
        let two = person(&db, Some(MIDTOWN), with_hobbies(vec![hiking.id, jazz.id]));
        let nearest = person(&db, Some(NYC), ProfileUpdate::default());

        let result = feed(&db, me, DiscoveryQuery::default());
        assert_eq!(ids(&result), vec![nearest, two, one, none]);
        assert_eq!(result.profiles[0].distance, 0.0);
        let shared: Vec<&str> = result.profiles[1].shared_hobbies.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(shared, vec!["Hiking", "Jazz"]);
    }

    #[test]
    fn pages_cover_the_full_list_once() {
        let db = MemoryDatabase::new();
        let me = person(&db, Some(NYC), ProfileUpdate::default());
        for i in 0..7 {
            let lat = NYC.0 + 0.01 * f64::from(i % 3);
            person(&db, Some((lat, NYC.1)), ProfileUpdate::default());
        }

        let full = feed(&db, me, DiscoveryQuery { limit: Some(50), ..Default::default() });
        assert_eq!(full.total, 7);

        let mut collected = Vec::new();
        let mut offset = 0;
        loop {
            let page = feed(&db, me, DiscoveryQuery { limit: Some(3), offset: Some(offset), ..Default::default() });
            assert_eq!(page.total, 7);
            collected.extend(ids(&page));
            if !page.has_more {
                break;
            }
            offset += 3;
        }
        assert_eq!(collected, ids(&full));
    }

    #[test]
    fn candidate_ceiling_bounds_the_scan() {
        let db = MemoryDatabase::new();
        let me = person(&db, Some(NYC), ProfileUpdate::default());
        for _ in 0..5 {
            person(&db, Some(MIDTOWN), ProfileUpdate::default());
        }
        let result = get_nearby_profiles(&db, me, &DiscoveryQuery::default(), 3).unwrap();
        assert_eq!(result.total, 3);
    }

    #[test]
    fn antipodal_profile_never_enters_the_feed() {
        let db = MemoryDatabase::new();
        let me = person(&db, Some((-87.5, -178.75)), ProfileUpdate::default());
        person(&db, Some((87.5, 1.25)), ProfileUpdate::default());

        let result = feed(&db, me, DiscoveryQuery::default());
        assert_eq!(result.total, 0);
        assert!(result.profiles.is_empty());

        let filter = CandidateFilter::from_query(&DiscoveryQuery::default(), 25);
        let anyone = Profile::with_defaults(Uuid::new_v4(), Utc::now());
        assert!(!filter.admits(&anyone, f64::NAN));
        assert!(!filter.admits(&anyone, f64::INFINITY));
        assert!(filter.admits(&anyone, 25.0));
    }

    #[test]
    fn far_candidates_do_not_use_up_the_ceiling() {
        let db = MemoryDatabase::new();
        let me = person(&db, Some(NYC), ProfileUpdate::default());
        for _ in 0..5 {
            person(&db, Some((34.0522, -118.2437)), ProfileUpdate::default());
        }
        let near = person(&db, Some(MIDTOWN), ProfileUpdate::default());

        let result = get_nearby_profiles(&db, me, &DiscoveryQuery::default(), 3).unwrap();
        assert_eq!(ids(&result), vec![near]);
        assert_eq!(result.total, 1);
    }

    #[test]
    fn query_bounds_are_validated() {
        let db = MemoryDatabase::new();
        let me = person(&db, Some(NYC), ProfileUpdate::default());
        let bad = [
            DiscoveryQuery { limit: Some(0), ..Default::default() },
            DiscoveryQuery { limit: Some(51), ..Default::default() },
            DiscoveryQuery { offset: Some(-1), ..Default::default() },
            DiscoveryQuery { radius: Some(501), ..Default::default() },
            DiscoveryQuery { min_age: Some(17), ..Default::default() },
            DiscoveryQuery { min_age: Some(40), max_age: Some(30), ..Default::default() },
        ];
        for query in bad {
            let err = get_nearby_profiles(&db, me, &query, 5000).unwrap_err();
            assert_eq!(err.code(), ErrorCode::ValidationError, "{query:?}");
        }
    }

    #[test]
    fn preferences_report_radius_and_location() {
        let db = MemoryDatabase::new();
        let fresh = Uuid::new_v4();
        assert_eq!(
            get_preferences(&db, fresh).unwrap(),
            Preferences { radius_preference: 25, has_location: false }
        );
        let located = person(&db, Some(NYC), ProfileUpdate { radius_preference: Some(40), ..Default::default() });
        assert_eq!(
            get_preferences(&db, located).unwrap(),
            Preferences { radius_preference: 40, has_location: true }
        );
    }
}
