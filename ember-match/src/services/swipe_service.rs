use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};

use crate::events::EventSink;
use crate::models::{Direction, Match, NewSwipeAction, ProfileSummary};
use crate::services::quota::{self, QuotaStats};
use crate::store::{ActionRepository, Database, MatchRepository, ProfileRepository, Repository};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SwipeOutcome {
    pub action_id: Uuid,
    pub match_created: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_id: Option<Uuid>,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchSummary {
    pub match_id: Uuid,
    pub other_user_id: Uuid,
    pub other_display_name: Option<String>,
    pub other_primary_photo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_interaction_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MatchDetail {
    pub match_id: Uuid,
    pub other_user: ProfileSummary,
    pub created_at: DateTime<Utc>,
    pub last_interaction_at: Option<DateTime<Utc>>,
}

/// Records `actor_id`'s decision about `target_id` and creates the match when
/// the like is reciprocated.
///
/// Every check and write happens in one transaction. The match event is
/// emitted only after that transaction has committed.
pub fn record_action<D: Database>(
    db: &D,
    events: &dyn EventSink,
    actor_id: Uuid,
    target_id: Uuid,
    direction: Direction,
    now: DateTime<Utc>,
) -> AppResult<SwipeOutcome> {
    if actor_id == target_id {
        return Err(AppError::new(ErrorCode::InvalidTarget, "cannot swipe on yourself"));
    }

    let (action_id, created) = db.transaction(|conn| {
        // The actor is an authenticated identity, hence a known user.
        conn.register_user(actor_id)?;
        if !conn.user_exists(target_id)? {
            return Err(AppError::new(ErrorCode::UserNotFound, "target user not found"));
        }

        let stats = quota::stats_for(conn, actor_id, now)?;
        if stats.is_exhausted() {
            metrics::counter!("quota_rejections_total").increment(1);
            return Err(quota_exceeded(&stats));
        }

        if conn.find_action(actor_id, target_id)?.is_some() {
            return Err(duplicate_action());
        }

        let action = conn
            .insert_action(&NewSwipeAction {
                actor_id,
                target_id,
                direction,
                action_date: now.date_naive(),
                created_at: now,
            })?
            .ok_or_else(duplicate_action)?;

        let created = match direction {
            Direction::Like => create_match_if_mutual(conn, actor_id, target_id, now)?,
            Direction::Pass => None,
        };

        Ok((action.id, created))
    })?;

    metrics::counter!("swipe_actions_total", "direction" => direction.to_string()).increment(1);

    let outcome = match created {
        Some(m) => {
            metrics::counter!("matches_created_total").increment(1);
            tracing::info!(match_id = %m.id, user1_id = %m.user1_id, user2_id = %m.user2_id, "match created");
            events.match_created(&m);
            SwipeOutcome {
                action_id,
                match_created: true,
                match_id: Some(m.id),
                message: "It's a match! You both liked each other".to_string(),
            }
        }
        None => SwipeOutcome {
            action_id,
            match_created: false,
            match_id: None,
            message: match direction {
                Direction::Like => "Like recorded".to_string(),
                Direction::Pass => "Pass recorded".to_string(),
            },
        },
    };

    tracing::debug!(actor_id = %actor_id, target_id = %target_id, direction = %direction, "swipe recorded");
    Ok(outcome)
}

fn create_match_if_mutual<R: Repository + ?Sized>(
    conn: &mut R,
    actor_id: Uuid,
    target_id: Uuid,
    now: DateTime<Utc>,
) -> AppResult<Option<Match>> {
    let reciprocated = matches!(
        conn.find_action(target_id, actor_id)?,
        Some(reverse) if reverse.direction == Direction::Like
    );
    if !reciprocated || conn.find_match_by_pair(actor_id, target_id)?.is_some() {
        return Ok(None);
    }
    // A concurrent insert for the same pair loses on the unique key and reads as "already matched".
    conn.insert_match(actor_id, target_id, now)
}

fn quota_exceeded(stats: &QuotaStats) -> AppError {
    AppError::with_details(
        ErrorCode::QuotaExceeded,
        format!(
            "daily limit of {} actions reached, resets at {}",
            stats.daily_limit,
            stats.reset_at.to_rfc3339()
        ),
        serde_json::json!({
            "limit": stats.daily_limit,
            "count_today": stats.count_today,
            "reset_at": stats.reset_at,
        }),
    )
}

fn duplicate_action() -> AppError {
    AppError::new(ErrorCode::DuplicateAction, "you have already acted on this profile")
}

pub fn get_stats<D: Database>(db: &D, user_id: Uuid, now: DateTime<Utc>) -> AppResult<QuotaStats> {
    db.transaction(|conn| quota::stats_for(conn, user_id, now))
}

/// Loads the match and checks that `user_id` takes part in it.
pub fn authorize_participant<R: MatchRepository + ?Sized>(
    repo: &mut R,
    match_id: Uuid,
    user_id: Uuid,
) -> AppResult<Match> {
    let found = repo
        .find_match(match_id)?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;
    if !found.involves(user_id) {
        return Err(AppError::forbidden("you are not part of this match"));
    }
    Ok(found)
}

/// Matches of `user_id`, most recent interaction first. Matches without an
/// interaction sort last, then newer matches before older ones.
pub fn list_matches<D: Database>(db: &D, user_id: Uuid) -> AppResult<Vec<MatchSummary>> {
    let mut summaries = db.transaction(|conn| {
        conn.list_matches_for_user(user_id)?
            .into_iter()
            .map(|m| -> AppResult<MatchSummary> {
                let other_id = m
                    .other_participant(user_id)
                    .ok_or_else(|| AppError::internal("match listed for a non-participant"))?;
                let other = conn.get_or_create_profile(other_id)?;
                Ok(MatchSummary {
                    match_id: m.id,
                    other_user_id: other_id,
                    other_display_name: other.display_name.clone(),
                    other_primary_photo_url: other.primary_photo().map(|p| p.url.clone()),
                    created_at: m.created_at,
                    last_interaction_at: m.last_interaction_at,
                })
            })
            .collect::<AppResult<Vec<_>>>()
    })?;

    // `None < Some(_)`, so comparing b to a puts missing interactions last.
    summaries.sort_by(|a, b| {
        b.last_interaction_at
            .cmp(&a.last_interaction_at)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.match_id.cmp(&b.match_id))
    });
    Ok(summaries)
}

pub fn get_match_details<D: Database>(db: &D, match_id: Uuid, user_id: Uuid) -> AppResult<MatchDetail> {
    db.transaction(|conn| {
        let found = authorize_participant(conn, match_id, user_id)?;
        let other_id = found
            .other_participant(user_id)
            .ok_or_else(|| AppError::internal("participant check passed without a counterpart"))?;
        let other = conn.get_or_create_profile(other_id)?;
        Ok(MatchDetail {
            match_id: found.id,
            other_user: other.summary(),
            created_at: found.created_at,
            last_interaction_at: found.last_interaction_at,
        })
    })
}
