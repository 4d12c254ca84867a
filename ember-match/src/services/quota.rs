use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use ember_shared::errors::AppResult;

use crate::store::ActionRepository;

/// Swipe actions a user may record per UTC calendar day.
pub const DAILY_SWIPE_LIMIT: i64 = 100;

/// The UTC day `now` falls in, as `[today, tomorrow)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub today: NaiveDate,
    pub tomorrow: NaiveDate,
}

impl DayWindow {
    pub fn containing(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(NaiveDate::MAX);
        Self { today, tomorrow }
    }

    /// Midnight UTC at the start of tomorrow.
    pub fn reset_at(&self) -> DateTime<Utc> {
        self.tomorrow.and_time(NaiveTime::MIN).and_utc()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QuotaStats {
    pub count_today: i64,
    pub remaining: i64,
    pub daily_limit: i64,
    pub reset_at: DateTime<Utc>,
}

impl QuotaStats {
    pub fn is_exhausted(&self) -> bool {
        self.count_today >= self.daily_limit
    }
}

/// Counts today's actions for `user_id`. Pure read.
pub fn stats_for<R>(repo: &mut R, user_id: Uuid, now: DateTime<Utc>) -> AppResult<QuotaStats>
where
    R: ActionRepository + ?Sized,
{
    let window = DayWindow::containing(now);
    let count_today = repo.count_actions_in_range(user_id, window.today, window.tomorrow)?;
    Ok(QuotaStats {
        count_today,
        remaining: (DAILY_SWIPE_LIMIT - count_today).max(0),
        daily_limit: DAILY_SWIPE_LIMIT,
        reset_at: window.reset_at(),
    })
}
