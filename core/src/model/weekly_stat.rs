use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::week::WeekId;

/// Per-week aggregate, unique per (user, week).
///
/// `completed_hours` is a cached derivation of the verified tasks whose
/// completion instant falls inside the week; the task table is the source of
/// truth and the reconciler overwrites this field when they drift apart.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WeeklyStat {
    pub user_id: Uuid,
    pub week_id: WeekId,
    pub goal_hours: f64,
    pub completed_hours: f64,
    pub screen_time_hours: f64,
    pub rating: f64,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

impl WeeklyStat {
    pub fn new(user_id: Uuid, week_id: WeekId, goal_hours: f64) -> Self {
        Self {
            user_id,
            week_id,
            goal_hours,
            completed_hours: 0.0,
            screen_time_hours: 0.0,
            rating: 0.0,
            week_start: week_id.start_date(),
            week_end: week_id.end_date(),
        }
    }

    pub fn meets_goal(&self) -> bool {
        self.completed_hours >= self.goal_hours
    }
}
