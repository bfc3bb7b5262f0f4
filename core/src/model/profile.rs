use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_GOAL_HOURS: f64 = 40.0;

/// Account-level record. `current_streak` is only a cache of the derived
/// streak; the streak walker recomputes it on every refresh.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub avatar_url: Option<String>,
    pub weekly_goal_hours: f64,
    pub current_streak: u32,
}

impl UserProfile {
    pub fn new(id: Uuid, name: String, email: String) -> Self {
        Self {
            id,
            name,
            email,
            avatar_url: None,
            weekly_goal_hours: DEFAULT_GOAL_HOURS,
            current_streak: 0,
        }
    }
}
