use uuid::Uuid;

use crate::model::{Task, UserProfile, WeeklyStat};
use crate::week::WeekId;

/// Everything the presentation layer needs for one user, produced by a
/// refresh. Explicit state passed through the call chain; there is no
/// ambient global cache. When in doubt, refresh again.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Uuid,
    pub profile: UserProfile,
    pub tasks: Vec<Task>,
    pub current_stat: WeeklyStat,
    /// Recorded weeks before the current one, most recent first.
    pub history: Vec<WeeklyStat>,
    pub streak: u32,
}

impl Session {
    pub fn week_id(&self) -> WeekId {
        self.current_stat.week_id
    }
}
