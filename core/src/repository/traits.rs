use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Task, UserProfile, WeeklyStat};
use crate::week::WeekId;

// Persistence seams for the three logical tables. Every operation is scoped
// to a single user; an adapter never returns another user's rows.

#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn create(&self, task: Task) -> Result<Task, StoreError>;
    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Task, StoreError>;
    async fn list(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError>;
    async fn update(&self, task: &Task) -> Result<(), StoreError>;
    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), StoreError>;
}

#[async_trait]
pub trait WeeklyStatRepository: Send + Sync {
    async fn get(&self, user_id: Uuid, week_id: WeekId) -> Result<Option<WeeklyStat>, StoreError>;
    /// All recorded weeks, most recent first (ordered by parsed week id).
    async fn history(&self, user_id: Uuid) -> Result<Vec<WeeklyStat>, StoreError>;
    async fn upsert(&self, stat: &WeeklyStat) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError>;
    async fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError>;
}
