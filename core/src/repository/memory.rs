use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Task, UserProfile, WeeklyStat};
use crate::repository::traits::{ProfileRepository, TaskRepository, WeeklyStatRepository};
use crate::week::WeekId;

/// In-memory adapter for all three tables. Used by tests and as a throwaway
/// backend for local experiments.
#[derive(Default)]
pub struct MemoryStore {
    tasks: RwLock<HashMap<Uuid, Task>>,
    stats: RwLock<HashMap<(Uuid, WeekId), WeeklyStat>>,
    profiles: RwLock<HashMap<Uuid, UserProfile>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> StoreError {
        StoreError::Backend("memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl TaskRepository for MemoryStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_poisoned())?;
        tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Task, StoreError> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_poisoned())?;
        tasks
            .get(&id)
            .filter(|t| t.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let tasks = self.tasks.read().map_err(|_| Self::lock_poisoned())?;
        let mut out: Vec<Task> = tasks.values().filter(|t| t.user_id == user_id).cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_poisoned())?;
        if !tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound(format!("task {}", task.id)));
        }
        tasks.insert(task.id, task.clone());
        Ok(())
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut tasks = self.tasks.write().map_err(|_| Self::lock_poisoned())?;
        match tasks.get(&id) {
            Some(t) if t.user_id == user_id => {
                tasks.remove(&id);
                Ok(())
            }
            _ => Err(StoreError::NotFound(format!("task {}", id))),
        }
    }
}

#[async_trait]
impl WeeklyStatRepository for MemoryStore {
    async fn get(&self, user_id: Uuid, week_id: WeekId) -> Result<Option<WeeklyStat>, StoreError> {
        let stats = self.stats.read().map_err(|_| Self::lock_poisoned())?;
        Ok(stats.get(&(user_id, week_id)).cloned())
    }

    async fn history(&self, user_id: Uuid) -> Result<Vec<WeeklyStat>, StoreError> {
        let stats = self.stats.read().map_err(|_| Self::lock_poisoned())?;
        let mut out: Vec<WeeklyStat> = stats
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.week_id.cmp(&a.week_id));
        Ok(out)
    }

    async fn upsert(&self, stat: &WeeklyStat) -> Result<(), StoreError> {
        let mut stats = self.stats.write().map_err(|_| Self::lock_poisoned())?;
        stats.insert((stat.user_id, stat.week_id), stat.clone());
        Ok(())
    }
}

#[async_trait]
impl ProfileRepository for MemoryStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let profiles = self.profiles.read().map_err(|_| Self::lock_poisoned())?;
        Ok(profiles.get(&user_id).cloned())
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let mut profiles = self.profiles.write().map_err(|_| Self::lock_poisoned())?;
        profiles.insert(profile.id, profile.clone());
        Ok(())
    }
}
