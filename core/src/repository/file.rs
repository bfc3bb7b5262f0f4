use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Task, UserProfile, WeeklyStat};
use crate::repository::traits::{ProfileRepository, TaskRepository, WeeklyStatRepository};
use crate::week::WeekId;

const TASKS_FILE_NAME: &str = "tasks.json";
const STATS_FILE_NAME: &str = "weekly_stats.json";
const PROFILES_FILE_NAME: &str = "profiles.json";

/// Local JSON adapter so the CLI works without any remote backend.
/// Same relational shape as the hosted tables, one file per table.
#[derive(Clone)]
pub struct FileStore {
    base_dir: PathBuf,
}

impl FileStore {
    pub fn new(base_dir: Option<PathBuf>) -> Result<Self, StoreError> {
        let path = match base_dir {
            Some(dir) => dir,
            None => {
                let home_dir = dirs::home_dir()
                    .ok_or_else(|| StoreError::Backend("could not determine home directory".to_string()))?;
                home_dir.join(".goalguardian")
            }
        };
        fs::create_dir_all(&path)?;

        let store = FileStore { base_dir: path };
        store.ensure_table::<Task>(TASKS_FILE_NAME)?;
        store.ensure_table::<WeeklyStat>(STATS_FILE_NAME)?;
        store.ensure_table::<UserProfile>(PROFILES_FILE_NAME)?;
        Ok(store)
    }

    fn table_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    fn ensure_table<T: Serialize>(&self, name: &str) -> Result<(), StoreError> {
        let path = self.table_path(name);
        if !path.exists() {
            let mut writer = BufWriter::new(File::create(&path)?);
            serde_json::to_writer_pretty(&mut writer, &Vec::<T>::new())?;
            writer.flush()?;
        }
        Ok(())
    }

    fn read_table<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, StoreError> {
        let file = File::open(self.table_path(name))?;
        let reader = BufReader::new(file);
        let rows = serde_json::from_reader(reader)?;
        Ok(rows)
    }

    fn write_table<T: Serialize>(&self, name: &str, rows: &[T]) -> Result<(), StoreError> {
        let file = File::create(self.table_path(name))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, rows)?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl TaskRepository for FileStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        let mut tasks: Vec<Task> = self.read_table(TASKS_FILE_NAME)?;
        tasks.push(task.clone());
        self.write_table(TASKS_FILE_NAME, &tasks)?;
        Ok(task)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Task, StoreError> {
        let tasks: Vec<Task> = self.read_table(TASKS_FILE_NAME)?;
        tasks
            .into_iter()
            .find(|t| t.id == id && t.user_id == user_id)
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.read_table(TASKS_FILE_NAME)?;
        tasks.retain(|t| t.user_id == user_id);
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        let mut tasks: Vec<Task> = self.read_table(TASKS_FILE_NAME)?;
        if let Some(pos) = tasks.iter().position(|t| t.id == task.id) {
            tasks[pos] = task.clone();
            self.write_table(TASKS_FILE_NAME, &tasks)
        } else {
            Err(StoreError::NotFound(format!("task {}", task.id)))
        }
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        let mut tasks: Vec<Task> = self.read_table(TASKS_FILE_NAME)?;
        let initial_len = tasks.len();
        tasks.retain(|t| !(t.id == id && t.user_id == user_id));

        if tasks.len() == initial_len {
            return Err(StoreError::NotFound(format!("task {}", id)));
        }

        self.write_table(TASKS_FILE_NAME, &tasks)
    }
}

#[async_trait]
impl WeeklyStatRepository for FileStore {
    async fn get(&self, user_id: Uuid, week_id: WeekId) -> Result<Option<WeeklyStat>, StoreError> {
        let stats: Vec<WeeklyStat> = self.read_table(STATS_FILE_NAME)?;
        Ok(stats
            .into_iter()
            .find(|s| s.user_id == user_id && s.week_id == week_id))
    }

    async fn history(&self, user_id: Uuid) -> Result<Vec<WeeklyStat>, StoreError> {
        let mut stats: Vec<WeeklyStat> = self.read_table(STATS_FILE_NAME)?;
        stats.retain(|s| s.user_id == user_id);
        stats.sort_by(|a, b| b.week_id.cmp(&a.week_id));
        Ok(stats)
    }

    async fn upsert(&self, stat: &WeeklyStat) -> Result<(), StoreError> {
        let mut stats: Vec<WeeklyStat> = self.read_table(STATS_FILE_NAME)?;
        if let Some(pos) = stats
            .iter()
            .position(|s| s.user_id == stat.user_id && s.week_id == stat.week_id)
        {
            stats[pos] = stat.clone();
        } else {
            stats.push(stat.clone());
        }
        self.write_table(STATS_FILE_NAME, &stats)
    }
}

#[async_trait]
impl ProfileRepository for FileStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let profiles: Vec<UserProfile> = self.read_table(PROFILES_FILE_NAME)?;
        Ok(profiles.into_iter().find(|p| p.id == user_id))
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let mut profiles: Vec<UserProfile> = self.read_table(PROFILES_FILE_NAME)?;
        if let Some(pos) = profiles.iter().position(|p| p.id == profile.id) {
            profiles[pos] = profile.clone();
        } else {
            profiles.push(profile.clone());
        }
        self.write_table(PROFILES_FILE_NAME, &profiles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;

    fn temp_store(tag: &str) -> FileStore {
        let dir = std::env::temp_dir().join(format!("goalguardian-test-{}-{}", tag, Uuid::new_v4()));
        FileStore::new(Some(dir)).unwrap()
    }

    #[tokio::test]
    async fn test_task_round_trip() {
        let store = temp_store("tasks");
        let user = Uuid::new_v4();
        let task = Task::new(user, "Essay draft".to_string(), Category::Study, 3.0);
        let id = task.id;

        store.create(task).await.unwrap();
        let mut fetched = TaskRepository::get(&store, user, id).await.unwrap();
        assert_eq!(fetched.title, "Essay draft");

        fetched.begin_verification();
        store.update(&fetched).await.unwrap();
        assert_eq!(store.list(user).await.unwrap().len(), 1);

        store.delete(user, id).await.unwrap();
        assert!(store.list(user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stat_upsert_is_unique_per_week() {
        let store = temp_store("stats");
        let user = Uuid::new_v4();
        let week: WeekId = "2025-W10".parse().unwrap();

        let mut stat = WeeklyStat::new(user, week, 40.0);
        WeeklyStatRepository::upsert(&store, &stat).await.unwrap();
        stat.completed_hours = 12.5;
        WeeklyStatRepository::upsert(&store, &stat).await.unwrap();

        let history = WeeklyStatRepository::history(&store, user).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].completed_hours, 12.5);
    }

    #[tokio::test]
    async fn test_history_orders_descending_across_years() {
        let store = temp_store("history");
        let user = Uuid::new_v4();
        for id in ["2024-W52", "2025-W01", "2024-W51"] {
            let stat = WeeklyStat::new(user, id.parse().unwrap(), 40.0);
            WeeklyStatRepository::upsert(&store, &stat).await.unwrap();
        }

        let history = WeeklyStatRepository::history(&store, user).await.unwrap();
        let ids: Vec<String> = history.iter().map(|s| s.week_id.to_string()).collect();
        assert_eq!(ids, vec!["2025-W01", "2024-W52", "2024-W51"]);
    }
}
