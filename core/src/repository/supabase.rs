use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::StoreError;
use crate::model::{Task, UserProfile, WeeklyStat};
use crate::repository::traits::{ProfileRepository, TaskRepository, WeeklyStatRepository};
use crate::week::WeekId;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// REST adapter for the hosted Postgres tables (`profiles`, `tasks`,
/// `weekly_stats`). Rows are the serde form of the model structs; week ids
/// travel as their `YYYY-Www` string.
pub struct SupabaseStore {
    http: reqwest::Client,
    base_url: String,
}

impl SupabaseStore {
    pub fn new(settings: &Settings) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let key = HeaderValue::from_str(&settings.supabase_key)
            .map_err(|_| StoreError::Backend("invalid supabase key".to_string()))?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", settings.supabase_key))
            .map_err(|_| StoreError::Backend("invalid supabase key".to_string()))?;
        headers.insert("apikey", key);
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: settings.supabase_url.trim_end_matches('/').to_string(),
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, StoreError> {
        let resp = self
            .http
            .get(self.table_url(table))
            .query(filters)
            .query(&[("select", "*")])
            .send()
            .await?;
        let resp = resp.error_for_status()?;
        let rows = resp.json().await?;
        Ok(rows)
    }

    async fn insert<T: Serialize>(&self, table: &str, row: &T) -> Result<(), StoreError> {
        self.http
            .post(self.table_url(table))
            .json(row)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Insert-or-update keyed on the named unique columns.
    async fn upsert_row<T: Serialize>(
        &self,
        table: &str,
        on_conflict: &str,
        row: &T,
    ) -> Result<(), StoreError> {
        self.http
            .post(self.table_url(table))
            .query(&[("on_conflict", on_conflict)])
            .header("Prefer", "resolution=merge-duplicates")
            .json(row)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn patch<T: Serialize>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        row: &T,
    ) -> Result<(), StoreError> {
        self.http
            .patch(self.table_url(table))
            .query(filters)
            .json(row)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    async fn remove(&self, table: &str, filters: &[(&str, String)]) -> Result<(), StoreError> {
        self.http
            .delete(self.table_url(table))
            .query(filters)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }

    fn eq(value: impl ToString) -> String {
        format!("eq.{}", value.to_string())
    }
}

#[async_trait]
impl TaskRepository for SupabaseStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        self.insert("tasks", &task).await?;
        Ok(task)
    }

    async fn get(&self, user_id: Uuid, id: Uuid) -> Result<Task, StoreError> {
        let rows: Vec<Task> = self
            .select(
                "tasks",
                &[("id", Self::eq(id)), ("user_id", Self::eq(user_id))],
            )
            .await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(format!("task {}", id)))
    }

    async fn list(&self, user_id: Uuid) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self
            .select("tasks", &[("user_id", Self::eq(user_id))])
            .await?;
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    async fn update(&self, task: &Task) -> Result<(), StoreError> {
        self.patch("tasks", &[("id", Self::eq(task.id))], task).await
    }

    async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<(), StoreError> {
        self.remove(
            "tasks",
            &[("id", Self::eq(id)), ("user_id", Self::eq(user_id))],
        )
        .await
    }
}

#[async_trait]
impl WeeklyStatRepository for SupabaseStore {
    async fn get(&self, user_id: Uuid, week_id: WeekId) -> Result<Option<WeeklyStat>, StoreError> {
        let rows: Vec<WeeklyStat> = self
            .select(
                "weekly_stats",
                &[
                    ("user_id", Self::eq(user_id)),
                    ("week_id", Self::eq(week_id)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn history(&self, user_id: Uuid) -> Result<Vec<WeeklyStat>, StoreError> {
        let mut stats: Vec<WeeklyStat> = self
            .select("weekly_stats", &[("user_id", Self::eq(user_id))])
            .await?;
        // Ordering server-side would compare the id strings; sort on the
        // parsed (year, week) instead.
        stats.sort_by(|a, b| b.week_id.cmp(&a.week_id));
        Ok(stats)
    }

    async fn upsert(&self, stat: &WeeklyStat) -> Result<(), StoreError> {
        self.upsert_row("weekly_stats", "user_id,week_id", stat).await
    }
}

#[async_trait]
impl ProfileRepository for SupabaseStore {
    async fn get(&self, user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
        let rows: Vec<UserProfile> = self
            .select("profiles", &[("id", Self::eq(user_id))])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn upsert(&self, profile: &UserProfile) -> Result<(), StoreError> {
        self.upsert_row("profiles", "id", profile).await
    }
}
