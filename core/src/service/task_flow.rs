use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{Local, Utc};
use uuid::Uuid;

use crate::collaborator::{ProofStorage, ProofVerifier, Verdict};
use crate::model::{Category, Task, UserProfile, WeeklyStat};
use crate::outbox::{Mutation, WriteBehind};
use crate::repository::{ProfileRepository, TaskRepository, WeeklyStatRepository};
use crate::service::accounting::verified_hours_in_window;
use crate::service::rating::RatingPolicy;
use crate::week::{week_window, WeekId};

/// Result of a proof submission. `proof_saved` is false when verification
/// succeeded but the storage collaborator failed; the task stays verified
/// and the user is warned that the proof was not durably saved.
#[derive(Debug, Clone)]
pub struct ProofOutcome {
    pub task: Task,
    pub verdict: Verdict,
    pub proof_saved: bool,
}

/// User-initiated task operations. Unlike the background refresh path these
/// surface persistence errors, since the user is waiting on the outcome.
pub struct TaskFlow {
    tasks: Arc<dyn TaskRepository>,
    stats: Arc<dyn WeeklyStatRepository>,
    profiles: Arc<dyn ProfileRepository>,
    verifier: Arc<dyn ProofVerifier>,
    storage: Arc<dyn ProofStorage>,
    rating: Arc<dyn RatingPolicy>,
    outbox: Arc<WriteBehind>,
}

impl TaskFlow {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tasks: Arc<dyn TaskRepository>,
        stats: Arc<dyn WeeklyStatRepository>,
        profiles: Arc<dyn ProfileRepository>,
        verifier: Arc<dyn ProofVerifier>,
        storage: Arc<dyn ProofStorage>,
        rating: Arc<dyn RatingPolicy>,
        outbox: Arc<WriteBehind>,
    ) -> Self {
        Self {
            tasks,
            stats,
            profiles,
            verifier,
            storage,
            rating,
            outbox,
        }
    }

    pub async fn create_task(
        &self,
        user_id: Uuid,
        title: String,
        description: Option<String>,
        category: Category,
        planned_hours: f64,
    ) -> Result<Task> {
        if title.trim().is_empty() {
            bail!("Task title is required");
        }
        if planned_hours <= 0.0 {
            bail!("Planned hours must be positive");
        }
        let mut task = Task::new(user_id, title, category, planned_hours);
        task.description = description;
        let created = self
            .tasks
            .create(task)
            .await
            .context("Failed to save task")?;
        Ok(created)
    }

    /// Proof submission drives the whole verification lifecycle:
    /// Verifying, then Verified (with the proof stored and the weekly total
    /// bumped) or Rejected with the verifier's reason. A verifier outage is
    /// a rejection, not an error.
    pub async fn submit_proof(
        &self,
        user_id: Uuid,
        task_id: Uuid,
        image: &[u8],
        filename: &str,
        mime: &str,
    ) -> Result<ProofOutcome> {
        let mut task = self
            .tasks
            .get(user_id, task_id)
            .await
            .context("Task not found")?;
        if task.is_verified() {
            bail!("Task is already verified");
        }

        task.begin_verification();
        self.tasks
            .update(&task)
            .await
            .context("Failed to update task")?;

        let verdict = self.verifier.verify(&task, image, mime).await;
        if !verdict.approved {
            task.mark_rejected(verdict.reason.clone());
            self.tasks
                .update(&task)
                .await
                .context("Failed to update task")?;
            return Ok(ProofOutcome {
                task,
                verdict,
                proof_saved: false,
            });
        }

        // Verification already passed; a storage failure only loses the
        // proof artifact, not the completion.
        let (proof_url, proof_saved) = match self
            .storage
            .store(user_id, task.category, filename, image, mime)
            .await
        {
            Ok(url) => (Some(url), true),
            Err(err) => {
                log::warn!("proof upload failed for task {}: {}", task.id, err);
                (None, false)
            }
        };

        let now = Utc::now();
        task.mark_verified(now, proof_url);
        self.tasks
            .update(&task)
            .await
            .context("Failed to update task")?;

        self.bump_completed_hours(user_id, task.planned_hours).await;

        Ok(ProofOutcome {
            task,
            verdict,
            proof_saved,
        })
    }

    pub async fn delete_task(&self, user_id: Uuid, task_id: Uuid) -> Result<()> {
        self.tasks
            .delete(user_id, task_id)
            .await
            .context("Failed to delete task")?;
        // The weekly total is corrected by the reconciler on the next
        // refresh; deletion does not touch the cached aggregate here.
        Ok(())
    }

    pub async fn log_screen_time(&self, user_id: Uuid, hours: f64) -> Result<WeeklyStat> {
        if hours <= 0.0 {
            bail!("Screen time hours must be positive");
        }
        let mut stat = self.current_stat(user_id).await?;
        stat.screen_time_hours += hours;
        stat.rating = self
            .rating
            .rate(stat.completed_hours, stat.goal_hours, stat.screen_time_hours);
        self.stats
            .upsert(&stat)
            .await
            .context("Failed to save screen time")?;
        Ok(stat)
    }

    pub async fn set_weekly_goal(&self, user_id: Uuid, hours: f64) -> Result<UserProfile> {
        if hours <= 0.0 {
            bail!("Goal hours must be positive");
        }
        let mut profile = self
            .profiles
            .get(user_id)
            .await
            .context("Failed to load profile")?
            .ok_or_else(|| anyhow::anyhow!("No profile for user {}", user_id))?;
        profile.weekly_goal_hours = hours;
        self.profiles
            .upsert(&profile)
            .await
            .context("Failed to save profile")?;

        // The goal propagates to the active week immediately.
        let mut stat = self.current_stat(user_id).await?;
        stat.goal_hours = hours;
        stat.rating = self
            .rating
            .rate(stat.completed_hours, stat.goal_hours, stat.screen_time_hours);
        self.stats
            .upsert(&stat)
            .await
            .context("Failed to save weekly stat")?;

        Ok(profile)
    }

    /// Current week's stat, created on first access with the profile's goal
    /// and completed hours seeded from the task table.
    async fn current_stat(&self, user_id: Uuid) -> Result<WeeklyStat> {
        let week_id = WeekId::of_instant(Utc::now());
        if let Some(stat) = self
            .stats
            .get(user_id, week_id)
            .await
            .context("Failed to load weekly stat")?
        {
            return Ok(stat);
        }
        let goal = self
            .profiles
            .get(user_id)
            .await
            .ok()
            .flatten()
            .map(|p| p.weekly_goal_hours)
            .unwrap_or(crate::model::DEFAULT_GOAL_HOURS);
        let mut stat = WeeklyStat::new(user_id, week_id, goal);
        if let Ok(tasks) = self.tasks.list(user_id).await {
            stat.completed_hours =
                verified_hours_in_window(&tasks, week_window(Local::now().date_naive()));
            stat.rating = self
                .rating
                .rate(stat.completed_hours, stat.goal_hours, stat.screen_time_hours);
        }
        Ok(stat)
    }

    /// Background bump after a verification; failures are left for the
    /// reconciler rather than bothering the user whose task just verified.
    async fn bump_completed_hours(&self, user_id: Uuid, hours: f64) {
        match self.current_stat(user_id).await {
            Ok(mut stat) => {
                // The just-verified task is already persisted, so the
                // aggregate includes it; recompute rather than increment to
                // avoid counting it twice through a freshly seeded stat.
                match self.tasks.list(user_id).await {
                    Ok(tasks) => {
                        stat.completed_hours = verified_hours_in_window(
                            &tasks,
                            week_window(Local::now().date_naive()),
                        );
                    }
                    Err(_) => stat.completed_hours += hours,
                }
                stat.rating = self
                    .rating
                    .rate(stat.completed_hours, stat.goal_hours, stat.screen_time_hours);
                self.outbox.enqueue(Mutation::UpsertStat(stat)).await;
                self.outbox.spawn_flush();
            }
            Err(err) => {
                log::warn!(
                    "weekly total bump skipped for {}: {} (reconciler will catch up)",
                    user_id,
                    err
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborator::{InlineStorage, OfflineVerifier};
    use crate::error::CollaboratorError;
    use crate::model::VerificationStatus;
    use crate::repository::MemoryStore;
    use crate::service::rating::LinearRatingPolicy;
    use async_trait::async_trait;

    struct RejectingVerifier;

    #[async_trait]
    impl ProofVerifier for RejectingVerifier {
        async fn verify(&self, _task: &Task, _image: &[u8], _mime: &str) -> Verdict {
            Verdict {
                approved: false,
                reason: "photo does not show the task".to_string(),
            }
        }
    }

    struct FailingStorage;

    #[async_trait]
    impl ProofStorage for FailingStorage {
        async fn store(
            &self,
            _user_id: Uuid,
            _category: Category,
            _filename: &str,
            _bytes: &[u8],
            _mime: &str,
        ) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Transport("bucket unreachable".to_string()))
        }
    }

    fn flow_with(
        store: Arc<MemoryStore>,
        verifier: Arc<dyn ProofVerifier>,
        storage: Arc<dyn ProofStorage>,
    ) -> (TaskFlow, Arc<WriteBehind>) {
        let outbox = Arc::new(WriteBehind::new(store.clone(), store.clone()));
        let flow = TaskFlow::new(
            store.clone(),
            store.clone(),
            store,
            verifier,
            storage,
            Arc::new(LinearRatingPolicy),
            outbox.clone(),
        );
        (flow, outbox)
    }

    async fn seed_profile(store: &MemoryStore, user: Uuid) {
        let profile = UserProfile::new(user, "Rin".to_string(), "rin@example.test".to_string());
        ProfileRepository::upsert(store, &profile).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_task_rejects_bad_input() {
        let store = Arc::new(MemoryStore::new());
        let (flow, _) = flow_with(store, Arc::new(OfflineVerifier), Arc::new(InlineStorage));
        let user = Uuid::new_v4();

        assert!(flow
            .create_task(user, "  ".to_string(), None, Category::Study, 2.0)
            .await
            .is_err());
        assert!(flow
            .create_task(user, "Essay".to_string(), None, Category::Study, 0.0)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_submit_proof_verifies_and_bumps_week() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;
        let (flow, outbox) = flow_with(store.clone(), Arc::new(OfflineVerifier), Arc::new(InlineStorage));

        let task = flow
            .create_task(user, "Essay".to_string(), None, Category::Study, 3.0)
            .await
            .unwrap();
        let outcome = flow
            .submit_proof(user, task.id, b"jpegbytes", "proof.jpg", "image/jpeg")
            .await
            .unwrap();

        assert!(outcome.task.is_verified());
        assert!(outcome.proof_saved);
        assert!(outcome.task.proof_url.as_deref().unwrap().starts_with("data:image/jpeg"));
        assert!(outcome.task.completed_at.is_some());

        outbox.flush().await;
        let week = WeekId::current();
        let stat = WeeklyStatRepository::get(&*store, user, week)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stat.completed_hours, 3.0);
        assert!(stat.rating > 0.0);
    }

    #[tokio::test]
    async fn test_rejection_records_reason_and_skips_bump() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;
        let (flow, outbox) = flow_with(store.clone(), Arc::new(RejectingVerifier), Arc::new(InlineStorage));

        let task = flow
            .create_task(user, "Essay".to_string(), None, Category::Study, 3.0)
            .await
            .unwrap();
        let outcome = flow
            .submit_proof(user, task.id, b"jpegbytes", "proof.jpg", "image/jpeg")
            .await
            .unwrap();

        assert_eq!(outcome.task.status, VerificationStatus::Rejected);
        assert_eq!(
            outcome.task.rejection_reason.as_deref(),
            Some("photo does not show the task")
        );
        assert!(outcome.task.completed_at.is_none());
        assert_eq!(outbox.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_storage_failure_still_verifies() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;
        let (flow, _) = flow_with(store.clone(), Arc::new(OfflineVerifier), Arc::new(FailingStorage));

        let task = flow
            .create_task(user, "Essay".to_string(), None, Category::Study, 3.0)
            .await
            .unwrap();
        let outcome = flow
            .submit_proof(user, task.id, b"jpegbytes", "proof.jpg", "image/jpeg")
            .await
            .unwrap();

        assert!(outcome.task.is_verified());
        assert!(!outcome.proof_saved);
        assert!(outcome.task.proof_url.is_none());
    }

    #[tokio::test]
    async fn test_lazy_stat_seeds_from_verified_tasks() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;

        // A verified task from earlier this week whose write-back was lost.
        let mut task = Task::new(user, "Essay".to_string(), Category::Study, 4.0);
        task.begin_verification();
        task.mark_verified(Utc::now(), None);
        store.create(task).await.unwrap();

        let (flow, _) = flow_with(store.clone(), Arc::new(OfflineVerifier), Arc::new(InlineStorage));
        let stat = flow.log_screen_time(user, 2.0).await.unwrap();

        assert_eq!(stat.completed_hours, 4.0);
        assert_eq!(stat.screen_time_hours, 2.0);
    }

    #[tokio::test]
    async fn test_screen_time_recomputes_rating() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;
        let (flow, _) = flow_with(store.clone(), Arc::new(OfflineVerifier), Arc::new(InlineStorage));

        let stat = flow.log_screen_time(user, 16.0).await.unwrap();
        assert_eq!(stat.screen_time_hours, 16.0);
        // 0 completed of 40, 2 hours over the allowance: stays at 0.
        assert_eq!(stat.rating, 0.0);

        let stored = WeeklyStatRepository::get(&*store, user, WeekId::current())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.screen_time_hours, 16.0);
    }

    #[tokio::test]
    async fn test_set_weekly_goal_propagates_to_active_week() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;
        let (flow, _) = flow_with(store.clone(), Arc::new(OfflineVerifier), Arc::new(InlineStorage));

        let profile = flow.set_weekly_goal(user, 20.0).await.unwrap();
        assert_eq!(profile.weekly_goal_hours, 20.0);

        let stat = WeeklyStatRepository::get(&*store, user, WeekId::current())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stat.goal_hours, 20.0);
    }
}
