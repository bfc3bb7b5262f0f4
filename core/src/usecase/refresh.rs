use std::sync::Arc;

use chrono::{Local, NaiveDate};

use crate::collaborator::AuthenticatedUser;
use crate::model::{UserProfile, WeeklyStat};
use crate::outbox::{Mutation, WriteBehind};
use crate::repository::{ProfileRepository, TaskRepository, WeeklyStatRepository};
use crate::service::accounting::{
    compute_streak, reconcile, verified_hours_in_window, Reconciliation,
};
use crate::service::rating::RatingPolicy;
use crate::session::Session;
use crate::week::{week_window, WeekId};

/// Session-resume read path: fan out the four reads, join, then derive the
/// canonical weekly picture (lazy stat creation, drift reconciliation,
/// rating, streak). Never fails: a fetch that errors degrades to a local
/// default and the record self-heals on a later refresh. All persistence
/// goes through the write-behind outbox, off the critical path.
pub struct RefreshUseCase {
    profiles: Arc<dyn ProfileRepository>,
    tasks: Arc<dyn TaskRepository>,
    stats: Arc<dyn WeeklyStatRepository>,
    outbox: Arc<WriteBehind>,
    rating: Arc<dyn RatingPolicy>,
}

impl RefreshUseCase {
    pub fn new(
        profiles: Arc<dyn ProfileRepository>,
        tasks: Arc<dyn TaskRepository>,
        stats: Arc<dyn WeeklyStatRepository>,
        outbox: Arc<WriteBehind>,
        rating: Arc<dyn RatingPolicy>,
    ) -> Self {
        Self {
            profiles,
            tasks,
            stats,
            outbox,
            rating,
        }
    }

    pub async fn refresh(&self, user: &AuthenticatedUser) -> Session {
        // Anything a previous pass left dirty gets another attempt first.
        self.outbox.spawn_flush();
        let session = self.refresh_on(user, Local::now().date_naive()).await;
        self.outbox.spawn_flush();
        session
    }

    /// Refresh as of a given local date. Mutations are enqueued but not
    /// flushed; `refresh` wraps this with fire-and-forget flushes.
    pub async fn refresh_on(&self, user: &AuthenticatedUser, today: NaiveDate) -> Session {
        let week_id = WeekId::of(today);

        let (profile_res, tasks_res, history_res, stat_res) = tokio::join!(
            self.profiles.get(user.id),
            self.tasks.list(user.id),
            self.stats.history(user.id),
            self.stats.get(user.id, week_id),
        );

        // Failure isolation: each fetch degrades on its own.
        let (mut profile, profile_known) = match profile_res {
            Ok(Some(p)) => (p, true),
            Ok(None) => {
                // First login: seed the profile from the identity collaborator.
                let p = profile_from_identity(user);
                self.outbox.enqueue(Mutation::UpsertProfile(p.clone())).await;
                (p, true)
            }
            Err(err) => {
                log::warn!("profile fetch failed for {}: {}", user.id, err);
                (profile_from_identity(user), false)
            }
        };

        let (tasks, tasks_known) = match tasks_res {
            Ok(list) => (list, true),
            Err(err) => {
                log::warn!("task fetch failed for {}: {}", user.id, err);
                (Vec::new(), false)
            }
        };

        let (mut history, history_known) = match history_res {
            Ok(list) => (list, true),
            Err(err) => {
                log::warn!("history fetch failed for {}: {}", user.id, err);
                (Vec::new(), false)
            }
        };
        history.retain(|s| s.week_id < week_id);

        let true_hours = verified_hours_in_window(&tasks, week_window(today));

        let mut stat_dirty = false;
        let (mut stat, stat_known) = match stat_res {
            Ok(Some(s)) => (s, true),
            Ok(None) => {
                // Lazy creation, completed hours seeded from task ground truth.
                let mut s = WeeklyStat::new(user.id, week_id, profile.weekly_goal_hours);
                s.completed_hours = true_hours;
                stat_dirty = true;
                (s, true)
            }
            Err(err) => {
                log::warn!("weekly stat fetch failed for {}: {}", user.id, err);
                let mut s = WeeklyStat::new(user.id, week_id, profile.weekly_goal_hours);
                s.completed_hours = true_hours;
                (s, false)
            }
        };

        // Goal edits propagate from the profile to the active week, but only
        // from a profile that was actually fetched: a fallback profile
        // carries the default goal and must not overwrite the user's.
        if profile_known && stat.goal_hours != profile.weekly_goal_hours {
            stat.goal_hours = profile.weekly_goal_hours;
            stat_dirty = true;
        }

        // Only reconcile against ground truth we actually have.
        if tasks_known {
            if let Reconciliation::Corrected { from, to } = reconcile(&mut stat, true_hours) {
                log::info!(
                    "weekly total for {} {} drifted: {} -> {}",
                    user.id,
                    week_id,
                    from,
                    to
                );
                stat_dirty = true;
            }
        }

        let rating = self
            .rating
            .rate(stat.completed_hours, stat.goal_hours, stat.screen_time_hours);
        if rating != stat.rating {
            stat.rating = rating;
            stat_dirty = true;
        }

        let streak = compute_streak(&stat, &history);
        if profile.current_streak != streak {
            profile.current_streak = streak;
            // The persisted streak is only a cache; refresh it when the
            // inputs were trustworthy.
            if profile_known && history_known && tasks_known {
                self.outbox
                    .enqueue(Mutation::UpsertProfile(profile.clone()))
                    .await;
            }
        }

        if stat_dirty && stat_known {
            self.outbox.enqueue(Mutation::UpsertStat(stat.clone())).await;
        }

        Session {
            user_id: user.id,
            profile,
            tasks,
            current_stat: stat,
            history,
            streak,
        }
    }
}

fn profile_from_identity(user: &AuthenticatedUser) -> UserProfile {
    let mut profile = UserProfile::new(user.id, user.name.clone(), user.email.clone());
    profile.avatar_url = user.avatar_url.clone();
    profile
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::model::{Category, Task};
    use crate::repository::MemoryStore;
    use crate::service::rating::LinearRatingPolicy;
    use async_trait::async_trait;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    struct FailingTasks;

    struct FailingProfiles;

    #[async_trait]
    impl ProfileRepository for FailingProfiles {
        async fn get(&self, _user_id: Uuid) -> Result<Option<UserProfile>, StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
        async fn upsert(&self, _profile: &UserProfile) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
    }

    #[async_trait]
    impl TaskRepository for FailingTasks {
        async fn create(&self, _task: Task) -> Result<Task, StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
        async fn get(&self, _user_id: Uuid, _id: Uuid) -> Result<Task, StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
        async fn list(&self, _user_id: Uuid) -> Result<Vec<Task>, StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
        async fn update(&self, _task: &Task) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
        async fn delete(&self, _user_id: Uuid, _id: Uuid) -> Result<(), StoreError> {
            Err(StoreError::Backend("down".to_string()))
        }
    }

    fn identity(id: Uuid) -> AuthenticatedUser {
        AuthenticatedUser {
            id,
            name: "Rin".to_string(),
            email: "rin@example.test".to_string(),
            avatar_url: None,
        }
    }

    fn usecase_with(store: Arc<MemoryStore>) -> (RefreshUseCase, Arc<WriteBehind>) {
        let outbox = Arc::new(WriteBehind::new(store.clone(), store.clone()));
        let usecase = RefreshUseCase::new(
            store.clone(),
            store.clone(),
            store,
            outbox.clone(),
            Arc::new(LinearRatingPolicy),
        );
        (usecase, outbox)
    }

    /// Wednesday 2025-06-11, week 2025-W24.
    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 11).unwrap()
    }

    fn verified_task(user: Uuid, hours: f64) -> Task {
        let mut task = Task::new(user, "done".to_string(), Category::Work, hours);
        task.begin_verification();
        let midweek = Local
            .with_ymd_and_hms(2025, 6, 10, 12, 0, 0)
            .unwrap()
            .with_timezone(&Utc);
        task.mark_verified(midweek, None);
        task
    }

    async fn seed_profile(store: &MemoryStore, user: Uuid) -> UserProfile {
        let profile = UserProfile::new(user, "Rin".to_string(), "rin@example.test".to_string());
        ProfileRepository::upsert(store, &profile).await.unwrap();
        profile
    }

    #[tokio::test]
    async fn test_first_login_creates_profile() {
        let store = Arc::new(MemoryStore::new());
        let (usecase, outbox) = usecase_with(store.clone());
        let user = Uuid::new_v4();

        let session = usecase.refresh_on(&identity(user), today()).await;
        assert_eq!(session.profile.name, "Rin");

        outbox.flush().await;
        let stored = ProfileRepository::get(&*store, user).await.unwrap();
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn test_lazy_stat_creation_seeds_from_tasks() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;
        store.create(verified_task(user, 3.0)).await.unwrap();
        store.create(verified_task(user, 1.5)).await.unwrap();

        let (usecase, outbox) = usecase_with(store.clone());
        let session = usecase.refresh_on(&identity(user), today()).await;

        assert_eq!(session.current_stat.week_id.to_string(), "2025-W24");
        assert_eq!(session.current_stat.completed_hours, 4.5);

        outbox.flush().await;
        let stored = WeeklyStatRepository::get(&*store, user, session.week_id())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.completed_hours, 4.5);
    }

    #[tokio::test]
    async fn test_drift_correction_schedules_one_writeback() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;
        for hours in [3.0, 4.5, 5.0] {
            store.create(verified_task(user, hours)).await.unwrap();
        }

        // Persisted total lags the true 12.5.
        let week: WeekId = "2025-W24".parse().unwrap();
        let mut stale = WeeklyStat::new(user, week, 40.0);
        stale.completed_hours = 10.0;
        stale.rating = LinearRatingPolicy.rate(12.5, 40.0, 0.0);
        WeeklyStatRepository::upsert(&*store, &stale).await.unwrap();

        let (usecase, outbox) = usecase_with(store.clone());
        let session = usecase.refresh_on(&identity(user), today()).await;

        assert_eq!(session.current_stat.completed_hours, 12.5);
        assert_eq!(outbox.pending_len().await, 1);

        outbox.flush().await;
        let stored = WeeklyStatRepository::get(&*store, user, week)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.completed_hours, 12.5);
    }

    #[tokio::test]
    async fn test_drift_within_tolerance_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;
        store.create(verified_task(user, 10.05)).await.unwrap();

        let week: WeekId = "2025-W24".parse().unwrap();
        let mut stat = WeeklyStat::new(user, week, 40.0);
        stat.completed_hours = 10.0;
        stat.rating = LinearRatingPolicy.rate(10.0, 40.0, 0.0);
        WeeklyStatRepository::upsert(&*store, &stat).await.unwrap();

        let (usecase, outbox) = usecase_with(store.clone());
        let session = usecase.refresh_on(&identity(user), today()).await;

        assert_eq!(session.current_stat.completed_hours, 10.0);
        assert_eq!(outbox.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_task_fetch_failure_does_not_poison_stat() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;

        let week: WeekId = "2025-W24".parse().unwrap();
        let mut stat = WeeklyStat::new(user, week, 40.0);
        stat.completed_hours = 10.0;
        stat.rating = LinearRatingPolicy.rate(10.0, 40.0, 0.0);
        WeeklyStatRepository::upsert(&*store, &stat).await.unwrap();

        let outbox = Arc::new(WriteBehind::new(store.clone(), store.clone()));
        let usecase = RefreshUseCase::new(
            store.clone(),
            Arc::new(FailingTasks),
            store.clone(),
            outbox.clone(),
            Arc::new(LinearRatingPolicy),
        );

        let session = usecase.refresh_on(&identity(user), today()).await;

        // The stored total survives; an empty task list from a failed fetch
        // is not ground truth.
        assert!(session.tasks.is_empty());
        assert_eq!(session.current_stat.completed_hours, 10.0);
        assert_eq!(outbox.pending_len().await, 0);
    }

    #[tokio::test]
    async fn test_profile_fetch_failure_keeps_configured_goal() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        store.create(verified_task(user, 10.0)).await.unwrap();

        // The user set a 20 h goal; the fallback profile carries the default.
        let week: WeekId = "2025-W24".parse().unwrap();
        let mut stat = WeeklyStat::new(user, week, 20.0);
        stat.completed_hours = 10.0;
        stat.rating = LinearRatingPolicy.rate(10.0, 20.0, 0.0);
        WeeklyStatRepository::upsert(&*store, &stat).await.unwrap();

        let outbox = Arc::new(WriteBehind::new(store.clone(), store.clone()));
        let usecase = RefreshUseCase::new(
            Arc::new(FailingProfiles),
            store.clone(),
            store.clone(),
            outbox.clone(),
            Arc::new(LinearRatingPolicy),
        );

        let session = usecase.refresh_on(&identity(user), today()).await;

        assert_eq!(session.current_stat.goal_hours, 20.0);
        assert_eq!(session.current_stat.rating, 5.0);
        assert_eq!(outbox.pending_len().await, 0);

        outbox.flush().await;
        let stored = WeeklyStatRepository::get(&*store, user, week)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.goal_hours, 20.0);
    }

    #[tokio::test]
    async fn test_refresh_updates_streak_cache() {
        let store = Arc::new(MemoryStore::new());
        let user = Uuid::new_v4();
        seed_profile(&store, user).await;

        // Previous week met its goal.
        let prev: WeekId = "2025-W23".parse().unwrap();
        let mut prev_stat = WeeklyStat::new(user, prev, 40.0);
        prev_stat.completed_hours = 41.0;
        WeeklyStatRepository::upsert(&*store, &prev_stat).await.unwrap();

        let (usecase, outbox) = usecase_with(store.clone());
        let session = usecase.refresh_on(&identity(user), today()).await;
        assert_eq!(session.streak, 1);

        outbox.flush().await;
        let stored = ProfileRepository::get(&*store, user).await.unwrap().unwrap();
        assert_eq!(stored.current_streak, 1);
    }
}
