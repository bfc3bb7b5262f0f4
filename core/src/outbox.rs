use std::collections::VecDeque;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::model::{UserProfile, WeeklyStat};
use crate::repository::{ProfileRepository, WeeklyStatRepository};

#[derive(Debug, Clone)]
pub enum Mutation {
    UpsertStat(WeeklyStat),
    UpsertProfile(UserProfile),
}

impl Mutation {
    fn describe(&self) -> String {
        match self {
            Mutation::UpsertStat(s) => format!("weekly_stat {} {}", s.user_id, s.week_id),
            Mutation::UpsertProfile(p) => format!("profile {}", p.id),
        }
    }
}

/// Write-behind queue for background persistence. Reads never wait on it:
/// callers enqueue and move on, a flush is spawned fire-and-forget, and a
/// mutation that fails to land stays queued (dirty) until the next
/// reconciliation pass picks it up. Failures are logged, never surfaced.
pub struct WriteBehind {
    stats: Arc<dyn WeeklyStatRepository>,
    profiles: Arc<dyn ProfileRepository>,
    pending: Mutex<VecDeque<Mutation>>,
}

impl WriteBehind {
    pub fn new(stats: Arc<dyn WeeklyStatRepository>, profiles: Arc<dyn ProfileRepository>) -> Self {
        Self {
            stats,
            profiles,
            pending: Mutex::new(VecDeque::new()),
        }
    }

    pub async fn enqueue(&self, mutation: Mutation) {
        self.pending.lock().await.push_back(mutation);
    }

    pub async fn pending_len(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Attempt every queued mutation once, in order. The first failure stops
    /// the pass and requeues the remainder so ordering per record holds.
    pub async fn flush(&self) {
        loop {
            let next = self.pending.lock().await.pop_front();
            let Some(mutation) = next else { break };

            let result = match &mutation {
                Mutation::UpsertStat(stat) => self.stats.upsert(stat).await,
                Mutation::UpsertProfile(profile) => self.profiles.upsert(profile).await,
            };

            if let Err(err) = result {
                log::warn!(
                    "write-behind failed for {}: {} (will retry on next refresh)",
                    mutation.describe(),
                    err
                );
                self.pending.lock().await.push_front(mutation);
                break;
            }
        }
    }

    /// Fire-and-forget flush; the read path that triggered it keeps going.
    pub fn spawn_flush(self: &Arc<Self>) {
        let outbox = Arc::clone(self);
        tokio::spawn(async move {
            outbox.flush().await;
        });
    }
}
