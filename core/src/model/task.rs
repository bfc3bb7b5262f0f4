use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Study,
    Work,
}

impl Default for Category {
    fn default() -> Self {
        Category::Study
    }
}

impl Category {
    /// Path segment for proof storage (user/category/filename).
    pub fn slug(&self) -> &'static str {
        match self {
            Category::Study => "study",
            Category::Work => "work",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Verifying,
    Verified,
    Rejected,
}

impl Default for VerificationStatus {
    fn default() -> Self {
        VerificationStatus::Pending
    }
}

/// A planned unit of work. `planned_hours` is the user-declared estimate and
/// is what counts toward the weekly total once the task is verified, not any
/// measured wall-clock time.
///
/// Invariant: `completed_at` is set if and only if status is `Verified`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub category: Category,
    pub planned_hours: f64,
    pub status: VerificationStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub proof_url: Option<String>,
    pub rejection_reason: Option<String>,
}

impl Task {
    pub fn new(user_id: Uuid, title: String, category: Category, planned_hours: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            title,
            description: None,
            category,
            planned_hours,
            status: VerificationStatus::default(),
            created_at: Utc::now(),
            completed_at: None,
            proof_url: None,
            rejection_reason: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }

    /// Proof has been submitted and is with the verifier.
    pub fn begin_verification(&mut self) {
        self.status = VerificationStatus::Verifying;
        self.rejection_reason = None;
    }

    pub fn mark_verified(&mut self, at: DateTime<Utc>, proof_url: Option<String>) {
        self.status = VerificationStatus::Verified;
        self.completed_at = Some(at);
        self.proof_url = proof_url;
        self.rejection_reason = None;
    }

    pub fn mark_rejected(&mut self, reason: String) {
        self.status = VerificationStatus::Rejected;
        self.completed_at = None;
        self.rejection_reason = Some(reason);
    }
}
