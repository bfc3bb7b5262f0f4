pub mod profile;
pub mod task;
pub mod weekly_stat;

// Re-export
pub use profile::{UserProfile, DEFAULT_GOAL_HOURS};
pub use task::{Category, Task, VerificationStatus};
pub use weekly_stat::WeeklyStat;
