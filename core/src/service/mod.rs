pub mod accounting;
pub mod rating;
pub mod task_flow;

// Re-export
pub use accounting::{compute_streak, reconcile, verified_hours_in_window, Reconciliation};
pub use rating::{LinearRatingPolicy, RatingPolicy};
pub use task_flow::{ProofOutcome, TaskFlow};
