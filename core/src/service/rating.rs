/// Weekly screen-time allowance before the penalty kicks in.
pub const SCREEN_TIME_ALLOWANCE_HOURS: f64 = 14.0;
pub const SCREEN_TIME_PENALTY_PER_HOUR: f64 = 0.5;

/// Maps weekly hours to a 0-10 rating. Kept behind a trait so the linear
/// policy can be swapped for a remote scorer without touching the engine.
pub trait RatingPolicy: Send + Sync {
    fn rate(&self, completed_hours: f64, goal_hours: f64, screen_time_hours: f64) -> f64;
}

/// Productivity score `completed/goal * 10`, minus half a point per
/// screen-time hour over the weekly allowance, clamped to [0, 10] and
/// rounded to one decimal. A zero goal rates 0 rather than dividing.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearRatingPolicy;

impl RatingPolicy for LinearRatingPolicy {
    fn rate(&self, completed_hours: f64, goal_hours: f64, screen_time_hours: f64) -> f64 {
        if goal_hours <= 0.0 {
            return 0.0;
        }
        let productivity = completed_hours / goal_hours * 10.0;
        let excess = (screen_time_hours - SCREEN_TIME_ALLOWANCE_HOURS).max(0.0);
        let rating = (productivity - excess * SCREEN_TIME_PENALTY_PER_HOUR).clamp(0.0, 10.0);
        (rating * 10.0).round() / 10.0
    }
}
