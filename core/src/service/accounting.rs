use chrono::{DateTime, Local, NaiveDate};

use crate::model::{Task, WeeklyStat};

/// Cached weekly totals may lag the task table by float noise from repeated
/// increments; anything past this is real drift and gets overwritten.
pub const DRIFT_TOLERANCE_HOURS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reconciliation {
    Consistent,
    Corrected { from: f64, to: f64 },
}

/// Sum of planned hours for verified tasks completed inside the half-open
/// local-date window. Pure function of its inputs; the planned estimate
/// counts, not elapsed time.
pub fn verified_hours_in_window(tasks: &[Task], window: (NaiveDate, NaiveDate)) -> f64 {
    let (start, end) = window;
    tasks
        .iter()
        .filter(|t| t.is_verified())
        .filter_map(|t| {
            let completed_at = t.completed_at?;
            let local: DateTime<Local> = DateTime::from(completed_at);
            let date = local.date_naive();
            (start <= date && date < end).then_some(t.planned_hours)
        })
        .sum()
}

/// Task records are ground truth; if the cached total has drifted past
/// tolerance the freshly computed aggregate wins. The caller is responsible
/// for scheduling the write-back; this never blocks on persistence.
pub fn reconcile(stat: &mut WeeklyStat, true_hours: f64) -> Reconciliation {
    if (stat.completed_hours - true_hours).abs() <= DRIFT_TOLERANCE_HOURS {
        return Reconciliation::Consistent;
    }
    let from = stat.completed_hours;
    stat.completed_hours = true_hours;
    Reconciliation::Corrected {
        from,
        to: true_hours,
    }
}

/// Consecutive gap-free weeks meeting their goal, walking backward from the
/// current week.
///
/// `history` is every stored week before the current one, most recent first.
/// A missing week is a failed week: the first entry that is not exactly the
/// expected previous week stops the walk. The current week only extends the
/// streak when already met; while still in progress and under goal it
/// neither counts nor breaks anything, since only a completed, failed week
/// can break a streak.
pub fn compute_streak(current: &WeeklyStat, history: &[WeeklyStat]) -> u32 {
    let mut streak = 0;
    if current.meets_goal() {
        streak += 1;
    }
    let mut cursor = current.week_id.previous();

    for entry in history {
        if entry.week_id != cursor {
            break;
        }
        if entry.meets_goal() {
            streak += 1;
            cursor = entry.week_id.previous();
        } else {
            break;
        }
    }

    streak
}
