use guardian_core::{Session, Task, VerificationStatus, WeeklyStat};
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Planned (h)")]
    planned: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Completed")]
    completed: String,
}

fn short_id(id: &uuid::Uuid) -> String {
    id.to_string().chars().take(8).collect()
}

fn status_label(task: &Task) -> String {
    match task.status {
        VerificationStatus::Pending => "Pending".to_string(),
        VerificationStatus::Verifying => "Verifying".to_string(),
        VerificationStatus::Verified => "Verified".to_string(),
        VerificationStatus::Rejected => match &task.rejection_reason {
            Some(reason) => format!("Rejected ({})", reason),
            None => "Rejected".to_string(),
        },
    }
}

pub fn show_tasks(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks yet. Add one with `guardian add`.");
        return;
    }

    let rows: Vec<TaskRow> = tasks
        .iter()
        .map(|t| TaskRow {
            id: short_id(&t.id),
            title: t.title.clone(),
            category: format!("{:?}", t.category),
            planned: format!("{:.1}", t.planned_hours),
            status: status_label(t),
            completed: t
                .completed_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
        })
        .collect();

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}

#[derive(Tabled)]
struct WeekRow {
    #[tabled(rename = "Week")]
    week: String,
    #[tabled(rename = "From")]
    from: String,
    #[tabled(rename = "Done (h)")]
    done: String,
    #[tabled(rename = "Goal (h)")]
    goal: String,
    #[tabled(rename = "Screen (h)")]
    screen: String,
    #[tabled(rename = "Rating")]
    rating: String,
    #[tabled(rename = "Goal met")]
    met: String,
}

fn week_row(stat: &WeeklyStat) -> WeekRow {
    WeekRow {
        week: stat.week_id.to_string(),
        from: stat.week_start.format("%Y-%m-%d").to_string(),
        done: format!("{:.1}", stat.completed_hours),
        goal: format!("{:.1}", stat.goal_hours),
        screen: format!("{:.1}", stat.screen_time_hours),
        rating: format!("{:.1}", stat.rating),
        met: if stat.meets_goal() { "yes" } else { "no" }.to_string(),
    }
}

pub fn show_stats(session: &Session) {
    let stat = &session.current_stat;
    println!(
        "\x1b[1;36m{}\x1b[0m ({} .. {})",
        stat.week_id,
        stat.week_start.format("%b %d"),
        stat.week_end.format("%b %d"),
    );
    println!(
        "  Completed {:.1}h of {:.1}h goal | screen time {:.1}h | rating {:.1}/10",
        stat.completed_hours, stat.goal_hours, stat.screen_time_hours, stat.rating
    );
    println!("  Streak: {} week(s)", session.streak);
}

pub fn show_history(current: &WeeklyStat, history: &[WeeklyStat]) {
    let mut rows = vec![week_row(current)];
    rows.extend(history.iter().map(week_row));

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{}", table);
}
