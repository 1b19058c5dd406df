use std::fmt::Write as _;

use chrono::NaiveDate;
use habit_core::notifications::{Notice, NoticeLevel, NotificationSink};
use habit_core::progress::{compute_arc, Arc, ArcParams, ProgressSize};
use habit_core::snapshot::DashboardSnapshot;
use habit_core::DashboardConfig;

const RING_CELLS: usize = 20;

/// Prints notices to stderr as they arrive.
#[derive(Debug, Default)]
pub struct TerminalSink;

impl NotificationSink for TerminalSink {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => eprintln!("✔ {}", notice.title),
            NoticeLevel::Error => eprintln!("✘ {}", notice.title),
        }
    }
}

pub fn format_day_heading(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Horizontal stand-in for a progress ring: filled cells follow the arc's
/// filled fraction.
fn ring_bar(arc: &Arc) -> String {
    let filled = (arc.fraction * RING_CELLS as f64).round() as usize;
    let mut bar = String::with_capacity(RING_CELLS + 2);
    bar.push('[');
    for idx in 0..RING_CELLS {
        bar.push(if idx < filled { '#' } else { '.' });
    }
    bar.push(']');
    bar
}

fn ring_line(out: &mut String, label: &str, percent: f64, caption: &str) {
    let arc = compute_arc(ArcParams::percent(percent, ProgressSize::Large));
    let _ = writeln!(
        out,
        "  {label:<16} {} {caption:<8} (r={:.1}, offset={:.1}/{:.1})",
        ring_bar(&arc),
        arc.radius,
        arc.dash_offset,
        arc.circumference
    );
}

pub fn render_dashboard(snapshot: &DashboardSnapshot, config: &DashboardConfig) -> String {
    let stats = &snapshot.stats;
    let mut out = String::new();

    if let Some(date) = snapshot.reference_date {
        let _ = writeln!(out, "{}", format_day_heading(date));
        out.push('\n');
    }

    let _ = writeln!(out, "Today's Progress");
    ring_line(
        &mut out,
        "Daily Habits",
        stats.today_percent(),
        &format!("{}/{}", stats.today_habits_completed, stats.today_habits_total),
    );
    ring_line(
        &mut out,
        "Weekly Progress",
        stats.weekly_percent(),
        &format!("{}%", stats.weekly_percent_rounded()),
    );
    ring_line(
        &mut out,
        "Tasks",
        stats.todo_percent(),
        &format!(
            "{}/{}",
            stats.completed_todos,
            stats.pending_todos + stats.completed_todos
        ),
    );
    out.push('\n');

    let _ = writeln!(out, "Today's Habits");
    let preview = snapshot.today_preview(config.preview_limit);
    if snapshot.habits.is_empty() {
        let _ = writeln!(out, "  No habits found. Create your first habit!");
    }
    for habit in &preview.habits {
        let mark = if habit.completed { "x" } else { " " };
        let status = if habit.completed { "Done" } else { "Complete" };
        let _ = write!(
            out,
            "  [{mark}] {} ({}) - {status}",
            habit.name,
            habit.frequency.label()
        );
        if let Some(color) = &habit.color_code {
            let _ = write!(out, " {color}");
        }
        let _ = writeln!(out, "  id={}", habit.id);
    }
    if preview.has_more {
        let _ = writeln!(out, "  ... see more");
    }
    out.push('\n');

    let _ = writeln!(out, "Upcoming Tasks");
    let (todos, more_todos) = snapshot.upcoming_todos(config.upcoming_todo_limit);
    if todos.is_empty() {
        let _ = writeln!(out, "  No pending tasks. Create a new task!");
    }
    for todo in todos {
        let _ = write!(out, "  - {}", todo.name);
        if let Some(due) = todo.due_date {
            let _ = write!(out, "  Due: {}", due.format("%b %-d, %Y"));
        }
        if let Some(color) = snapshot.category_color(todo.category_id.as_deref()) {
            let _ = write!(out, " {color}");
        }
        let _ = writeln!(out, "  id={}", todo.id);
    }
    if more_todos {
        let _ = writeln!(out, "  ... see more");
    }
    out.push('\n');

    let _ = writeln!(out, "Analytics");
    let _ = writeln!(
        out,
        "  Weekly Success {}% | Categories {}",
        stats.weekly_percent_rounded(),
        snapshot.category_count()
    );
    out
}
