//! Read-only views for the display layer: formatted ranges, per-task conflict
//! flags, and the aggregate stress reading.

use serde::Serialize;

use crate::conflict::{conflict_count, has_conflict};
use crate::task::Task;

/// Conflict count at which the stress gauge is full.
pub const STRESS_SCALE: usize = 5;

/// `9.5` -> `"09:30"`. Minutes are rounded; 60 carries into the hour.
pub fn format_clock(hour: f64) -> String {
    let total = (hour * 60.0).round() as i64;
    let (h, m) = (total.div_euclid(60), total.rem_euclid(60));
    format!("{h:02}:{m:02}")
}

pub fn format_range(task: &Task) -> String {
    format!("{} - {}", format_clock(task.start_time), format_clock(task.end()))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineEntry {
    pub task: Task,
    pub has_conflict: bool,
    pub range: String,
}

/// Tasks in start order, each tagged with its conflict flag.
pub fn timeline_view(tasks: &[Task]) -> Vec<TimelineEntry> {
    let mut sorted: Vec<&Task> = tasks.iter().collect();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
    sorted
        .into_iter()
        .map(|t| TimelineEntry {
            task: t.clone(),
            has_conflict: has_conflict(t, tasks),
            range: format_range(t),
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StressStatus {
    Optimal,
    Warning,
    Critical,
}

impl StressStatus {
    pub fn label(self) -> &'static str {
        match self {
            StressStatus::Optimal => "OPTIMAL",
            StressStatus::Warning => "WARNING",
            StressStatus::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StressReading {
    pub conflicts: usize,
    pub percent: f64,
    pub status: StressStatus,
}

impl StressReading {
    pub fn from_conflict_count(conflicts: usize) -> Self {
        let status = match conflicts {
            0 => StressStatus::Optimal,
            1 | 2 => StressStatus::Warning,
            _ => StressStatus::Critical,
        };
        let percent = (conflicts as f64 / STRESS_SCALE as f64 * 100.0).min(100.0);
        Self {
            conflicts,
            percent,
            status,
        }
    }

    pub fn of(tasks: &[Task]) -> Self {
        Self::from_conflict_count(conflict_count(tasks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(9.0), "09:00");
        assert_eq!(format_clock(13.5), "13:30");
        assert_eq!(format_clock(7.25), "07:15");
        assert_eq!(format_clock(10.999), "11:00");
        assert_eq!(format_clock(23.0), "23:00");
    }

    #[test]
    fn timeline_is_sorted_and_flags_conflicts() {
        let tasks = vec![
            Task::new("b", "").with_start(10.0).with_duration(1.0),
            Task::new("c", "").with_start(15.0).with_duration(1.0),
            Task::new("a", "").with_start(9.0).with_duration(2.0),
        ];
        let view = timeline_view(&tasks);
        let ids: Vec<_> = view.iter().map(|e| e.task.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(
            view.iter().map(|e| e.has_conflict).collect::<Vec<_>>(),
            vec![true, true, false]
        );
        assert_eq!(view[0].range, "09:00 - 11:00");
    }

    #[test]
    fn stress_bands() {
        assert_eq!(StressReading::from_conflict_count(0).status, StressStatus::Optimal);
        assert_eq!(StressReading::from_conflict_count(2).status, StressStatus::Warning);
        let critical = StressReading::from_conflict_count(7);
        assert_eq!(critical.status, StressStatus::Critical);
        assert_eq!(critical.percent, 100.0);
        assert_eq!(StressReading::from_conflict_count(1).percent, 20.0);
    }
}
