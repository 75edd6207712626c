//! Local fallback scheduler: a deterministic greedy layout that always
//! produces a conflict-free day.
//!
//! Algorithm:
//! 1) order tasks with the strategy's total order
//! 2) lay them onto the day per the strategy's placement policy
//! 3) flag (never drop) anything that ends past the window close
//!
//! Durations and ids pass through untouched; only `start_time` changes.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::TimeWindow;
use crate::strategy::{PlacementPolicy, StrategyParams};
use crate::task::Task;

/// Slack for float drift when summing fractional durations up to the close.
const OVERFLOW_EPSILON: f64 = 1e-9;

/// Output of a resolution pass, in placement order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub tasks: Vec<Task>,
    /// Ids whose interval ends after the window close.
    pub overflow: Vec<String>,
}

impl Schedule {
    pub fn from_tasks(tasks: Vec<Task>, window: &TimeWindow) -> Self {
        let overflow = tasks
            .iter()
            .filter(|t| t.end() > window.close + OVERFLOW_EPSILON)
            .map(|t| t.id.clone())
            .collect();
        Self { tasks, overflow }
    }

    pub fn capacity_exceeded(&self) -> bool {
        !self.overflow.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalScheduler {
    window: TimeWindow,
}

impl LocalScheduler {
    pub fn new(window: TimeWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn resolve(&self, tasks: &[Task], params: &StrategyParams) -> Schedule {
        let ordered = params.order_tasks(tasks);
        let placed = match params.placement {
            PlacementPolicy::Compact => self.compact(ordered, self.window.open),
            PlacementPolicy::PreserveStart => self.preserve_start(ordered),
            PlacementPolicy::Tiered { threshold } => self.tiered(ordered, threshold),
        };

        let schedule = Schedule::from_tasks(placed, &self.window);
        debug!(
            rule = %params.rule,
            tasks = schedule.tasks.len(),
            overflow = schedule.overflow.len(),
            "local schedule computed"
        );
        schedule
    }

    fn compact(&self, ordered: Vec<Task>, from: f64) -> Vec<Task> {
        let mut current_end = from;
        ordered
            .into_iter()
            .map(|mut t| {
                let start = self.window.open.max(current_end);
                t.start_time = start;
                current_end = start + t.duration;
                t
            })
            .collect()
    }

    fn preserve_start(&self, ordered: Vec<Task>) -> Vec<Task> {
        // Occupied intervals, kept sorted by start and pairwise disjoint.
        let mut occupied: Vec<(f64, f64)> = Vec::with_capacity(ordered.len());
        let mut out = Vec::with_capacity(ordered.len());

        for mut t in ordered {
            let mut start = t.start_time.max(self.window.open);
            for &(s, e) in &occupied {
                if s < start + t.duration && start < e {
                    start = e;
                }
            }
            t.start_time = start;

            let pos = occupied.partition_point(|&(s, _)| s < start);
            occupied.insert(pos, (start, start + t.duration));
            out.push(t);
        }
        out
    }

    fn tiered(&self, ordered: Vec<Task>, threshold: i32) -> Vec<Task> {
        let (high, low): (Vec<Task>, Vec<Task>) =
            ordered.into_iter().partition(|t| t.importance >= threshold);

        let mut out = self.compact(high, self.window.open);
        let high_end = out.last().map(|t| t.end()).unwrap_or(self.window.open);
        let low_total: f64 = low.iter().map(|t| t.duration).sum();
        let low_from = high_end.max(self.window.close - low_total);

        out.extend(self.compact(low, low_from));
        out
    }
}
