//! Conflict detection over a task collection. Pure, safe to call on every read.

use crate::task::Task;

/// True if any other task (different id) overlaps `task`.
pub fn has_conflict(task: &Task, all: &[Task]) -> bool {
    all.iter().any(|t| t.id != task.id && t.overlaps(task))
}

/// Stress metric: number of tasks that overlap at least one later-starting
/// task once sorted by start time. Not a pair count.
pub fn conflict_count(all: &[Task]) -> usize {
    let mut sorted: Vec<&Task> = all.iter().collect();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    let mut count = 0;
    for i in 0..sorted.len() {
        let a = sorted[i];
        for b in &sorted[i + 1..] {
            if a.start_time + a.duration > b.start_time {
                count += 1;
                break;
            }
        }
    }
    count
}

/// Every overlapping pair of ids, in input order.
pub fn conflict_pairs(all: &[Task]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (i, a) in all.iter().enumerate() {
        for b in &all[i + 1..] {
            if a.overlaps(b) {
                pairs.push((a.id.clone(), b.id.clone()));
            }
        }
    }
    pairs
}

pub fn is_conflict_free(all: &[Task]) -> bool {
    all.iter()
        .enumerate()
        .all(|(i, a)| all[i + 1..].iter().all(|b| !a.overlaps(b)))
}
