//! Strategy selection: maps a user-chosen rule id to ordering and placement
//! policy for the scheduler, plus the text handed to the remote model.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::task::{Task, TaskType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityRule {
    Urgency,
    Importance,
    Energy,
    Balanced,
}

impl PriorityRule {
    /// Total: anything unrecognized is `Balanced`.
    pub fn from_id(id: &str) -> Self {
        match id.trim().to_ascii_lowercase().as_str() {
            "urgency" => PriorityRule::Urgency,
            "importance" => PriorityRule::Importance,
            "energy" => PriorityRule::Energy,
            _ => PriorityRule::Balanced,
        }
    }

    pub fn id(self) -> &'static str {
        match self {
            PriorityRule::Urgency => "urgency",
            PriorityRule::Importance => "importance",
            PriorityRule::Energy => "energy",
            PriorityRule::Balanced => "balanced",
        }
    }
}

impl fmt::Display for PriorityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// How candidates are sequenced before placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderPolicy {
    /// urgency desc, start asc, id asc
    UrgencyFirst,
    /// importance desc, priority desc, start asc, id asc
    ImportanceFirst,
    /// heavy blocks separated by light/recovery tasks
    EnergyInterleave,
    /// priority desc, start asc, id asc
    PriorityFirst,
}

/// How ordered tasks are laid onto the day.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlacementPolicy {
    /// Earliest free slot at or after the task's own start.
    PreserveStart,
    /// Back-to-back from the window open.
    Compact,
    /// High-importance tasks back-to-back from the open; the rest packed
    /// against the window close.
    Tiered { threshold: i32 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrategyParams {
    pub rule: PriorityRule,
    pub order: OrderPolicy,
    pub placement: PlacementPolicy,
    pub description: &'static str,
    pub heavy_energy: i32,
    pub heavy_mana: i32,
}

pub const HIGH_IMPORTANCE_THRESHOLD: i32 = 4;

pub fn resolve_strategy(rule_id: &str) -> StrategyParams {
    StrategyParams::for_rule(PriorityRule::from_id(rule_id))
}

impl StrategyParams {
    pub fn for_rule(rule: PriorityRule) -> Self {
        let (order, placement, description) = match rule {
            PriorityRule::Urgency => (
                OrderPolicy::UrgencyFirst,
                PlacementPolicy::PreserveStart,
                "GLOBAL STRATEGY: URGENCY. Tasks with the highest individual 'urgency' ratings must be prioritized and kept as close to their original start times as possible. Move low-urgency tasks to fill gaps.",
            ),
            PriorityRule::Importance => (
                OrderPolicy::ImportanceFirst,
                PlacementPolicy::Tiered {
                    threshold: HIGH_IMPORTANCE_THRESHOLD,
                },
                "GLOBAL STRATEGY: STRATEGIC IMPACT. Re-organize the day so that tasks with high 'importance' ratings occupy the most focused slots. Lower importance tasks can be shifted or grouped late in the day.",
            ),
            PriorityRule::Energy => (
                OrderPolicy::EnergyInterleave,
                PlacementPolicy::Compact,
                "GLOBAL STRATEGY: ENERGY FLOW. Use the 'energyLevel' metric to prevent burnout. Ensure high-energy tasks are not back-to-back. Use low-energy tasks or health tasks as recovery periods.",
            ),
            PriorityRule::Balanced => (
                OrderPolicy::PriorityFirst,
                PlacementPolicy::Compact,
                "Balanced optimization across all metrics.",
            ),
        };

        Self {
            rule,
            order,
            placement,
            description,
            heavy_energy: 4,
            heavy_mana: 40,
        }
    }

    pub fn is_heavy(&self, t: &Task) -> bool {
        t.energy_level >= self.heavy_energy || t.mana_cost >= self.heavy_mana
    }

    /// Sequence tasks for placement. Deterministic for any input order.
    pub fn order_tasks(&self, tasks: &[Task]) -> Vec<Task> {
        let mut out = tasks.to_vec();
        match self.order {
            OrderPolicy::UrgencyFirst => out.sort_by(|a, b| {
                b.urgency.cmp(&a.urgency).then_with(|| by_start_then_id(a, b))
            }),
            OrderPolicy::ImportanceFirst => out.sort_by(|a, b| {
                b.importance
                    .cmp(&a.importance)
                    .then_with(|| b.priority.cmp(&a.priority))
                    .then_with(|| by_start_then_id(a, b))
            }),
            OrderPolicy::PriorityFirst => out.sort_by(|a, b| {
                b.priority.cmp(&a.priority).then_with(|| by_start_then_id(a, b))
            }),
            OrderPolicy::EnergyInterleave => out = self.interleave(out),
        }
        out
    }

    fn interleave(&self, tasks: Vec<Task>) -> Vec<Task> {
        let (mut heavy, mut light): (Vec<Task>, Vec<Task>) =
            tasks.into_iter().partition(|t| self.is_heavy(t));
        heavy.sort_by(by_start_then_id);
        light.sort_by(|a, b| recovery_rank(a).cmp(&recovery_rank(b)).then_with(|| by_start_then_id(a, b)));

        let mut out = Vec::with_capacity(heavy.len() + light.len());
        let mut heavy = heavy.into_iter();
        let mut light = light.into_iter();
        loop {
            match (heavy.next(), light.next()) {
                (None, None) => break,
                (h, l) => out.extend(h.into_iter().chain(l)),
            }
        }
        out
    }
}

/// 0 restores mana, 1 is a health/personal break, 2 is anything else.
pub fn recovery_rank(t: &Task) -> u8 {
    if t.mana_cost < 0 {
        0
    } else if matches!(t.task_type, TaskType::Health | TaskType::Personal) {
        1
    } else {
        2
    }
}

fn by_start_then_id(a: &Task, b: &Task) -> Ordering {
    a.start_time
        .total_cmp(&b.start_time)
        .then_with(|| a.id.cmp(&b.id))
}
