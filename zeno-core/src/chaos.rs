//! Chaos injector: builds a disruptive task anchored on an existing task's
//! start time, so it is guaranteed to collide with something.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::task::{Task, TaskType};

/// Anchor hour used when the timeline is empty.
pub const EMPTY_TIMELINE_ANCHOR: f64 = 10.0;

/// Injectable randomness. `pick(len)` must return a value in `0..len`.
pub trait RandomSource {
    fn pick(&mut self, len: usize) -> usize;
}

/// `rand`-backed source.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    pub fn from_os() -> Self {
        Self::new(StdRng::from_os_rng())
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn pick(&mut self, len: usize) -> usize {
        self.rng.random_range(0..len)
    }
}

/// Replays a fixed index sequence (wrapping, and reduced modulo `len`).
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    picks: Vec<usize>,
    cursor: usize,
}

impl ScriptedSource {
    pub fn new(picks: Vec<usize>) -> Self {
        Self { picks, cursor: 0 }
    }
}

impl RandomSource for ScriptedSource {
    fn pick(&mut self, len: usize) -> usize {
        if self.picks.is_empty() {
            return 0;
        }
        let v = self.picks[self.cursor % self.picks.len()];
        self.cursor += 1;
        v % len
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChaosTemplate {
    pub title: &'static str,
    pub duration: f64,
    pub urgency: i32,
    pub importance: i32,
    pub energy_level: i32,
    pub mana_cost: i32,
    pub priority: i32,
}

pub const CHAOS_CATALOG: &[ChaosTemplate] = &[
    ChaosTemplate {
        title: "Server Warp Breach",
        duration: 1.5,
        urgency: 5,
        importance: 5,
        energy_level: 5,
        mana_cost: 60,
        priority: 5,
    },
    ChaosTemplate {
        title: "Emergency AI Council",
        duration: 2.0,
        urgency: 4,
        importance: 4,
        energy_level: 5,
        mana_cost: 50,
        priority: 4,
    },
    ChaosTemplate {
        title: "Unexpected Wormhole Call",
        duration: 0.5,
        urgency: 4,
        importance: 2,
        energy_level: 3,
        mana_cost: 25,
        priority: 3,
    },
];

/// Build (but do not store) a chaos task. The caller appends it.
///
/// Draws the template first, then the anchor task.
pub fn inject_chaos(
    existing: &[Task],
    catalog: &[ChaosTemplate],
    rng: &mut dyn RandomSource,
    id: String,
) -> Option<Task> {
    if catalog.is_empty() {
        return None;
    }
    let template = &catalog[rng.pick(catalog.len())];
    let anchor = if existing.is_empty() {
        EMPTY_TIMELINE_ANCHOR
    } else {
        existing[rng.pick(existing.len())].start_time
    };

    Some(Task {
        id,
        title: template.title.to_string(),
        start_time: anchor,
        duration: template.duration,
        task_type: TaskType::Chaos,
        urgency: template.urgency,
        importance: template.importance,
        energy_level: template.energy_level,
        mana_cost: template.mana_cost,
        priority: template.priority,
    })
}
