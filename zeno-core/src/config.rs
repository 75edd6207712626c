//! Engine configuration: the valid day window and resolution gating.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Hours of the day a schedule is expected to fit into, `[open, close)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub open: f64,
    pub close: f64,
}

impl TimeWindow {
    pub fn new(open: f64, close: f64) -> Self {
        Self { open, close }
    }

    /// Latest start accepted from the entry form.
    pub fn latest_start(&self) -> f64 {
        (self.close - 1.0).max(self.open)
    }

    pub fn capacity(&self) -> f64 {
        (self.close - self.open).max(0.0)
    }

    pub fn clamp_start(&self, start: f64) -> f64 {
        start.clamp(self.open, self.latest_start())
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        Self {
            open: 7.0,
            close: 23.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub window: TimeWindow,
    /// Resolution is refused while mana sits below this.
    pub mana_threshold: i32,
    pub remote_timeout: Duration,
    pub default_rule: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            window: TimeWindow::default(),
            mana_threshold: 20,
            remote_timeout: Duration::from_secs(20),
            default_rule: "urgency".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn with_window(mut self, window: TimeWindow) -> Self {
        self.window = window;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.remote_timeout = timeout;
        self
    }

    pub fn with_mana_threshold(mut self, threshold: i32) -> Self {
        self.mana_threshold = threshold;
        self
    }
}
