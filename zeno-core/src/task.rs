//! Task model for the ZENO timeline.
//!
//! The canonical shape carries per-task urgency/importance/energy metrics;
//! `priority` and `manaCost` are derived from them. The older shape that only
//! had priority/manaCost is still accepted on input via [`TaskRecord`].

use serde::{Deserialize, Serialize};

use crate::config::TimeWindow;
use crate::error::ValidationError;

/// Smallest duration step accepted from the entry form, in hours.
pub const DURATION_STEP: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskType {
    Work,
    Personal,
    Health,
    Chaos,
}

impl TaskType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Some(TaskType::Work),
            "personal" => Some(TaskType::Personal),
            "health" => Some(TaskType::Health),
            "chaos" => Some(TaskType::Chaos),
            _ => None,
        }
    }
}

/// Core task type. Wire names are camelCase to match the remote schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,

    /// Hour of day, fractional for sub-hour granularity.
    pub start_time: f64,
    /// Hours, always > 0.
    pub duration: f64,

    #[serde(rename = "type")]
    pub task_type: TaskType,

    /// 1-5.
    pub urgency: i32,
    /// 1-5.
    pub importance: i32,
    /// 1-5.
    pub energy_level: i32,

    /// Negative values restore mana.
    pub mana_cost: i32,
    /// 1-5.
    pub priority: i32,
}

impl Task {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            start_time: 9.0,
            duration: 1.0,
            task_type: TaskType::Work,
            urgency: 3,
            importance: 3,
            energy_level: 3,
            mana_cost: 30,
            priority: 3,
        }
    }

    pub fn with_start(mut self, start_time: f64) -> Self {
        self.start_time = start_time;
        self
    }

    pub fn with_duration(mut self, hours: f64) -> Self {
        self.duration = hours;
        self
    }

    pub fn with_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    pub fn with_urgency(mut self, urgency: i32) -> Self {
        self.urgency = urgency;
        self.priority = derive_priority(self.importance, self.urgency);
        self
    }

    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = importance;
        self.priority = derive_priority(self.importance, self.urgency);
        self
    }

    pub fn with_energy(mut self, energy_level: i32) -> Self {
        self.energy_level = energy_level;
        self.mana_cost = derive_mana_cost(energy_level);
        self
    }

    pub fn with_mana_cost(mut self, mana_cost: i32) -> Self {
        self.mana_cost = mana_cost;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Exclusive end of the task interval.
    pub fn end(&self) -> f64 {
        self.start_time + self.duration
    }

    /// Half-open overlap test; touching endpoints do not overlap.
    pub fn overlaps(&self, other: &Task) -> bool {
        self.start_time < other.end() && other.start_time < self.end()
    }

    /// Structural checks for tasks that did not come through the entry form,
    /// e.g. task files. Durations are not held to the half-hour step here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !self.start_time.is_finite() {
            return Err(ValidationError::InvalidStart(self.start_time));
        }
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ValidationError::NonPositiveDuration(self.duration));
        }
        check_metrics(&[
            ("urgency", self.urgency),
            ("importance", self.importance),
            ("energyLevel", self.energy_level),
            ("priority", self.priority),
        ])
    }
}

fn check_metrics(metrics: &[(&'static str, i32)]) -> Result<(), ValidationError> {
    for &(field, value) in metrics {
        if !(1..=5).contains(&value) {
            return Err(ValidationError::MetricOutOfRange { field, value });
        }
    }
    Ok(())
}

pub fn derive_priority(importance: i32, urgency: i32) -> i32 {
    ((importance + urgency) as f64 / 2.0).round() as i32
}

pub fn derive_mana_cost(energy_level: i32) -> i32 {
    energy_level * 10
}

/// Pre-metrics task shape: only priority and manaCost were recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyTask {
    pub id: String,
    pub title: String,
    pub start_time: f64,
    pub duration: f64,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub mana_cost: i32,
    pub priority: i32,
}

impl From<LegacyTask> for Task {
    fn from(t: LegacyTask) -> Self {
        let priority = t.priority.clamp(1, 5);
        let energy_level = ((t.mana_cost as f64) / 10.0).round() as i32;
        Task {
            id: t.id,
            title: t.title,
            start_time: t.start_time,
            duration: t.duration,
            task_type: t.task_type,
            urgency: priority,
            importance: priority,
            energy_level: energy_level.clamp(1, 5),
            mana_cost: t.mana_cost,
            priority,
        }
    }
}

/// Either task shape, as found in task files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskRecord {
    Full(Task),
    Legacy(LegacyTask),
}

impl From<TaskRecord> for Task {
    fn from(r: TaskRecord) -> Self {
        match r {
            TaskRecord::Full(t) => t,
            TaskRecord::Legacy(t) => t.into(),
        }
    }
}

/// Raw entry-form input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDraft {
    pub title: String,
    pub start_time: f64,
    pub duration: f64,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub urgency: i32,
    pub importance: i32,
    pub energy_level: i32,
}

impl Default for TaskDraft {
    fn default() -> Self {
        Self {
            title: String::new(),
            start_time: 9.0,
            duration: 1.0,
            task_type: TaskType::Work,
            urgency: 3,
            importance: 3,
            energy_level: 3,
        }
    }
}

impl TaskDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Check the draft and build a task with derived cost and priority.
    pub fn into_task(self, id: String, window: &TimeWindow) -> Result<Task, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        if !self.start_time.is_finite() {
            return Err(ValidationError::InvalidStart(self.start_time));
        }
        let steps = self.duration / DURATION_STEP;
        if !self.duration.is_finite() || self.duration < DURATION_STEP || steps.fract() != 0.0 {
            return Err(ValidationError::InvalidDuration(self.duration));
        }
        check_metrics(&[
            ("urgency", self.urgency),
            ("importance", self.importance),
            ("energyLevel", self.energy_level),
        ])?;

        Ok(Task {
            id,
            title: title.to_string(),
            start_time: window.clamp_start(self.start_time),
            duration: self.duration,
            task_type: self.task_type,
            urgency: self.urgency,
            importance: self.importance,
            energy_level: self.energy_level,
            mana_cost: derive_mana_cost(self.energy_level),
            priority: derive_priority(self.importance, self.urgency),
        })
    }
}

/// Starter timeline shown on a fresh session.
pub fn seed_tasks() -> Vec<Task> {
    vec![
        LegacyTask {
            id: "1".to_string(),
            title: "Morning Code Audit".to_string(),
            start_time: 9.0,
            duration: 2.0,
            task_type: TaskType::Work,
            mana_cost: 40,
            priority: 4,
        },
        LegacyTask {
            id: "2".to_string(),
            title: "Solar Core Workout".to_string(),
            start_time: 12.0,
            duration: 1.0,
            task_type: TaskType::Health,
            mana_cost: 20,
            priority: 3,
        },
        LegacyTask {
            id: "3".to_string(),
            title: "Nebula Protocol Lunch".to_string(),
            start_time: 13.5,
            duration: 1.0,
            task_type: TaskType::Personal,
            mana_cost: -15,
            priority: 2,
        },
    ]
    .into_iter()
    .map(Task::from)
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn draft_derives_cost_and_priority() {
        let mut draft = TaskDraft::new("  Deep work ");
        draft.urgency = 4;
        draft.importance = 5;
        draft.energy_level = 2;

        let t = draft.into_task("task-1".into(), &TimeWindow::default()).unwrap();
        assert_eq!(t.title, "Deep work");
        assert_eq!(t.mana_cost, 20);
        // (5 + 4) / 2 = 4.5 rounds up.
        assert_eq!(t.priority, 5);
    }

    #[test]
    fn draft_rejects_bad_input() {
        let w = TimeWindow::default();
        assert_eq!(
            TaskDraft::new("   ").into_task("x".into(), &w),
            Err(ValidationError::EmptyTitle)
        );

        let mut d = TaskDraft::new("t");
        d.duration = 0.25;
        assert_eq!(d.into_task("x".into(), &w), Err(ValidationError::InvalidDuration(0.25)));

        let mut d = TaskDraft::new("t");
        d.duration = 1.2;
        assert!(matches!(d.into_task("x".into(), &w), Err(ValidationError::InvalidDuration(_))));

        let mut d = TaskDraft::new("t");
        d.energy_level = 6;
        assert_eq!(
            d.into_task("x".into(), &w),
            Err(ValidationError::MetricOutOfRange { field: "energyLevel", value: 6 })
        );
    }

    #[test]
    fn draft_start_is_clamped_to_window() {
        let mut d = TaskDraft::new("late");
        d.start_time = 23.5;
        let t = d.into_task("x".into(), &TimeWindow::new(7.0, 23.0)).unwrap();
        assert_eq!(t.start_time, 22.0);
    }

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a = Task::new("a", "a").with_start(9.0).with_duration(2.0);
        let b = Task::new("b", "b").with_start(11.0).with_duration(1.0);
        let c = Task::new("c", "c").with_start(10.0).with_duration(1.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn legacy_record_is_upgraded() {
        let json = r#"{"id":"3","title":"Lunch","startTime":13.5,"duration":1,"type":"Personal","manaCost":-15,"priority":2}"#;
        let rec: TaskRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(rec, TaskRecord::Legacy(_)));

        let t = Task::from(rec);
        assert_eq!(t.urgency, 2);
        assert_eq!(t.importance, 2);
        assert_eq!(t.energy_level, 1);
        assert_eq!(t.mana_cost, -15);
    }

    #[test]
    fn full_record_uses_wire_names() {
        let t = Task::new("task-1", "Audit").with_energy(4);
        let json = serde_json::to_string(&t).unwrap();
        assert!(json.contains("\"startTime\":9.0"));
        assert!(json.contains("\"energyLevel\":4"));
        assert!(json.contains("\"manaCost\":40"));
        assert!(json.contains("\"type\":\"Work\""));

        let rec: TaskRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(rec, TaskRecord::Full(t));
    }

    #[test]
    fn validate_rejects_what_the_form_would() {
        assert_eq!(Task::new("a", "ok").validate(), Ok(()));
        assert_eq!(
            Task::new("a", "ok").with_duration(0.0).validate(),
            Err(ValidationError::NonPositiveDuration(0.0))
        );
        assert_eq!(
            Task::new("a", "ok").with_duration(-2.0).validate(),
            Err(ValidationError::NonPositiveDuration(-2.0))
        );
        assert_eq!(Task::new("a", "  ").validate(), Err(ValidationError::EmptyTitle));
        assert_eq!(
            Task::new("a", "ok").with_urgency(9).validate(),
            Err(ValidationError::MetricOutOfRange { field: "urgency", value: 9 })
        );
        assert_eq!(
            Task::new("a", "ok").with_priority(0).validate(),
            Err(ValidationError::MetricOutOfRange { field: "priority", value: 0 })
        );
        // Off-step durations are fine outside the entry form.
        assert_eq!(Task::new("a", "ok").with_duration(0.75).validate(), Ok(()));
    }

    #[test]
    fn legacy_record_with_zero_duration_fails_validation() {
        let json = r#"{"id":"9","title":"Ghost","startTime":10,"duration":0,"type":"Work","manaCost":20,"priority":3}"#;
        let t = Task::from(serde_json::from_str::<TaskRecord>(json).unwrap());
        assert_eq!(t.validate(), Err(ValidationError::NonPositiveDuration(0.0)));
    }

    #[test]
    fn seed_tasks_are_conflict_free() {
        let seed = seed_tasks();
        assert_eq!(seed.len(), 3);
        assert!(seed.iter().all(|a| seed.iter().all(|b| a.id == b.id || !a.overlaps(b))));
        assert_eq!(seed[0].energy_level, 4);
        assert!(seed.iter().all(|t| t.validate().is_ok()));
    }
}
