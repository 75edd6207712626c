//! In-memory task store. Sole owner of the timeline; mutated by append,
//! remove, clear, or whole-collection replace.

use std::collections::HashSet;

use crate::config::TimeWindow;
use crate::error::ValidationError;
use crate::task::{Task, TaskDraft};

/// Id namespace for newly created tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    Task,
    Chaos,
}

impl IdKind {
    fn prefix(self) -> &'static str {
        match self {
            IdKind::Task => "task",
            IdKind::Chaos => "chaos",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    seq: u64,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks(tasks: Vec<Task>) -> Result<Self, ValidationError> {
        let mut store = Self::new();
        store.replace_all(tasks)?;
        Ok(store)
    }

    /// Allocate a fresh id. Sequence numbers are never handed out twice,
    /// even after the task is removed or the store cleared.
    pub fn next_id(&mut self, kind: IdKind) -> String {
        loop {
            self.seq += 1;
            let id = format!("{}-{}", kind.prefix(), self.seq);
            if self.get(&id).is_none() {
                return id;
            }
        }
    }

    /// Validate a draft and append it. On error nothing is stored.
    pub fn insert_draft(&mut self, draft: TaskDraft, window: &TimeWindow) -> Result<Task, ValidationError> {
        let id = self.next_id(IdKind::Task);
        let task = draft.into_task(id, window)?;
        self.tasks.push(task.clone());
        Ok(task)
    }

    pub fn push(&mut self, task: Task) -> Result<(), ValidationError> {
        task.validate()?;
        if self.get(&task.id).is_some() {
            return Err(ValidationError::DuplicateId(task.id));
        }
        self.tasks.push(task);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let idx = self.tasks.iter().position(|t| t.id == id)?;
        Some(self.tasks.remove(idx))
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    /// Replace the whole collection. Leaves the store untouched on error.
    pub fn replace_all(&mut self, tasks: Vec<Task>) -> Result<(), ValidationError> {
        let mut seen = HashSet::with_capacity(tasks.len());
        for t in &tasks {
            t.validate()?;
            if !seen.insert(t.id.as_str()) {
                return Err(ValidationError::DuplicateId(t.id.clone()));
            }
        }
        self.tasks = tasks;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks.clone()
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::seed_tasks;

    #[test]
    fn ids_are_never_reused() {
        let mut store = TaskStore::new();
        let w = TimeWindow::default();
        let a = store.insert_draft(TaskDraft::new("a"), &w).unwrap();
        store.remove(&a.id);
        store.clear();
        let b = store.insert_draft(TaskDraft::new("b"), &w).unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(b.id, "task-2");
        assert_eq!(store.next_id(IdKind::Chaos), "chaos-3");
    }

    #[test]
    fn invalid_draft_leaves_store_untouched() {
        let mut store = TaskStore::with_tasks(seed_tasks()).unwrap();
        let err = store.insert_draft(TaskDraft::new(""), &TimeWindow::default());
        assert_eq!(err, Err(ValidationError::EmptyTitle));
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn replace_all_rejects_duplicates_atomically() {
        let mut store = TaskStore::with_tasks(seed_tasks()).unwrap();
        let dup = vec![Task::new("x", "one"), Task::new("x", "two")];
        assert_eq!(store.replace_all(dup), Err(ValidationError::DuplicateId("x".into())));
        assert_eq!(store.snapshot(), seed_tasks());
    }

    #[test]
    fn malformed_tasks_never_enter_the_store() {
        let bad = Task::new("x", "").with_duration(-2.0).with_urgency(9);
        assert_eq!(
            TaskStore::with_tasks(vec![bad]).unwrap_err(),
            ValidationError::EmptyTitle
        );

        let mut store = TaskStore::with_tasks(seed_tasks()).unwrap();
        let zero = vec![Task::new("z", "zero").with_duration(0.0)];
        assert_eq!(store.replace_all(zero), Err(ValidationError::NonPositiveDuration(0.0)));
        assert_eq!(
            store.push(Task::new("y", "loud").with_importance(7)),
            Err(ValidationError::MetricOutOfRange { field: "importance", value: 7 })
        );
        assert_eq!(store.snapshot(), seed_tasks());
    }

    #[test]
    fn push_rejects_existing_id() {
        let mut store = TaskStore::with_tasks(seed_tasks()).unwrap();
        assert!(store.push(Task::new("1", "again")).is_err());
        assert!(store.push(Task::new("4", "new")).is_ok());
        assert_eq!(store.len(), 4);
    }
}
