use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use zeno_core::{Task, TaskRecord};

pub fn zeno_home() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".zeno"))
}

pub fn ensure_zeno_home() -> Result<PathBuf> {
    let dir = zeno_home()?;
    fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    Ok(dir)
}

/// Parse a JSON task list. Accepts the current schema and the older
/// priority/mana-only one, mixed freely. Every task is validated.
pub fn parse_tasks(json: &str) -> Result<Vec<Task>> {
    let records: Vec<TaskRecord> = serde_json::from_str(json).context("parse task list")?;
    records
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let task = Task::from(r);
            task.validate()
                .with_context(|| format!("task #{} ({})", i + 1, task.id))?;
            Ok(task)
        })
        .collect()
}

pub fn read_tasks(path: &Path) -> Result<Vec<Task>> {
    let s = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_tasks(&s).with_context(|| format!("in {}", path.display()))
}
