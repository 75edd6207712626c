//! Remote resolution adapter.
//!
//! Wraps an external text-completion service behind [`Resolver`]: builds the
//! instruction, asks for a schema-constrained JSON array, then validates the
//! reply strictly. Any failure surfaces as a [`ResolveError`] so a
//! [`crate::resolver::FallbackResolver`] can take over.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::config::TimeWindow;
use crate::conflict::conflict_pairs;
use crate::error::ResolveError;
use crate::resolver::{Resolution, ResolutionSource, Resolver};
use crate::scheduler::Schedule;
use crate::strategy::StrategyParams;
use crate::task::Task;
use crate::timeline::format_clock;

/// Tolerance when comparing durations echoed back by the remote.
const DURATION_EPSILON: f64 = 1e-6;

static FENCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^```(?:json)?\s*(.*?)\s*```$").expect("fence pattern compiles"));

/// The fields read back from a remote reply. Everything else the model echoes
/// is ignored, so `"urgency": 5.0` and `"urgency": 5` are equally fine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSlot {
    pub id: String,
    pub start_time: f64,
    pub duration: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub prompt: String,
    /// OpenAPI-style schema the response must follow.
    pub response_schema: Value,
}

/// A text-completion service. Implementations own transport and auth.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String>;

    fn name(&self) -> &str;
}

#[async_trait]
impl<B: CompletionBackend + ?Sized> CompletionBackend for Arc<B> {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        (**self).complete(request).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Schema for an array of tasks with every field required.
pub fn task_array_schema() -> Value {
    json!({
        "type": "ARRAY",
        "items": {
            "type": "OBJECT",
            "properties": {
                "id": { "type": "STRING" },
                "title": { "type": "STRING" },
                "startTime": { "type": "NUMBER" },
                "duration": { "type": "NUMBER" },
                "type": { "type": "STRING" },
                "urgency": { "type": "INTEGER" },
                "importance": { "type": "INTEGER" },
                "energyLevel": { "type": "INTEGER" },
                "manaCost": { "type": "INTEGER" },
                "priority": { "type": "INTEGER" }
            },
            "required": [
                "id", "title", "startTime", "duration", "type",
                "urgency", "importance", "energyLevel", "manaCost", "priority"
            ]
        }
    })
}

pub fn build_prompt(tasks: &[Task], params: &StrategyParams, window: &TimeWindow) -> anyhow::Result<String> {
    let pool = serde_json::to_string(tasks)?;
    Ok(format!(
        "You are ZENO, an advanced AI Time Bender in a sci-fi universe.\n\
         You have a list of tasks with scheduling conflicts (overlaps).\n\
         \n\
         {description}\n\
         \n\
         General Rules:\n\
         1. Resolve all overlaps. No two tasks can happen at the same time.\n\
         2. Respect the individual Task Metrics (Urgency, Importance, Energy Level).\n\
         3. Keep durations EXACTLY the same.\n\
         4. Valid time window: {open} to {close}.\n\
         5. Return a valid JSON array of ALL tasks with updated 'startTime' values.\n\
         \n\
         Task Pool: {pool}\n",
        description = params.description,
        open = format_clock(window.open),
        close = format_clock(window.close),
    ))
}

/// Parse a remote reply into slots. Tolerates a surrounding Markdown fence.
pub fn parse_remote_tasks(text: &str) -> Result<Vec<RemoteSlot>, ResolveError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ResolveError::EmptyResponse);
    }
    let body = FENCE_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    serde_json::from_str(body).map_err(|e| ResolveError::Malformed(e.to_string()))
}

/// Check a remote reply against what was sent and merge its start times
/// onto the original tasks. Only `start_time` is taken from the remote, and
/// it must fall inside `window`.
pub fn validate_remote(
    sent: &[Task],
    returned: Vec<RemoteSlot>,
    window: &TimeWindow,
) -> Result<Vec<Task>, ResolveError> {
    if returned.len() != sent.len() {
        return Err(ResolveError::CountMismatch {
            expected: sent.len(),
            actual: returned.len(),
        });
    }

    let originals: HashMap<&str, &Task> = sent.iter().map(|t| (t.id.as_str(), t)).collect();
    let mut seen = HashSet::with_capacity(returned.len());
    let mut merged = Vec::with_capacity(returned.len());

    for r in returned {
        let Some(orig) = originals.get(r.id.as_str()) else {
            return Err(ResolveError::UnknownId(r.id));
        };
        if !seen.insert(r.id.clone()) {
            return Err(ResolveError::DuplicateId(r.id));
        }
        if (r.duration - orig.duration).abs() > DURATION_EPSILON {
            return Err(ResolveError::DurationChanged {
                id: r.id,
                before: orig.duration,
                after: r.duration,
            });
        }
        if !r.start_time.is_finite() {
            return Err(ResolveError::Malformed(format!("non-finite startTime for {}", r.id)));
        }
        if r.start_time < window.open || r.start_time >= window.close {
            return Err(ResolveError::OutOfWindow {
                id: r.id,
                start: r.start_time,
                open: window.open,
                close: window.close,
            });
        }

        let mut t = (*orig).clone();
        t.start_time = r.start_time;
        merged.push(t);
    }

    let remaining = conflict_pairs(&merged).len();
    if remaining > 0 {
        return Err(ResolveError::Unresolved(remaining));
    }
    Ok(merged)
}

pub struct RemoteResolver<B> {
    backend: B,
    window: TimeWindow,
    timeout: Duration,
}

impl<B: CompletionBackend> RemoteResolver<B> {
    pub fn new(backend: B, window: TimeWindow, timeout: Duration) -> Self {
        Self {
            backend,
            window,
            timeout,
        }
    }
}

#[async_trait]
impl<B: CompletionBackend> Resolver for RemoteResolver<B> {
    async fn resolve(&self, tasks: &[Task], params: &StrategyParams) -> Result<Resolution, ResolveError> {
        let request = CompletionRequest {
            prompt: build_prompt(tasks, params, &self.window)
                .map_err(|e| ResolveError::Malformed(e.to_string()))?,
            response_schema: task_array_schema(),
        };

        debug!(backend = self.backend.name(), tasks = tasks.len(), rule = %params.rule, "remote resolution requested");
        let text = tokio::time::timeout(self.timeout, self.backend.complete(&request))
            .await
            .map_err(|_| ResolveError::Timeout(self.timeout))?
            .map_err(|e| ResolveError::Transport(format!("{e:#}")))?;

        let returned = parse_remote_tasks(&text)?;
        let merged = validate_remote(tasks, returned, &self.window)?;
        info!(backend = self.backend.name(), tasks = merged.len(), "remote resolution accepted");

        Ok(Resolution {
            schedule: Schedule::from_tasks(merged, &self.window),
            source: ResolutionSource::Remote,
            fallback_reason: None,
        })
    }

    fn name(&self) -> &'static str {
        "remote"
    }
}
