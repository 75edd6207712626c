//! Error taxonomy for task entry and conflict resolution.

use thiserror::Error;

/// Rejections raised before anything enters the task store.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("title must be non-empty")]
    EmptyTitle,
    #[error("duration must be a positive multiple of 0.5h, got {0}")]
    InvalidDuration(f64),
    #[error("duration must be positive, got {0}")]
    NonPositiveDuration(f64),
    #[error("start time must be a finite hour, got {0}")]
    InvalidStart(f64),
    #[error("{field} must be in 1..=5, got {value}")]
    MetricOutOfRange { field: &'static str, value: i32 },
    #[error("duplicate task id: {0}")]
    DuplicateId(String),
}

/// Failures of a resolver. The session only ever surfaces these as advisories.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolveError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote call timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("remote returned an empty response")]
    EmptyResponse,
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("expected {expected} tasks, remote returned {actual}")]
    CountMismatch { expected: usize, actual: usize },
    #[error("remote returned unknown task id: {0}")]
    UnknownId(String),
    #[error("remote returned task id twice: {0}")]
    DuplicateId(String),
    #[error("remote placed {id} at {start}, outside the {open}..{close} window")]
    OutOfWindow { id: String, start: f64, open: f64, close: f64 },
    #[error("remote changed duration of {id}: {before} -> {after}")]
    DurationChanged { id: String, before: f64, after: f64 },
    #[error("remote schedule still has {0} conflicting pairs")]
    Unresolved(usize),
    #[error("resolver unavailable: {0}")]
    Unavailable(String),
}
