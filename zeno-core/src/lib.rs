//! zeno-core: Conflict detection and resolution engine for the ZENO scheduler

pub mod chaos;
pub mod config;
pub mod conflict;
pub mod error;
pub mod remote;
pub mod resolver;
pub mod scheduler;
pub mod session;
pub mod stats;
pub mod store;
pub mod strategy;
pub mod task;
pub mod timeline;

pub use chaos::{CHAOS_CATALOG, ChaosTemplate, RandomSource, RngSource, ScriptedSource, inject_chaos};
pub use config::{EngineConfig, TimeWindow};
pub use conflict::{conflict_count, conflict_pairs, has_conflict, is_conflict_free};
pub use error::{ResolveError, ValidationError};
pub use remote::{CompletionBackend, CompletionRequest, RemoteResolver};
pub use resolver::{FallbackResolver, LocalResolver, Resolution, ResolutionSource, Resolver};
pub use scheduler::{LocalScheduler, Schedule};
pub use session::{Advisory, ResolveOutcome, Session};
pub use stats::{PlayerStats, StatEvent, apply_event};
pub use store::{IdKind, TaskStore};
pub use strategy::{OrderPolicy, PlacementPolicy, PriorityRule, StrategyParams, resolve_strategy};
pub use task::{LegacyTask, Task, TaskDraft, TaskRecord, TaskType, seed_tasks};
pub use timeline::{StressReading, StressStatus, TimelineEntry, format_clock, format_range, timeline_view};
