//! Session orchestrator: owns the task store and stats ledger, gates and
//! runs resolution, and queues advisories for the display layer.
//!
//! All methods take `&self`. State lives behind a mutex that is never held
//! across the resolver await, so edits made while a resolution is pending are
//! accepted and then overwritten by its result (last writer wins).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::chaos::{CHAOS_CATALOG, RandomSource, inject_chaos};
use crate::config::EngineConfig;
use crate::conflict::conflict_count;
use crate::error::{ResolveError, ValidationError};
use crate::remote::{CompletionBackend, RemoteResolver};
use crate::resolver::{FallbackResolver, LocalResolver, ResolutionSource, Resolver};
use crate::scheduler::LocalScheduler;
use crate::stats::{PlayerStats, STAT_MAX, StatEvent, apply_event};
use crate::store::{IdKind, TaskStore};
use crate::strategy::{PriorityRule, StrategyParams};
use crate::task::{Task, TaskDraft, seed_tasks};
use crate::timeline::{StressReading, TimelineEntry, format_clock, timeline_view};

/// Toast-style, non-blocking notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Advisory {
    pub message: String,
    pub xp: i32,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    Resolved {
        rule: PriorityRule,
        source: ResolutionSource,
        fallback_reason: Option<String>,
        overflow: Vec<String>,
    },
    /// Another resolution is pending; this request was a no-op.
    AlreadyInFlight,
    /// Pre-flight refusal; nothing was called or changed.
    InsufficientMana { mana: i32, required: i32 },
    /// Resolver error with no fallback in place; tasks left as they were.
    Failed(ResolveError),
}

#[derive(Debug)]
struct SessionState {
    store: TaskStore,
    stats: PlayerStats,
    rule: PriorityRule,
    advisories: Vec<Advisory>,
}

impl SessionState {
    fn record(&mut self, event: StatEvent) {
        self.stats = apply_event(self.stats, &event);
        self.advise(event.message(), event.xp());
    }

    fn advise(&mut self, message: impl Into<String>, xp: i32) {
        self.advisories.push(Advisory {
            message: message.into(),
            xp,
            at: Utc::now(),
        });
    }
}

/// Clears the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct Session {
    state: Mutex<SessionState>,
    resolver: Arc<dyn Resolver>,
    config: EngineConfig,
    resolving: AtomicBool,
}

impl Session {
    /// A session on the starter timeline.
    pub fn new(config: EngineConfig, resolver: Arc<dyn Resolver>) -> Self {
        let store = TaskStore::with_tasks(seed_tasks()).unwrap_or_default();
        Self::from_store(config, resolver, store)
    }

    pub fn with_tasks(
        config: EngineConfig,
        resolver: Arc<dyn Resolver>,
        tasks: Vec<Task>,
    ) -> Result<Self, ValidationError> {
        let store = TaskStore::with_tasks(tasks)?;
        Ok(Self::from_store(config, resolver, store))
    }

    /// Local scheduler only; never touches the network.
    pub fn offline(config: EngineConfig) -> Self {
        let local = LocalResolver::new(LocalScheduler::new(config.window));
        Self::new(config, Arc::new(local))
    }

    /// Remote resolution through `backend`, falling back to the local scheduler.
    pub fn remote_resolver<B>(config: &EngineConfig, backend: B) -> Arc<dyn Resolver>
    where
        B: CompletionBackend + 'static,
    {
        let remote = RemoteResolver::new(backend, config.window, config.remote_timeout);
        let local = LocalResolver::new(LocalScheduler::new(config.window));
        Arc::new(FallbackResolver::new(remote, local))
    }

    fn from_store(config: EngineConfig, resolver: Arc<dyn Resolver>, store: TaskStore) -> Self {
        let rule = PriorityRule::from_id(&config.default_rule);
        Self {
            state: Mutex::new(SessionState {
                store,
                stats: PlayerStats::default(),
                rule,
                advisories: Vec::new(),
            }),
            resolver,
            config,
            resolving: AtomicBool::new(false),
        }
    }

    pub fn with_stats(mut self, stats: PlayerStats) -> Self {
        self.state.get_mut().unwrap_or_else(PoisonError::into_inner).stats = stats;
        self
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn add_task(&self, draft: TaskDraft) -> Result<Task, ValidationError> {
        let mut st = self.state();
        let task = st.store.insert_draft(draft, &self.config.window)?;
        debug!(id = %task.id, start = task.start_time, "task added");
        st.record(StatEvent::TaskAdded);
        Ok(task)
    }

    pub fn inject_chaos(&self, rng: &mut dyn RandomSource) -> Option<Task> {
        let mut st = self.state();
        let id = st.store.next_id(IdKind::Chaos);
        let task = inject_chaos(st.store.tasks(), CHAOS_CATALOG, rng, id)?;
        st.store.push(task.clone()).ok()?;
        debug!(id = %task.id, start = task.start_time, title = %task.title, "chaos injected");
        st.record(StatEvent::ChaosInjected);
        Some(task)
    }

    pub fn remove_task(&self, id: &str) -> Option<Task> {
        self.state().store.remove(id)
    }

    pub fn clear(&self) {
        let mut st = self.state();
        st.store.clear();
        st.record(StatEvent::TimelineCleared);
    }

    pub fn select_rule(&self, rule_id: &str) -> PriorityRule {
        let rule = PriorityRule::from_id(rule_id);
        self.state().rule = rule;
        rule
    }

    /// Restore mana. Refused (with an advisory) when the pool is full.
    pub fn recharge(&self) -> bool {
        let mut st = self.state();
        if st.stats.mana >= STAT_MAX {
            st.record(StatEvent::RechargeRefused);
            return false;
        }
        st.record(StatEvent::Recharged);
        true
    }

    pub fn is_resolving(&self) -> bool {
        self.resolving.load(Ordering::Acquire)
    }

    pub async fn resolve(&self) -> ResolveOutcome {
        let Some(_guard) = InFlightGuard::acquire(&self.resolving) else {
            debug!("resolution already in flight; ignoring request");
            return ResolveOutcome::AlreadyInFlight;
        };

        let (snapshot, params) = {
            let mut st = self.state();
            if st.stats.mana < self.config.mana_threshold {
                let mana = st.stats.mana;
                st.record(StatEvent::ResolutionRefused);
                info!(mana, required = self.config.mana_threshold, "resolution refused");
                return ResolveOutcome::InsufficientMana {
                    mana,
                    required: self.config.mana_threshold,
                };
            }
            (st.store.snapshot(), StrategyParams::for_rule(st.rule))
        };

        let result = self.resolver.resolve(&snapshot, &params).await;

        let mut st = self.state();
        let res = match result {
            Ok(res) => res,
            Err(e) => {
                warn!(error = %e, resolver = self.resolver.name(), "resolution failed");
                st.advise("Resolution Matrix Failure", 0);
                return ResolveOutcome::Failed(e);
            }
        };

        let overflow = res.schedule.overflow.clone();
        if let Err(e) = st.store.replace_all(res.schedule.tasks) {
            warn!(error = %e, "resolver output rejected by the store");
            st.advise("Resolution Matrix Failure", 0);
            return ResolveOutcome::Failed(match e {
                ValidationError::DuplicateId(id) => ResolveError::DuplicateId(id),
                other => ResolveError::Malformed(other.to_string()),
            });
        }

        st.record(StatEvent::ResolutionExecuted { rule: params.rule });
        if res.fallback_reason.is_some() {
            st.advise("Remote link unstable; local resolver engaged", 0);
        }
        if !overflow.is_empty() {
            st.advise(
                format!(
                    "{} node(s) overflow past {}",
                    overflow.len(),
                    format_clock(self.config.window.close)
                ),
                0,
            );
        }
        info!(
            rule = %params.rule,
            source = ?res.source,
            overflow = overflow.len(),
            "resolution applied"
        );

        ResolveOutcome::Resolved {
            rule: params.rule,
            source: res.source,
            fallback_reason: res.fallback_reason,
            overflow,
        }
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state().store.snapshot()
    }

    pub fn timeline(&self) -> Vec<TimelineEntry> {
        timeline_view(self.state().store.tasks())
    }

    pub fn conflict_count(&self) -> usize {
        conflict_count(self.state().store.tasks())
    }

    pub fn stress(&self) -> StressReading {
        StressReading::of(self.state().store.tasks())
    }

    pub fn stats(&self) -> PlayerStats {
        self.state().stats
    }

    pub fn rule(&self) -> PriorityRule {
        self.state().rule
    }

    pub fn drain_advisories(&self) -> Vec<Advisory> {
        std::mem::take(&mut self.state().advisories)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chaos::ScriptedSource;

    #[test]
    fn add_task_records_xp_and_advisory() {
        let s = Session::offline(EngineConfig::default());
        let t = s.add_task(TaskDraft::new("Deep work")).unwrap();
        assert_eq!(t.id, "task-1");
        assert_eq!(s.tasks().len(), 4);
        assert_eq!(s.stats().xp, 300);

        let adv = s.drain_advisories();
        assert_eq!(adv.len(), 1);
        assert_eq!(adv[0].message, "New Timeline Node Anchored");
        assert!(s.drain_advisories().is_empty());
    }

    #[test]
    fn invalid_task_changes_nothing() {
        let s = Session::offline(EngineConfig::default());
        assert!(s.add_task(TaskDraft::new("")).is_err());
        assert_eq!(s.tasks().len(), 3);
        assert_eq!(s.stats(), PlayerStats::default());
        assert!(s.drain_advisories().is_empty());
    }

    #[test]
    fn with_tasks_rejects_malformed_input() {
        let bad = Task::new("1", "").with_duration(-2.0).with_urgency(9);
        let err = Session::with_tasks(
            EngineConfig::default(),
            Arc::new(LocalResolver::default()),
            vec![bad],
        )
        .err();
        assert_eq!(err, Some(ValidationError::EmptyTitle));
    }

    #[test]
    fn chaos_raises_conflict_count() {
        let s = Session::offline(EngineConfig::default());
        assert_eq!(s.conflict_count(), 0);
        let t = s.inject_chaos(&mut ScriptedSource::new(vec![0, 0])).unwrap();
        assert_eq!(t.id, "chaos-1");
        assert_eq!(s.conflict_count(), 1);
        assert_eq!(s.stats().xp, 325);
    }

    #[test]
    fn recharge_refused_at_full_mana() {
        let s = Session::offline(EngineConfig::default());
        assert!(s.recharge());
        assert_eq!(s.stats().mana, 100);
        assert!(!s.recharge());
        let msgs: Vec<_> = s.drain_advisories().into_iter().map(|a| a.message).collect();
        assert_eq!(msgs, vec!["Meditating... Mana Restored", "Energy Pool at Maximum"]);
    }

    #[test]
    fn unknown_rule_selects_balanced() {
        let s = Session::offline(EngineConfig::default());
        assert_eq!(s.rule(), PriorityRule::Urgency);
        assert_eq!(s.select_rule("whatever"), PriorityRule::Balanced);
    }

    #[tokio::test]
    async fn offline_resolution_clears_conflicts() {
        let s = Session::offline(EngineConfig::default());
        s.inject_chaos(&mut ScriptedSource::new(vec![1, 0])).unwrap();
        assert!(s.conflict_count() > 0);

        let out = s.resolve().await;
        assert!(matches!(out, ResolveOutcome::Resolved { source: ResolutionSource::Local, .. }));
        assert_eq!(s.conflict_count(), 0);
        assert_eq!(s.stats().mana, 60);
        assert!(!s.is_resolving());
    }

    #[tokio::test]
    async fn clear_then_resolve_is_harmless() {
        let s = Session::offline(EngineConfig::default());
        s.clear();
        let out = s.resolve().await;
        assert!(matches!(out, ResolveOutcome::Resolved { .. }));
        assert!(s.tasks().is_empty());
    }
}
