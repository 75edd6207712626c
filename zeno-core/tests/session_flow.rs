//! End-to-end session flows: resolution through the local and remote paths,
//! the mana gate, and concurrent requests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::Notify;
use zeno_core::{
    CompletionBackend, CompletionRequest, EngineConfig, LocalResolver, LocalScheduler, PlayerStats,
    Resolution, ResolutionSource, ResolveError, ResolveOutcome, Resolver, Session, StrategyParams, Task,
    TaskDraft, resolve_strategy,
};

fn overlapping() -> Vec<Task> {
    vec![
        Task::new("1", "Reactor audit").with_start(9.0).with_duration(2.0).with_urgency(5),
        Task::new("2", "Standup").with_start(10.0).with_duration(1.0).with_urgency(1),
    ]
}

fn starts(tasks: &[Task]) -> Vec<(String, f64)> {
    let mut v: Vec<_> = tasks.iter().map(|t| (t.id.clone(), t.start_time)).collect();
    v.sort_by(|a, b| a.0.cmp(&b.0));
    v
}

struct Counting {
    calls: AtomicUsize,
    inner: LocalResolver,
}

#[async_trait]
impl Resolver for Counting {
    async fn resolve(&self, tasks: &[Task], params: &StrategyParams) -> Result<Resolution, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.resolve(tasks, params).await
    }

    fn name(&self) -> &'static str {
        "counting"
    }
}

/// Blocks until released, then resolves locally.
struct Gated {
    gate: Arc<Notify>,
    calls: AtomicUsize,
    inner: LocalResolver,
}

#[async_trait]
impl Resolver for Gated {
    async fn resolve(&self, tasks: &[Task], params: &StrategyParams) -> Result<Resolution, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.gate.notified().await;
        self.inner.resolve(tasks, params).await
    }

    fn name(&self) -> &'static str {
        "gated"
    }
}

/// Replies with only the first task it was sent.
struct Truncating;

#[async_trait]
impl CompletionBackend for Truncating {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let pool = request
            .prompt
            .split("Task Pool: ")
            .nth(1)
            .ok_or_else(|| anyhow::anyhow!("no task pool in prompt"))?;
        let tasks: Vec<Task> = serde_json::from_str(pool.trim())?;
        Ok(serde_json::to_string(&tasks[..1])?)
    }

    fn name(&self) -> &str {
        "truncating"
    }
}

/// Replies with a fixed body.
struct Canned(String);

#[async_trait]
impl CompletionBackend for Canned {
    async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<String> {
        Ok(self.0.clone())
    }

    fn name(&self) -> &str {
        "canned"
    }
}

struct Unreachable;

#[async_trait]
impl CompletionBackend for Unreachable {
    async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<String> {
        anyhow::bail!("connection refused")
    }

    fn name(&self) -> &str {
        "unreachable"
    }
}

#[tokio::test]
async fn urgency_keeps_the_urgent_task_and_shifts_the_other() {
    let session = Session::with_tasks(EngineConfig::default(), Arc::new(LocalResolver::default()), overlapping()).unwrap();
    assert_eq!(session.conflict_count(), 1);

    let out = session.resolve().await;
    assert!(matches!(out, ResolveOutcome::Resolved { source: ResolutionSource::Local, .. }));
    assert_eq!(starts(&session.tasks()), vec![("1".to_string(), 9.0), ("2".to_string(), 11.0)]);
    assert_eq!(session.conflict_count(), 0);
    assert_eq!(session.stress().percent, 0.0);

    let msgs: Vec<_> = session.drain_advisories().into_iter().map(|a| a.message).collect();
    assert_eq!(msgs, vec!["URGENCY Optimization Complete"]);
}

#[tokio::test]
async fn remote_count_mismatch_falls_back_to_local_layout() {
    let config = EngineConfig::default();
    let resolver = Session::remote_resolver(&config, Truncating);
    let session = Session::with_tasks(config.clone(), resolver, overlapping()).unwrap();

    let out = session.resolve().await;
    let ResolveOutcome::Resolved { source, fallback_reason, .. } = &out else {
        panic!("expected a resolution, got {out:?}");
    };
    assert_eq!(*source, ResolutionSource::Local);
    assert_eq!(fallback_reason.as_deref(), Some("expected 2 tasks, remote returned 1"));

    let expected = LocalScheduler::new(config.window).resolve(&overlapping(), &resolve_strategy("urgency"));
    assert_eq!(session.tasks(), expected.tasks);
    assert_eq!(session.conflict_count(), 0);
}

#[tokio::test]
async fn remote_starts_before_the_open_fall_back_to_local_layout() {
    let config = EngineConfig::default();
    // Conflict-free and the right shape, but the day opens at 07:00.
    let reply = r#"[
        {"id":"1","title":"Reactor audit","startTime":1.0,"duration":2.0,"type":"Work",
         "urgency":5,"importance":3,"energyLevel":3,"manaCost":30,"priority":4},
        {"id":"2","title":"Standup","startTime":3.0,"duration":1.0,"type":"Work",
         "urgency":1,"importance":3,"energyLevel":3,"manaCost":30,"priority":2}
    ]"#;
    let resolver = Session::remote_resolver(&config, Canned(reply.to_string()));
    let session = Session::with_tasks(config.clone(), resolver, overlapping()).unwrap();

    let out = session.resolve().await;
    let ResolveOutcome::Resolved { source, fallback_reason, .. } = &out else {
        panic!("expected a resolution, got {out:?}");
    };
    assert_eq!(*source, ResolutionSource::Local);
    assert!(fallback_reason.as_deref().is_some_and(|r| r.contains("outside the 7..23 window")));

    let expected = LocalScheduler::new(config.window).resolve(&overlapping(), &resolve_strategy("urgency"));
    assert_eq!(session.tasks(), expected.tasks);
    assert!(session.tasks().iter().all(|t| t.start_time >= config.window.open));
}

#[tokio::test]
async fn transport_failure_is_invisible_apart_from_an_advisory() {
    let config = EngineConfig::default();
    let resolver = Session::remote_resolver(&config, Unreachable);
    let session = Session::with_tasks(config, resolver, overlapping()).unwrap();

    assert!(matches!(session.resolve().await, ResolveOutcome::Resolved { .. }));
    assert_eq!(session.conflict_count(), 0);
    assert!(session
        .drain_advisories()
        .iter()
        .any(|a| a.message.contains("local resolver engaged")));
}

#[tokio::test]
async fn low_mana_refuses_without_calling_the_resolver() {
    let resolver = Arc::new(Counting {
        calls: AtomicUsize::new(0),
        inner: LocalResolver::default(),
    });
    let session = Session::with_tasks(EngineConfig::default(), resolver.clone(), overlapping())
        .unwrap()
        .with_stats(PlayerStats {
            mana: 10,
            ..PlayerStats::default()
        });

    let out = session.resolve().await;
    assert_eq!(out, ResolveOutcome::InsufficientMana { mana: 10, required: 20 });
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 0);
    assert_eq!(session.tasks(), overlapping());
    assert_eq!(session.stats().mana, 10);

    let adv = session.drain_advisories();
    assert_eq!(adv.len(), 1);
    assert_eq!(adv[0].message, "Insufficient Mana! Meditate to recover.");

    assert!(session.recharge());
    assert!(matches!(session.resolve().await, ResolveOutcome::Resolved { .. }));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn concurrent_request_is_ignored_and_pending_result_wins() {
    let gate = Arc::new(Notify::new());
    let resolver = Arc::new(Gated {
        gate: gate.clone(),
        calls: AtomicUsize::new(0),
        inner: LocalResolver::default(),
    });
    let session = Arc::new(Session::with_tasks(EngineConfig::default(), resolver.clone(), overlapping()).unwrap());

    let pending = tokio::spawn({
        let session = session.clone();
        async move { session.resolve().await }
    });
    while resolver.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert!(session.is_resolving());
    assert_eq!(session.resolve().await, ResolveOutcome::AlreadyInFlight);

    // Accepted now, overwritten when the pending result lands.
    session.add_task(TaskDraft::new("Late edit")).unwrap();
    assert_eq!(session.tasks().len(), 3);

    gate.notify_one();
    let out = pending.await.unwrap();
    assert!(matches!(out, ResolveOutcome::Resolved { .. }));
    assert_eq!(resolver.calls.load(Ordering::SeqCst), 1);
    assert_eq!(starts(&session.tasks()), vec![("1".to_string(), 9.0), ("2".to_string(), 11.0)]);
    assert!(!session.is_resolving());
    assert_eq!(session.stats().mana, 60);
}

#[tokio::test]
async fn stress_tracks_forward_conflicts() {
    let tasks = vec![
        Task::new("a", "block a").with_start(9.0).with_duration(2.0),
        Task::new("b", "block b").with_start(10.0).with_duration(1.0),
        Task::new("c", "block c").with_start(10.5).with_duration(1.0),
        Task::new("d", "block d").with_start(15.0).with_duration(1.0),
    ];
    let session = Session::with_tasks(EngineConfig::default(), Arc::new(LocalResolver::default()), tasks).unwrap();
    assert_eq!(session.conflict_count(), 2);
    assert_eq!(session.stress().percent, 40.0);

    session.resolve().await;
    assert_eq!(session.conflict_count(), 0);
}
