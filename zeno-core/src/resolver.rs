//! Resolver capability: a local, total implementation and a fallback
//! combinator that substitutes it for a failing primary.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ResolveError;
use crate::scheduler::{LocalScheduler, Schedule};
use crate::strategy::StrategyParams;
use crate::task::Task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionSource {
    Remote,
    Local,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub schedule: Schedule,
    pub source: ResolutionSource,
    /// Why the primary resolver was bypassed, if it was.
    pub fallback_reason: Option<String>,
}

impl Resolution {
    pub fn local(schedule: Schedule) -> Self {
        Self {
            schedule,
            source: ResolutionSource::Local,
            fallback_reason: None,
        }
    }

    pub fn tasks(&self) -> &[Task] {
        &self.schedule.tasks
    }
}

#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, tasks: &[Task], params: &StrategyParams) -> Result<Resolution, ResolveError>;

    fn name(&self) -> &'static str;
}

#[async_trait]
impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    async fn resolve(&self, tasks: &[Task], params: &StrategyParams) -> Result<Resolution, ResolveError> {
        (**self).resolve(tasks, params).await
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Pure, in-process resolver. Never fails.
#[derive(Debug, Clone, Default)]
pub struct LocalResolver {
    scheduler: LocalScheduler,
}

impl LocalResolver {
    pub fn new(scheduler: LocalScheduler) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl Resolver for LocalResolver {
    async fn resolve(&self, tasks: &[Task], params: &StrategyParams) -> Result<Resolution, ResolveError> {
        Ok(Resolution::local(self.scheduler.resolve(tasks, params)))
    }

    fn name(&self) -> &'static str {
        "local"
    }
}

/// Tries `primary`; on any error hands the same input to `secondary`.
pub struct FallbackResolver<P, S> {
    primary: P,
    secondary: S,
}

impl<P: Resolver, S: Resolver> FallbackResolver<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl<P: Resolver, S: Resolver> Resolver for FallbackResolver<P, S> {
    async fn resolve(&self, tasks: &[Task], params: &StrategyParams) -> Result<Resolution, ResolveError> {
        match self.primary.resolve(tasks, params).await {
            Ok(res) => Ok(res),
            Err(e) => {
                warn!(
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    error = %e,
                    "primary resolver failed; falling back"
                );
                let mut res = self.secondary.resolve(tasks, params).await?;
                res.fallback_reason = Some(e.to_string());
                info!(tasks = res.tasks().len(), "fallback resolution complete");
                Ok(res)
            }
        }
    }

    fn name(&self) -> &'static str {
        "fallback"
    }
}
