use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use storefront_core_types::{Clock, TokioClock};
use storefront_event_bus::{NullObserver, SyncObserver};

use crate::errors::ElementWaitError;
use crate::model::{CardinalityContract, StabilizationResult};
use crate::policy::StabilizerPolicy;
use crate::ports::LiveQuery;
use crate::runner::{execute, RuntimeDeps};

#[async_trait]
pub trait ElementStabilizer: Send + Sync {
    /// Wait until `query` satisfies `contract` and every match is visible.
    async fn wait(
        &self,
        query: &dyn LiveQuery,
        contract: CardinalityContract,
        timeout: Duration,
    ) -> Result<StabilizationResult, ElementWaitError>;

    fn policy(&self) -> &StabilizerPolicy;

    fn clock(&self) -> Arc<dyn Clock>;

    /// `wait` with the policy's default timeout.
    async fn wait_default(
        &self,
        query: &dyn LiveQuery,
        contract: CardinalityContract,
    ) -> Result<StabilizationResult, ElementWaitError> {
        let timeout = self.policy().default_timeout();
        self.wait(query, contract, timeout).await
    }
}

pub struct StabilizerBuilder {
    policy: StabilizerPolicy,
    clock: Option<Arc<dyn Clock>>,
    observer: Option<Arc<dyn SyncObserver>>,
}

impl StabilizerBuilder {
    pub fn new(policy: StabilizerPolicy) -> Self {
        Self {
            policy,
            clock: None,
            observer: None,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Arc<dyn ElementStabilizer> {
        Arc::new(StabilizerImpl {
            policy: self.policy,
            clock: self.clock.unwrap_or_else(|| Arc::new(TokioClock)),
            observer: self.observer.unwrap_or_else(|| Arc::new(NullObserver)),
        })
    }
}

impl Default for StabilizerBuilder {
    fn default() -> Self {
        Self::new(StabilizerPolicy::default())
    }
}

pub struct StabilizerImpl {
    policy: StabilizerPolicy,
    clock: Arc<dyn Clock>,
    observer: Arc<dyn SyncObserver>,
}

#[async_trait]
impl ElementStabilizer for StabilizerImpl {
    async fn wait(
        &self,
        query: &dyn LiveQuery,
        contract: CardinalityContract,
        timeout: Duration,
    ) -> Result<StabilizationResult, ElementWaitError> {
        let deps = RuntimeDeps {
            clock: self.clock.as_ref(),
            observer: self.observer.as_ref(),
            policy: &self.policy,
        };
        execute(query, contract, timeout, deps).await
    }

    fn policy(&self) -> &StabilizerPolicy {
        &self.policy
    }

    fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }
}
