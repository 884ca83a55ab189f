use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use storefront_core_types::{Clock, WaitId};
use storefront_event_bus::{SyncEvent, SyncObserver};
use tracing::{debug, instrument};

use crate::errors::{ElementWaitError, WaitCause};
use crate::model::{CardinalityContract, ElementState, StabilizationResult, StateWait};
use crate::policy::StabilizerPolicy;
use crate::ports::{ElementHandle, LiveQuery};

pub struct RuntimeDeps<'a> {
    pub clock: &'a dyn Clock,
    pub observer: &'a dyn SyncObserver,
    pub policy: &'a StabilizerPolicy,
}

#[instrument(skip_all, fields(query = %query.describe(), expected = %contract))]
pub async fn execute(
    query: &dyn LiveQuery,
    contract: CardinalityContract,
    timeout: Duration,
    deps: RuntimeDeps<'_>,
) -> Result<StabilizationResult, ElementWaitError> {
    let wait = WaitId::new();
    let started = deps.clock.now();
    deps.observer.observe(SyncEvent::WaitStarted {
        wait: wait.clone(),
        query: query.describe(),
        expected: contract.to_string(),
        timeout_ms: millis(timeout),
    });

    let mut run = WaitRun {
        wait: wait.clone(),
        query,
        contract,
        timeout,
        started,
        deadline: started + timeout,
        samples: 0,
        deps: &deps,
    };

    match run.resolve().await {
        Ok(elements) => {
            let elapsed = deps.clock.since(started);
            deps.observer.observe(SyncEvent::WaitCompleted {
                wait,
                count: elements.len(),
                elapsed_ms: millis(elapsed),
            });
            Ok(StabilizationResult::new(elements, elapsed, run.samples))
        }
        Err(cause) => {
            // Diagnostic re-query; its own failure must not mask the cause.
            let found = match query.count().await {
                Ok(count) => Some(count),
                Err(err) => {
                    debug!("diagnostic count failed: {}", err);
                    None
                }
            };
            let cause = match cause {
                WaitCause::VisibilityTimeout { expected, .. } => {
                    WaitCause::VisibilityTimeout { expected, found }
                }
                other => other,
            };
            deps.observer.observe(SyncEvent::WaitFailed {
                wait,
                reason: cause.to_string(),
                elapsed_ms: millis(deps.clock.since(started)),
            });
            Err(ElementWaitError::new(
                query.describe(),
                contract,
                found,
                cause,
            ))
        }
    }
}

struct WaitRun<'a> {
    wait: WaitId,
    query: &'a dyn LiveQuery,
    contract: CardinalityContract,
    timeout: Duration,
    started: Instant,
    deadline: Instant,
    samples: u32,
    deps: &'a RuntimeDeps<'a>,
}

impl<'a> WaitRun<'a> {
    async fn resolve(&mut self) -> Result<Vec<Arc<dyn ElementHandle>>, WaitCause> {
        if !self.await_attachment().await? {
            if self.contract.accepts_empty() {
                debug!("nothing attached; empty result accepted by {}", self.contract);
                return Ok(Vec::new());
            }
            return Err(WaitCause::NoAttachment);
        }

        let snapshot = if self.contract.is_stabilize() {
            self.settle_count().await?
        } else {
            self.await_bounds().await?
        };

        self.await_visible(&snapshot).await?;
        Ok(snapshot)
    }

    async fn await_attachment(&mut self) -> Result<bool, WaitCause> {
        let first = self.query.first().await?;
        match first
            .wait_for_state(ElementState::Attached, self.remaining())
            .await?
        {
            StateWait::Reached => {
                self.deps.observer.observe(SyncEvent::Attached {
                    wait: self.wait.clone(),
                    elapsed_ms: millis(self.elapsed()),
                });
                Ok(true)
            }
            StateWait::TimedOut => Ok(false),
        }
    }

    /// Poll until two consecutive samples agree, then snapshot.
    async fn settle_count(&mut self) -> Result<Vec<Arc<dyn ElementHandle>>, WaitCause> {
        let mut previous: Option<usize> = None;
        loop {
            if self.deps.clock.now() >= self.deadline {
                return Err(WaitCause::StabilizationTimeout { found: previous });
            }
            let current = self.sample().await?;
            if previous == Some(current) {
                self.deps.observer.observe(SyncEvent::CardinalitySettled {
                    wait: self.wait.clone(),
                    count: current,
                    samples: self.samples,
                });
                break;
            }
            previous = Some(current);
            self.deps
                .clock
                .sleep(self.remaining().min(self.deps.policy.stable_poll_interval()))
                .await;
        }
        Ok(self.query.all().await?)
    }

    /// Poll until the count falls inside the contract and a snapshot agrees with it.
    async fn await_bounds(&mut self) -> Result<Vec<Arc<dyn ElementHandle>>, WaitCause> {
        loop {
            let mut last = self.sample().await?;
            if self.contract.admits(last) {
                let snapshot = self.query.all().await?;
                if self.contract.admits(snapshot.len()) {
                    self.deps.observer.observe(SyncEvent::CardinalitySettled {
                        wait: self.wait.clone(),
                        count: snapshot.len(),
                        samples: self.samples,
                    });
                    return Ok(snapshot);
                }
                debug!(
                    count = last,
                    snapshot = snapshot.len(),
                    "snapshot drifted outside the contract"
                );
                last = snapshot.len();
            }

            let remaining = self.remaining();
            if remaining.is_zero() {
                return Err(WaitCause::CardinalityTimeout {
                    contract: self.contract,
                    found: last,
                });
            }
            self.deps
                .clock
                .sleep(remaining.min(self.deps.policy.bound_poll_interval()))
                .await;
        }
    }

    async fn await_visible(&self, snapshot: &[Arc<dyn ElementHandle>]) -> Result<(), WaitCause> {
        let budget = self
            .deps
            .policy
            .visibility_budget(self.timeout, self.elapsed());
        let expected = snapshot.len();
        debug!(
            expected,
            budget_ms = millis(budget),
            "waiting for elements to become visible"
        );

        try_join_all(snapshot.iter().map(|element| async move {
            match element.wait_for_state(ElementState::Visible, budget).await {
                Ok(StateWait::Reached) => Ok(()),
                Ok(StateWait::TimedOut) => Err(WaitCause::VisibilityTimeout {
                    expected,
                    found: None,
                }),
                Err(err) => Err(WaitCause::Driver(err)),
            }
        }))
        .await?;
        Ok(())
    }

    async fn sample(&mut self) -> Result<usize, WaitCause> {
        let count = self.query.count().await?;
        self.samples += 1;
        self.deps.observer.observe(SyncEvent::CountSampled {
            wait: self.wait.clone(),
            count,
        });
        Ok(count)
    }

    fn elapsed(&self) -> Duration {
        self.deps.clock.since(self.started)
    }

    fn remaining(&self) -> Duration {
        self.deadline
            .saturating_duration_since(self.deps.clock.now())
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis().min(u128::from(u64::MAX)) as u64
}
