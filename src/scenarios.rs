//! Reference scenarios replayed against the in-memory fakes.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dialog_arbiter::memory::MemoryDialogSource;
use dialog_arbiter::{ArbiterBuilder, ArbiterError, ArbitrationOutcome, TransientEventArbiter};
use element_stabilizer::memory::{MemoryElement, MemoryQuery};
use element_stabilizer::{CardinalityContract, ElementStabilizer, StabilizerBuilder, WaitCause};
use serde::Serialize;
use storefront_event_bus::{NullObserver, SyncObserver};
use tracing::instrument;

use crate::config::HarnessConfig;
use crate::lifecycle::{TestLifecycle, TestStatus};

const PRODUCT_LINKS: &str = "css=.card-block h4 a";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    /// Three static products settle after one poll cycle.
    A,
    /// An empty listing with `min = 1` fails with no attachment.
    B,
    /// No dialog appears; the arbitration times out and the fallback runs once.
    C,
    /// The action raises "Product added" immediately and it is captured.
    D,
}

impl Scenario {
    pub const ALL: [Scenario; 4] = [Scenario::A, Scenario::B, Scenario::C, Scenario::D];

    pub fn id(&self) -> &'static str {
        match self {
            Scenario::A => "a",
            Scenario::B => "b",
            Scenario::C => "c",
            Scenario::D => "d",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Scenario::A => "static product list stabilizes",
            Scenario::B => "empty listing fails without attachment",
            Scenario::C => "missing dialog times out with fallback",
            Scenario::D => "product-added dialog is captured",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One scenario or `all`, as accepted on the command line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScenarioSelection(pub Vec<Scenario>);

impl FromStr for ScenarioSelection {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let scenario = match value.trim().to_ascii_lowercase().as_str() {
            "all" => return Ok(Self(Scenario::ALL.to_vec())),
            "a" => Scenario::A,
            "b" => Scenario::B,
            "c" => Scenario::C,
            "d" => Scenario::D,
            other => return Err(format!("unknown scenario '{other}' (expected a, b, c, d or all)")),
        };
        Ok(Self(vec![scenario]))
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub status: TestStatus,
    pub detail: String,
    pub elapsed_ms: u64,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.status == TestStatus::Passed
    }
}

pub struct ScenarioRunner {
    stabilizer: Arc<dyn ElementStabilizer>,
    arbiter: TransientEventArbiter,
    lifecycle: Arc<TestLifecycle>,
}

impl ScenarioRunner {
    pub fn new(config: &HarnessConfig, observer: Arc<dyn SyncObserver>) -> Self {
        let stabilizer = StabilizerBuilder::new(config.stabilizer.clone())
            .with_observer(Arc::clone(&observer))
            .build();
        let arbiter = ArbiterBuilder::new(config.arbiter.clone())
            .with_observer(observer)
            .build();
        Self {
            stabilizer,
            arbiter,
            lifecycle: Arc::new(TestLifecycle::new()),
        }
    }

    pub fn with_lifecycle(mut self, lifecycle: Arc<TestLifecycle>) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub async fn run_all(&self, scenarios: &[Scenario]) -> Vec<ScenarioReport> {
        self.lifecycle.suite_started("simulate", scenarios.len());
        let mut reports = Vec::with_capacity(scenarios.len());
        for scenario in scenarios {
            reports.push(self.run(*scenario).await);
        }
        self.lifecycle.suite_finished("simulate");
        reports
    }

    #[instrument(skip(self), fields(title = scenario.title()))]
    pub async fn run(&self, scenario: Scenario) -> ScenarioReport {
        self.lifecycle.test_started(scenario.id(), scenario.title());
        let (status, detail) = match scenario {
            Scenario::A => self.static_list().await,
            Scenario::B => self.empty_listing().await,
            Scenario::C => self.missing_dialog().await,
            Scenario::D => self.product_added_dialog().await,
        };
        let failure = (status != TestStatus::Passed).then_some(detail.as_str());
        let elapsed =
            self.lifecycle
                .test_finished(scenario.id(), scenario.title(), status, failure);

        ScenarioReport {
            scenario,
            status,
            detail,
            elapsed_ms: elapsed.as_millis() as u64,
        }
    }

    async fn static_list(&self) -> (TestStatus, String) {
        let query = MemoryQuery::fixed(
            PRODUCT_LINKS,
            vec![
                MemoryElement::new("Samsung galaxy s6"),
                MemoryElement::new("Nokia lumia 1520"),
                MemoryElement::new("Nexus 6"),
            ],
        );
        match self
            .stabilizer
            .wait(&query, CardinalityContract::stable(), Duration::from_millis(5000))
            .await
        {
            Ok(result) if result.len() == 3 => (
                TestStatus::Passed,
                format!("3 elements after {} samples", result.samples()),
            ),
            Ok(result) => (
                TestStatus::Failed,
                format!("expected 3 elements, got {}", result.len()),
            ),
            Err(err) => (status_for_wait(&err.cause), err.to_string()),
        }
    }

    async fn empty_listing(&self) -> (TestStatus, String) {
        let query = MemoryQuery::new(PRODUCT_LINKS);
        match self
            .stabilizer
            .wait(&query, CardinalityContract::at_least(1), Duration::from_millis(2000))
            .await
        {
            Err(err) if err.cause == WaitCause::NoAttachment => (TestStatus::Passed, err.to_string()),
            Err(err) => (
                TestStatus::Failed,
                format!("expected no attachment, got: {err}"),
            ),
            Ok(result) => (
                TestStatus::Failed,
                format!("expected no attachment, got {} elements", result.len()),
            ),
        }
    }

    async fn missing_dialog(&self) -> (TestStatus, String) {
        let page = MemoryDialogSource::new("product page");
        let pending = match self.arbiter.arm(page.clone()).await {
            Ok(pending) => pending,
            Err(err) => return (TestStatus::Failed, err.to_string()),
        };

        let fallbacks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fallbacks);
        let outcome = self
            .arbiter
            .resolve_default(pending, move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        let fallbacks = fallbacks.load(Ordering::SeqCst);
        match outcome {
            ArbitrationOutcome::TimedOut if fallbacks == 1 && page.subscriber_count() == 0 => {
                (TestStatus::Passed, "timed out, fallback ran once".to_string())
            }
            ArbitrationOutcome::TimedOut => (
                TestStatus::Failed,
                format!(
                    "timed out with {fallbacks} fallback runs and {} listeners left",
                    page.subscriber_count()
                ),
            ),
            captured => (TestStatus::Failed, format!("unexpected dialog: {captured}")),
        }
    }

    async fn product_added_dialog(&self) -> (TestStatus, String) {
        let page = MemoryDialogSource::new("product page");
        let trigger = Arc::clone(&page);
        let action = async move {
            trigger.fire("Product added");
            Ok::<_, ArbiterError>(())
        };

        match self.arbiter.guard(page.clone(), action).await {
            Ok(((), ArbitrationOutcome::Captured(message)))
                if message == "Product added" && page.acknowledged() == 1 =>
            {
                (TestStatus::Passed, format!("captured '{message}'"))
            }
            Ok(((), outcome)) => (
                TestStatus::Failed,
                format!(
                    "outcome {outcome} with {} acknowledgements",
                    page.acknowledged()
                ),
            ),
            Err(err) => (TestStatus::Failed, err.to_string()),
        }
    }
}

impl Default for ScenarioRunner {
    fn default() -> Self {
        Self::new(&HarnessConfig::default(), Arc::new(NullObserver))
    }
}

fn status_for_wait(cause: &WaitCause) -> TestStatus {
    if cause.is_timeout() {
        TestStatus::TimedOut
    } else {
        TestStatus::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_parses_single_and_all() {
        assert_eq!(
            "C".parse::<ScenarioSelection>().unwrap(),
            ScenarioSelection(vec![Scenario::C])
        );
        assert_eq!(
            "all".parse::<ScenarioSelection>().unwrap().0,
            Scenario::ALL.to_vec()
        );
        assert!("e".parse::<ScenarioSelection>().is_err());
    }
}
