use std::fmt;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    Passed,
    Failed,
    TimedOut,
    Skipped,
    Interrupted,
}

impl TestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestStatus::Passed => "passed",
            TestStatus::Failed => "failed",
            TestStatus::TimedOut => "timed_out",
            TestStatus::Skipped => "skipped",
            TestStatus::Interrupted => "interrupted",
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logs suite and test boundaries with measured durations.
#[derive(Debug, Default)]
pub struct TestLifecycle {
    started: DashMap<String, Instant>,
    suite_started: Mutex<Option<Instant>>,
}

impl TestLifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn suite_started(&self, suite: &str, tests: usize) {
        *self.suite_started.lock() = Some(Instant::now());
        info!(suite, tests, "Test suite started");
    }

    pub fn suite_finished(&self, suite: &str) -> Duration {
        let elapsed = self
            .suite_started
            .lock()
            .take()
            .map(|started| started.elapsed())
            .unwrap_or_default();
        info!(
            suite,
            duration = %humantime::format_duration(truncate_millis(elapsed)),
            "Test suite completed"
        );
        elapsed
    }

    pub fn test_started(&self, id: &str, title: &str) {
        self.started.insert(id.to_string(), Instant::now());
        info!(test = title, "STARTED TEST");
    }

    /// Record the end of a test and return how long it ran.
    ///
    /// A test that never reported its start is logged with a zero duration.
    pub fn test_finished(
        &self,
        id: &str,
        title: &str,
        status: TestStatus,
        error: Option<&str>,
    ) -> Duration {
        let elapsed = match self.started.remove(id) {
            Some((_, started)) => started.elapsed(),
            None => {
                warn!(test = title, "test finished without a recorded start");
                Duration::ZERO
            }
        };
        let duration = humantime::format_duration(truncate_millis(elapsed));

        match status {
            TestStatus::Passed => info!(test = title, %duration, "PASSED"),
            TestStatus::Failed => {
                info!(test = title, %duration, "FAILED");
                if let Some(message) = error {
                    info!(test = title, error = message, "failure detail");
                }
            }
            TestStatus::TimedOut => info!(test = title, %duration, "TIMEOUT"),
            TestStatus::Skipped => info!(test = title, "SKIPPED"),
            TestStatus::Interrupted => info!(test = title, "INTERRUPTED"),
        }
        elapsed
    }

    pub fn in_flight(&self) -> usize {
        self.started.len()
    }
}

fn truncate_millis(duration: Duration) -> Duration {
    Duration::from_millis(duration.as_millis() as u64)
}
