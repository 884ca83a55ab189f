//! In-memory page fixtures for exercising waits without a browser.
//!
//! A [`MemoryQuery`] replays a timeline of frames: each frame replaces the
//! matched element list at a given offset from the query's creation. Elements
//! can become visible later than they attach, or never. Timing follows the
//! tokio clock, so paused-time tests are deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use storefront_core_types::HarnessError;
use tokio::time::{sleep, sleep_until, Instant};

use crate::model::{ElementState, StateWait};
use crate::ports::{ElementHandle, LiveQuery};

#[derive(Clone, Debug)]
pub struct MemoryElement {
    text: Option<String>,
    visible_at: Option<Duration>,
}

impl MemoryElement {
    /// Element whose text is `text`, visible as soon as it attaches.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            visible_at: Some(Duration::ZERO),
        }
    }

    pub fn without_text() -> Self {
        Self {
            text: None,
            visible_at: Some(Duration::ZERO),
        }
    }

    /// Becomes visible `offset` after the query was created.
    pub fn visible_at(mut self, offset: Duration) -> Self {
        self.visible_at = Some(offset);
        self
    }

    pub fn never_visible(mut self) -> Self {
        self.visible_at = None;
        self
    }
}

struct Frame {
    at: Duration,
    elements: Vec<Arc<MemoryElement>>,
}

pub struct MemoryQuery {
    selector: String,
    origin: Instant,
    frames: Vec<Frame>,
    count_calls: AtomicUsize,
    fail_counts_after: Option<usize>,
    snapshot_calls: AtomicUsize,
    stale_snapshots: usize,
}

impl MemoryQuery {
    /// A query that matches nothing until frames are added.
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            origin: Instant::now(),
            frames: Vec::new(),
            count_calls: AtomicUsize::new(0),
            fail_counts_after: None,
            snapshot_calls: AtomicUsize::new(0),
            stale_snapshots: 0,
        }
    }

    /// Matched set is `elements` from the start.
    pub fn fixed(selector: impl Into<String>, elements: Vec<MemoryElement>) -> Self {
        Self::new(selector).with_frame(Duration::ZERO, elements)
    }

    /// Replace the matched set with `elements` from `at` onwards.
    pub fn with_frame(mut self, at: Duration, elements: Vec<MemoryElement>) -> Self {
        self.frames.push(Frame {
            at,
            elements: elements.into_iter().map(Arc::new).collect(),
        });
        self.frames.sort_by_key(|frame| frame.at);
        self
    }

    /// `count` starts failing after `calls` successful evaluations.
    pub fn fail_counts_after(mut self, calls: usize) -> Self {
        self.fail_counts_after = Some(calls);
        self
    }

    /// The first `calls` evaluations of `all` still see the frame before the
    /// current one, as if the list re-rendered between counting and reading.
    pub fn stale_snapshots(mut self, calls: usize) -> Self {
        self.stale_snapshots = calls;
        self
    }

    pub fn count_calls(&self) -> usize {
        self.count_calls.load(Ordering::SeqCst)
    }

    pub fn snapshot_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    fn elapsed(&self) -> Duration {
        Instant::now().saturating_duration_since(self.origin)
    }

    fn current(&self) -> &[Arc<MemoryElement>] {
        let elapsed = self.elapsed();
        self.frames
            .iter()
            .rev()
            .find(|frame| frame.at <= elapsed)
            .map(|frame| frame.elements.as_slice())
            .unwrap_or(&[])
    }

    fn previous(&self) -> &[Arc<MemoryElement>] {
        let elapsed = self.elapsed();
        self.frames
            .iter()
            .rev()
            .filter(|frame| frame.at <= elapsed)
            .nth(1)
            .map(|frame| frame.elements.as_slice())
            .unwrap_or(&[])
    }

    /// Offset at which something first matches, at or after now.
    fn next_attachment(&self) -> Option<(Duration, Arc<MemoryElement>)> {
        if let Some(element) = self.current().first() {
            return Some((self.elapsed(), Arc::clone(element)));
        }
        let elapsed = self.elapsed();
        self.frames
            .iter()
            .filter(|frame| frame.at > elapsed)
            .find_map(|frame| {
                frame
                    .elements
                    .first()
                    .map(|element| (frame.at, Arc::clone(element)))
            })
    }

    fn handle(&self, element: Arc<MemoryElement>, attached_at: Duration) -> Arc<dyn ElementHandle> {
        Arc::new(MemoryHandle {
            origin: self.origin,
            attached_at: Some(attached_at),
            element: Some(element),
        })
    }
}

#[async_trait]
impl LiveQuery for MemoryQuery {
    fn describe(&self) -> String {
        self.selector.clone()
    }

    async fn count(&self) -> Result<usize, HarnessError> {
        let calls = self.count_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_counts_after {
            if calls >= limit {
                return Err(HarnessError::driver(format!(
                    "count unavailable for {}",
                    self.selector
                )));
            }
        }
        Ok(self.current().len())
    }

    async fn all(&self) -> Result<Vec<Arc<dyn ElementHandle>>, HarnessError> {
        let calls = self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        let elapsed = self.elapsed();
        let elements = if calls < self.stale_snapshots {
            self.previous()
        } else {
            self.current()
        };
        Ok(elements
            .iter()
            .map(|element| self.handle(Arc::clone(element), elapsed))
            .collect())
    }

    async fn first(&self) -> Result<Arc<dyn ElementHandle>, HarnessError> {
        Ok(match self.next_attachment() {
            Some((at, element)) => self.handle(element, at),
            None => Arc::new(MemoryHandle {
                origin: self.origin,
                attached_at: None,
                element: None,
            }),
        })
    }
}

struct MemoryHandle {
    origin: Instant,
    attached_at: Option<Duration>,
    element: Option<Arc<MemoryElement>>,
}

impl MemoryHandle {
    fn ready_at(&self, state: ElementState) -> Option<Duration> {
        let attached_at = self.attached_at?;
        match state {
            ElementState::Attached => Some(attached_at),
            ElementState::Visible => {
                let visible_at = self.element.as_ref()?.visible_at?;
                Some(visible_at.max(attached_at))
            }
        }
    }
}

#[async_trait]
impl ElementHandle for MemoryHandle {
    async fn wait_for_state(
        &self,
        state: ElementState,
        timeout: Duration,
    ) -> Result<StateWait, HarnessError> {
        let now = Instant::now();
        match self.ready_at(state).map(|offset| self.origin + offset) {
            Some(ready) if ready <= now + timeout => {
                sleep_until(ready).await;
                Ok(StateWait::Reached)
            }
            _ => {
                sleep(timeout).await;
                Ok(StateWait::TimedOut)
            }
        }
    }

    async fn text_content(&self) -> Result<Option<String>, HarnessError> {
        match &self.element {
            Some(element) => Ok(element.text.clone()),
            None => Err(HarnessError::Detached("no element matched".into())),
        }
    }
}
