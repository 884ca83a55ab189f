use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dialog_arbiter::memory::MemoryDialogSource;
use dialog_arbiter::{
    ArbiterBuilder, ArbiterError, ArbiterPolicy, ArbitrationOutcome, ArbitrationState,
    EventHandler, EventSource, TransientEvent, TransientEventArbiter,
};
use parking_lot::Mutex;
use storefront_core_types::{HarnessError, SubscriptionToken};
use storefront_event_bus::{EventBus, InMemoryBus, SyncEvent};
use tokio::time::Instant;

const DEADLINE: Duration = Duration::from_secs(10);

fn arbiter() -> TransientEventArbiter {
    ArbiterBuilder::default().build()
}

fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send) {
    let calls = Arc::new(AtomicUsize::new(0));
    let handle = Arc::clone(&calls);
    (calls, move || {
        handle.fetch_add(1, Ordering::SeqCst);
    })
}

/// A page whose dialog closes on its own before it can be dismissed.
#[derive(Default)]
struct SelfClosingDialogPage {
    handler: Mutex<Option<EventHandler>>,
    dismiss_attempts: Arc<AtomicUsize>,
}

struct SelfClosingDialog {
    message: String,
    dismiss_attempts: Arc<AtomicUsize>,
}

#[async_trait]
impl TransientEvent for SelfClosingDialog {
    fn message(&self) -> String {
        self.message.clone()
    }

    async fn acknowledge(&self) -> Result<(), HarnessError> {
        self.dismiss_attempts.fetch_add(1, Ordering::SeqCst);
        Err(HarnessError::Detached("dialog already closed".into()))
    }
}

impl SelfClosingDialogPage {
    fn fire(&self, message: &str) {
        if let Some(handler) = self.handler.lock().take() {
            handler(Arc::new(SelfClosingDialog {
                message: message.to_string(),
                dismiss_attempts: Arc::clone(&self.dismiss_attempts),
            }));
        }
    }
}

#[async_trait]
impl EventSource for SelfClosingDialogPage {
    fn describe(&self) -> String {
        "self-closing page".to_string()
    }

    async fn subscribe_once(
        &self,
        handler: EventHandler,
    ) -> Result<SubscriptionToken, HarnessError> {
        *self.handler.lock() = Some(handler);
        Ok(SubscriptionToken(1))
    }

    fn unsubscribe(&self, _token: &SubscriptionToken) {
        self.handler.lock().take();
    }
}

#[tokio::test(start_paused = true)]
async fn immediate_dialog_is_captured_and_dismissed_once() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("product page");
    let started = Instant::now();

    let pending = arbiter.arm(page.clone()).await.unwrap();
    assert_eq!(pending.state(), ArbitrationState::Armed);
    page.fire("Product added");

    let (fallbacks, on_timeout) = counter();
    let outcome = arbiter.resolve(pending, DEADLINE, on_timeout).await;

    assert_eq!(outcome, ArbitrationOutcome::Captured("Product added".into()));
    assert!(started.elapsed() < Duration::from_millis(50));
    assert_eq!(page.acknowledged(), 1);
    assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
    assert_eq!(page.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn missing_dialog_times_out_after_grace_and_runs_fallback_once() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("login modal");
    let started = Instant::now();

    let pending = arbiter.arm(page.clone()).await.unwrap();
    let (fallbacks, on_timeout) = counter();
    let outcome = arbiter.resolve(pending, DEADLINE, on_timeout).await;

    assert_eq!(outcome, ArbitrationOutcome::TimedOut);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_secs(11), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_millis(11_100), "elapsed {elapsed:?}");
    assert_eq!(fallbacks.load(Ordering::SeqCst), 1);
    assert_eq!(page.acknowledged(), 0);
    assert_eq!(page.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dialog_just_before_deadline_wins() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("cart");

    let pending = arbiter.arm(page.clone()).await.unwrap();
    let firing = page.fire_after(DEADLINE - Duration::from_millis(5), "Thank you for your purchase!");
    let (fallbacks, on_timeout) = counter();
    let outcome = arbiter.resolve(pending, DEADLINE, on_timeout).await;

    assert_eq!(
        outcome,
        ArbitrationOutcome::Captured("Thank you for your purchase!".into())
    );
    assert_eq!(firing.await.unwrap(), 1);
    assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
    assert_eq!(page.acknowledged(), 1);
}

#[tokio::test(start_paused = true)]
async fn dialog_just_after_deadline_is_inert() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("cart");

    let pending = arbiter.arm(page.clone()).await.unwrap();
    let firing = page.fire_after(DEADLINE + Duration::from_millis(5), "Product added");
    let (fallbacks, on_timeout) = counter();
    let outcome = arbiter.resolve(pending, DEADLINE, on_timeout).await;

    assert_eq!(outcome, ArbitrationOutcome::TimedOut);
    assert_eq!(firing.await.unwrap(), 0, "listener was removed at the deadline");
    assert_eq!(outcome, ArbitrationOutcome::TimedOut);
    assert_eq!(page.acknowledged(), 0);
    assert_eq!(page.unhandled(), 1);
    assert_eq!(fallbacks.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn late_delivery_through_a_lingering_handler_is_discarded() {
    let bus = InMemoryBus::<SyncEvent>::new(16);
    let mut events = bus.subscribe();
    let arbiter = ArbiterBuilder::default().with_observer(bus.clone()).build();
    let page = MemoryDialogSource::sticky("racy driver");

    let pending = arbiter.arm(page.clone()).await.unwrap();
    let outcome = arbiter.resolve(pending, Duration::from_secs(2), || {}).await;
    assert_eq!(outcome, ArbitrationOutcome::TimedOut);

    assert_eq!(page.fire("Product added"), 1);
    assert_eq!(page.acknowledged(), 0);

    let mut kinds = Vec::new();
    while let Ok(event) = events.try_recv() {
        kinds.push(event.kind());
    }
    assert_eq!(
        kinds,
        vec![
            "arbitration_armed",
            "arbitration_timed_out",
            "late_event_discarded"
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn later_arbitration_only_sees_its_own_dialog() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("login modal");

    let first = arbiter.arm(page.clone()).await.unwrap();
    assert_eq!(
        arbiter.resolve(first, Duration::from_secs(1), || {}).await,
        ArbitrationOutcome::TimedOut
    );

    let second = arbiter.arm(page.clone()).await.unwrap();
    assert_eq!(page.subscriber_count(), 1);
    page.fire("Wrong password.");
    assert_eq!(
        arbiter.resolve(second, Duration::from_secs(1), || {}).await,
        ArbitrationOutcome::Captured("Wrong password.".into())
    );
    assert_eq!(page.acknowledged(), 1);
}

#[tokio::test(start_paused = true)]
async fn abandoned_listener_still_waits_for_deadline() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("page");
    let started = Instant::now();

    let pending = arbiter.arm(page.clone()).await.unwrap();
    page.drop_handlers();
    let outcome = arbiter.resolve(pending, Duration::from_secs(3), || {}).await;

    assert_eq!(outcome, ArbitrationOutcome::TimedOut);
    assert!(started.elapsed() >= Duration::from_secs(4));
}

#[tokio::test]
async fn closed_source_fails_to_arm() {
    let arbiter = arbiter();
    let err = arbiter
        .arm(MemoryDialogSource::closed("detached page"))
        .await
        .unwrap_err();

    match err {
        ArbiterError::Arm { target, reason } => {
            assert_eq!(target, "detached page");
            assert!(matches!(reason, HarnessError::Closed(_)));
        }
    }
}

#[tokio::test]
async fn dropping_pending_arbitration_unsubscribes() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("page");

    let pending = arbiter.arm(page.clone()).await.unwrap();
    assert_eq!(page.subscriber_count(), 1);
    drop(pending);
    assert_eq!(page.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn resolve_default_uses_policy_timing() {
    let arbiter = ArbiterBuilder::new(ArbiterPolicy {
        deadline_ms: 2_000,
        grace_ms: 500,
    })
    .build();
    let page = MemoryDialogSource::new("page");
    let started = Instant::now();

    let pending = arbiter.arm(page.clone()).await.unwrap();
    let outcome = arbiter.resolve_default(pending, || {}).await;

    assert_eq!(outcome, ArbitrationOutcome::TimedOut);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(2_500) && elapsed < Duration::from_millis(2_600));
}

#[tokio::test(start_paused = true)]
async fn guard_arms_before_the_action_runs() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("product page");

    let trigger = page.clone();
    let (value, outcome) = arbiter
        .guard(page.clone(), async move {
            trigger.fire("Product added");
            Ok::<_, HarnessError>("clicked")
        })
        .await
        .unwrap();

    assert_eq!(value, "clicked");
    assert_eq!(outcome.message(), Some("Product added"));
    assert_eq!(page.acknowledged(), 1);
}

#[tokio::test(start_paused = true)]
async fn guard_disarms_when_the_action_fails() {
    let arbiter = arbiter();
    let page = MemoryDialogSource::new("cart");

    let result = arbiter
        .guard(page.clone(), async {
            Err::<(), _>(HarnessError::driver("purchase button missing"))
        })
        .await;

    assert_eq!(result, Err(HarnessError::driver("purchase button missing")));
    assert_eq!(page.subscriber_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn acknowledge_failure_still_reports_captured() {
    let arbiter = arbiter();
    let page = Arc::new(SelfClosingDialogPage::default());

    let pending = arbiter.arm(page.clone()).await.unwrap();
    page.fire("Product added");

    let (fallbacks, on_timeout) = counter();
    let outcome = arbiter.resolve(pending, DEADLINE, on_timeout).await;

    assert_eq!(outcome, ArbitrationOutcome::Captured("Product added".into()));
    assert_eq!(page.dismiss_attempts.load(Ordering::SeqCst), 1);
    assert_eq!(fallbacks.load(Ordering::SeqCst), 0);
}
