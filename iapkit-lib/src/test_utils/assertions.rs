//! Recording host boundaries and helpers that await their callbacks.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::errors::{BillingError, BillingErrorCode};
use crate::observer::{ActivityLauncher, ActivityRequest, ProgressIndicator, PurchaseObserver};
use crate::state::PurchaseState;
use crate::Result;

const EVENT_TIMEOUT: Duration = Duration::from_secs(2);
const QUIET_PERIOD: Duration = Duration::from_millis(50);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// One observer callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObserverEvent {
    StateChanged(String, PurchaseState),
    DetailsReceived(String),
    DetailsError(String, String),
    ProviderError(BillingErrorCode),
}

/// Observer that forwards every callback to a channel.
pub struct RecordingObserver {
    tx: mpsc::UnboundedSender<ObserverEvent>,
    errors: Mutex<Vec<BillingError>>,
}

impl RecordingObserver {
    pub fn channel() -> (Arc<Self>, mpsc::UnboundedReceiver<ObserverEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let observer = Arc::new(Self {
            tx,
            errors: Mutex::new(Vec::new()),
        });
        (observer, rx)
    }

    /// Every error reported so far, with full detail.
    pub fn errors(&self) -> Vec<BillingError> {
        self.errors.lock().unwrap().clone()
    }
}

impl PurchaseObserver for RecordingObserver {
    fn on_purchase_state_changed(&self, product_id: &str, state: PurchaseState) {
        let _ = self
            .tx
            .send(ObserverEvent::StateChanged(product_id.to_string(), state));
    }

    fn on_product_details_received(&self, product_id: &str) {
        let _ = self
            .tx
            .send(ObserverEvent::DetailsReceived(product_id.to_string()));
    }

    fn on_product_details_error(&self, product_id: &str, message: &str) {
        let _ = self.tx.send(ObserverEvent::DetailsError(
            product_id.to_string(),
            message.to_string(),
        ));
    }

    fn on_provider_error(&self, error: &BillingError) {
        self.errors.lock().unwrap().push(error.clone());
        let _ = self.tx.send(ObserverEvent::ProviderError(error.code()));
    }
}

/// Next observer callback.
///
/// # Panics
/// Panics if none arrives within two seconds.
pub async fn next_event(rx: &mut mpsc::UnboundedReceiver<ObserverEvent>) -> ObserverEvent {
    tokio::time::timeout(EVENT_TIMEOUT, rx.recv())
        .await
        .expect("timed out waiting for an observer event")
        .expect("observer channel closed")
}

/// Assert that no callback arrives for a short while.
///
/// # Panics
/// Panics on any event.
pub async fn assert_quiet(rx: &mut mpsc::UnboundedReceiver<ObserverEvent>) {
    if let Ok(Some(event)) = tokio::time::timeout(QUIET_PERIOD, rx.recv()).await {
        panic!("unexpected observer event: {:?}", event);
    }
}

/// Poll `condition` until it holds.
///
/// # Panics
/// Panics if it does not hold within two seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(EVENT_TIMEOUT, async {
        while !condition() {
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not met in time");
}

/// Progress indicator that counts show and dismiss calls.
#[derive(Debug, Default)]
pub struct CountingProgress {
    shows: AtomicUsize,
    dismissals: AtomicUsize,
}

impl CountingProgress {
    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub fn dismissals(&self) -> usize {
        self.dismissals.load(Ordering::SeqCst)
    }
}

impl ProgressIndicator for CountingProgress {
    fn show(&self) {
        self.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn dismiss(&self) {
        self.dismissals.fetch_add(1, Ordering::SeqCst);
    }
}

/// Activity launcher that records every request.
#[derive(Debug, Default)]
pub struct RecordingLauncher {
    requests: Mutex<Vec<(ActivityRequest, i32)>>,
    taken: AtomicUsize,
    fail: AtomicBool,
}

impl RecordingLauncher {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make later launches fail.
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<(ActivityRequest, i32)> {
        self.requests.lock().unwrap().clone()
    }

    /// The oldest request not yet returned by this method.
    pub async fn next_request(&self) -> (ActivityRequest, i32) {
        let index = self.taken.fetch_add(1, Ordering::SeqCst);
        wait_until(|| self.requests.lock().unwrap().len() > index).await;
        self.requests.lock().unwrap()[index].clone()
    }
}

impl ActivityLauncher for RecordingLauncher {
    fn start_activity_for_result(&self, request: ActivityRequest, request_code: i32) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BillingError::Internal("activity could not be started".into()));
        }
        self.requests.lock().unwrap().push((request, request_code));
        Ok(())
    }
}
