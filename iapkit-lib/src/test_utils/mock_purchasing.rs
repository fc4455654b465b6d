//! Scripted alternate-store purchasing service.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use tokio::sync::mpsc;

use super::assertions::wait_until;
use crate::transport::purchasing::{Offset, PurchasingEvent, PurchasingService, RequestId};

/// A request made against the service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PurchasingCall {
    UserId(RequestId),
    PurchaseUpdates(RequestId, Offset),
    Purchase(RequestId, String),
    ItemData(RequestId, Vec<String>),
}

impl PurchasingCall {
    pub fn request_id(&self) -> &str {
        match self {
            Self::UserId(id)
            | Self::PurchaseUpdates(id, _)
            | Self::Purchase(id, _)
            | Self::ItemData(id, _) => id,
        }
    }
}

/// Records requests and lets the test deliver responses with [`emit`].
///
/// [`emit`]: MockPurchasingService::emit
#[derive(Default)]
pub struct MockPurchasingService {
    events: Mutex<Option<mpsc::UnboundedSender<PurchasingEvent>>>,
    calls: Mutex<Vec<PurchasingCall>>,
    registrations: AtomicUsize,
    next_id: AtomicU64,
    taken: AtomicUsize,
}

impl MockPurchasingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `event` to the registered observer.
    pub fn emit(&self, event: PurchasingEvent) -> bool {
        match self.events.lock().unwrap().as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<PurchasingCall> {
        self.calls.lock().unwrap().clone()
    }

    /// The oldest request not yet returned by this method.
    pub async fn next_call(&self) -> PurchasingCall {
        let index = self.taken.fetch_add(1, Ordering::SeqCst);
        wait_until(|| self.calls.lock().unwrap().len() > index).await;
        self.calls.lock().unwrap()[index].clone()
    }

    fn record(&self, call: impl FnOnce(RequestId) -> PurchasingCall) -> RequestId {
        let id = format!("req-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        self.calls.lock().unwrap().push(call(id.clone()));
        id
    }
}

impl PurchasingService for MockPurchasingService {
    fn register_observer(&self, events: mpsc::UnboundedSender<PurchasingEvent>) {
        self.registrations.fetch_add(1, Ordering::SeqCst);
        *self.events.lock().unwrap() = Some(events);
    }

    fn initiate_get_user_id_request(&self) -> RequestId {
        self.record(PurchasingCall::UserId)
    }

    fn initiate_purchase_updates_request(&self, offset: Offset) -> RequestId {
        self.record(|id| PurchasingCall::PurchaseUpdates(id, offset))
    }

    fn initiate_purchase_request(&self, sku: &str) -> RequestId {
        self.record(|id| PurchasingCall::Purchase(id, sku.to_string()))
    }

    fn initiate_item_data_request(&self, skus: &[String]) -> RequestId {
        self.record(|id| PurchasingCall::ItemData(id, skus.to_vec()))
    }
}
