//! Alternate-store provider.
//!
//! Every store request returns a request id at once; responses arrive as
//! [`PurchasingEvent`]s on a channel drained by a long-lived event loop.
//! Pending purchases, detail fetches and the restore cursor are keyed by
//! request id, and responses with an unknown id are dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::bundle::Bundle;
use crate::config::AmazonConfig;
use crate::errors::BillingError;
use crate::mapper::map_amazon_status;
use crate::provider::BillingProvider;
use crate::providers::core::{ProviderContext, ProviderCore, PRODUCT_NOT_FOUND};
use crate::providers::restore::RestoreRun;
use crate::state::{PurchaseState, Vendor};
use crate::transport::purchasing::{
    ItemDataResponse, ItemType, Offset, PurchaseRequestStatus, PurchaseResponse, PurchaseUpdatesResponse,
    PurchasingEvent, PurchasingService, RequestId, RequestStatus, UserIdResponse,
};

/// A restore waiting for its next purchase-updates page.
struct RestoreCursor {
    request_id: RequestId,
    run: RestoreRun,
}

/// Restore bookkeeping. `active` spans a whole restore, including the time a
/// page is processed with its cursor taken out, and owns the progress
/// indicator.
#[derive(Default)]
struct RestoreSlot {
    active: bool,
    cursor: Option<RestoreCursor>,
}

/// Billing provider backed by a [`PurchasingService`].
pub struct AmazonBillingProvider {
    inner: Arc<AmazonInner>,
}

struct AmazonInner {
    core: ProviderCore,
    service: Arc<dyn PurchasingService>,
    config: AmazonConfig,
    purchase_requests: Mutex<HashMap<RequestId, String>>,
    details_requests: Mutex<HashMap<RequestId, Vec<String>>>,
    restore: Mutex<RestoreSlot>,
    user_id: Mutex<Option<String>>,
    sandbox: AtomicBool,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl AmazonBillingProvider {
    pub fn new(service: Arc<dyn PurchasingService>, config: AmazonConfig, context: ProviderContext) -> Self {
        Self {
            inner: Arc::new(AmazonInner {
                core: ProviderCore::new(Vendor::Amazon, context),
                service,
                config,
                purchase_requests: Mutex::new(HashMap::new()),
                details_requests: Mutex::new(HashMap::new()),
                restore: Mutex::new(RestoreSlot::default()),
                user_id: Mutex::new(None),
                sandbox: AtomicBool::new(false),
                event_loop: Mutex::new(None),
            }),
        }
    }

    /// Store user id, once the store has answered.
    pub fn user_id(&self) -> Option<String> {
        self.inner
            .user_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// True when responses come from the sandbox tester rather than the live store.
    pub fn is_sandbox(&self) -> bool {
        self.inner.sandbox.load(Ordering::SeqCst)
    }
}

impl AmazonInner {
    fn start_event_loop(self: &Arc<Self>, mut events: mpsc::UnboundedReceiver<PurchasingEvent>) {
        let inner = Arc::clone(self);
        let handle = self.core.tasks().runtime().spawn(async move {
            while let Some(event) = events.recv().await {
                inner.handle_event(event);
            }
            tracing::debug!("purchasing event channel closed");
        });
        *self.event_loop.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn handle_event(&self, event: PurchasingEvent) {
        match event {
            PurchasingEvent::SdkAvailable { sandbox } => {
                self.sandbox.store(sandbox, Ordering::SeqCst);
                tracing::info!(sandbox, "purchasing service available");
            }
            PurchasingEvent::UserId(response) => self.on_user_id(response),
            PurchasingEvent::Purchase(response) => self.on_purchase(response),
            PurchasingEvent::PurchaseUpdates(response) => self.on_purchase_updates(response),
            PurchasingEvent::ItemData(response) => self.on_item_data(response),
        }
    }

    fn on_user_id(&self, response: UserIdResponse) {
        match (response.status, response.user_id) {
            (RequestStatus::Successful, Some(user_id)) => {
                tracing::debug!(request_id = %response.request_id, "user id received");
                *self.user_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(user_id);
            }
            _ => tracing::warn!(request_id = %response.request_id, "unable to get user id"),
        }
    }

    /// Begin a restore from the start of the purchase history, superseding
    /// any restore still in flight.
    fn start_restore(&self) {
        let mut slot = self.restore.lock().unwrap_or_else(PoisonError::into_inner);
        let request_id = self.service.initiate_purchase_updates_request(Offset::Beginning);
        let previous = slot.cursor.replace(RestoreCursor {
            request_id,
            run: RestoreRun::new(),
        });
        if let Some(previous) = previous {
            tracing::debug!(request_id = %previous.request_id, "superseding restore");
        }
        if !slot.active {
            slot.active = true;
            self.core.progress().show();
        }
    }

    /// Close the active restore unless a newer one has taken over.
    fn end_restore(&self) -> bool {
        let mut slot = self.restore.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.cursor.is_some() {
            return false;
        }
        slot.active = false;
        drop(slot);
        self.core.progress().dismiss();
        true
    }

    fn on_purchase_updates(&self, response: PurchaseUpdatesResponse) {
        let cursor = {
            let mut slot = self.restore.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.cursor.take() {
                Some(cursor) if cursor.request_id == response.request_id => cursor,
                other => {
                    slot.cursor = other;
                    tracing::debug!(request_id = %response.request_id, "ignoring stale purchase updates");
                    return;
                }
            }
        };
        let mut run = cursor.run;

        if response.status == RequestStatus::Failed {
            if !self.end_restore() {
                return;
            }
            self.core.observer().report_error(&BillingError::rejected(
                PurchaseRequestStatus::Failed as i32,
                "purchase updates request failed",
            ));
            return;
        }

        for sku in &response.revoked_skus {
            tracing::warn!(sku = %sku, "purchase revoked");
        }
        run.next_page();
        for receipt in &response.receipts {
            if receipt.item_type == ItemType::Consumable {
                tracing::debug!(sku = %receipt.sku, "skipping consumable receipt");
                continue;
            }
            self.core
                .properties()
                .set_all(&receipt.sku, receipt.extra_properties());
            run.restore(&self.core, &receipt.to_record());
        }

        if response.is_more {
            let mut slot = self.restore.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.cursor.is_some() {
                // A newer restore took over while this page was processed.
                return;
            }
            tracing::debug!(offset = %response.offset, "requesting next purchase updates page");
            let request_id = self
                .service
                .initiate_purchase_updates_request(response.offset);
            slot.cursor = Some(RestoreCursor { request_id, run });
        } else if self.end_restore() {
            run.finish(&self.core);
        }
    }

    fn on_purchase(&self, response: PurchaseResponse) {
        let requested = self
            .purchase_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&response.request_id);
        let Some(requested) = requested else {
            tracing::warn!(request_id = %response.request_id, "purchase response for unknown request");
            return;
        };

        match (response.status, response.receipt) {
            (PurchaseRequestStatus::Successful, Some(receipt)) => {
                // Subscriptions are bought by term SKU but the receipt names
                // the parent SKU, which is what the host tracks.
                self.core
                    .record_purchase(&receipt.to_record(), PurchaseState::Purchased);
                self.core
                    .properties()
                    .set_all(&receipt.sku, receipt.extra_properties());
                self.core
                    .resolve_purchase(Some(&receipt.sku), PurchaseState::Purchased);
            }
            (PurchaseRequestStatus::Successful, None) => {
                self.core
                    .resolve_purchase(Some(&requested), PurchaseState::Cancelled);
                self.core.observer().report_error(&BillingError::Serialization(
                    "successful purchase without a receipt".into(),
                ));
            }
            (status, _) => {
                self.core
                    .resolve_purchase(Some(&requested), map_amazon_status(status));
            }
        }
    }

    fn on_item_data(&self, response: ItemDataResponse) {
        let requested = self
            .details_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&response.request_id);
        let Some(requested) = requested else {
            tracing::warn!(request_id = %response.request_id, "item data for unknown request");
            return;
        };
        let observer = self.core.observer();

        if response.status == RequestStatus::Failed {
            for sku in &requested {
                observer.product_details_error(sku, "item data request failed");
            }
            return;
        }

        let mut answered = Vec::with_capacity(response.items.len());
        for item in response.items {
            let sku = item.sku.clone();
            self.core.store_product(item.into_product());
            observer.product_details_received(&sku);
            answered.push(sku);
        }
        for sku in requested.iter().filter(|sku| !answered.contains(sku)) {
            if !response.unavailable_skus.contains(sku) {
                tracing::debug!(sku = %sku, "no item data returned");
            }
            observer.product_details_error(sku, PRODUCT_NOT_FOUND);
        }
    }
}

impl BillingProvider for AmazonBillingProvider {
    fn core(&self) -> &ProviderCore {
        &self.inner.core
    }

    fn initialize(&self) {
        if !self.inner.core.begin_initialize() {
            return;
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.start_event_loop(rx);
        self.inner.service.register_observer(tx);
        if self.inner.config.request_user_id {
            let request_id = self.inner.service.initiate_get_user_id_request();
            tracing::debug!(request_id = %request_id, "user id requested");
        }
        self.inner.core.mark_ready();
        self.inner.start_restore();
    }

    /// The store cannot report whether purchasing is disabled for the user,
    /// so this is true whenever the provider is ready.
    fn can_make_purchase(&self) -> bool {
        self.inner.core.is_ready()
    }

    fn restore_purchases(&self) -> bool {
        if !self.inner.core.is_ready() {
            tracing::warn!("restore rejected: billing not initialized");
            return false;
        }
        self.inner.start_restore();
        true
    }

    fn send_request(&self, purchase_id: i32, product_id: &str, _developer_payload: &str) -> bool {
        if let Err(err) = self.inner.core.begin_purchase(product_id) {
            tracing::warn!(purchase_id, product_id, "purchase rejected: {}", err);
            return false;
        }
        // Held across the call so an early response finds its entry.
        let mut requests = self
            .inner
            .purchase_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let request_id = self.inner.service.initiate_purchase_request(product_id);
        tracing::debug!(purchase_id, product_id, request_id = %request_id, "purchase requested");
        requests.insert(request_id, product_id.to_string());
        true
    }

    /// No server-side consumption: the product only leaves the owned set.
    fn consume_purchase(&self, product_id: &str) -> bool {
        let core = &self.inner.core;
        if !core.is_ready() {
            return false;
        }
        if !core.owned().remove(product_id) {
            tracing::warn!(product_id, "consume rejected: product not owned");
            return false;
        }
        true
    }

    fn request_product_details(&self, product_id: &str) -> bool {
        if !self.inner.core.is_ready() {
            return false;
        }
        let skus = vec![product_id.to_string()];
        let mut requests = self
            .inner
            .details_requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let request_id = self.inner.service.initiate_item_data_request(&skus);
        requests.insert(request_id, skus);
        true
    }

    /// Responses never come back through host activities.
    fn on_activity_result(&self, _request_code: i32, _result_code: i32, _data: Option<Bundle>) -> bool {
        false
    }
}

impl Drop for AmazonBillingProvider {
    fn drop(&mut self) {
        let handle = self
            .inner
            .event_loop
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
        self.inner.core.tasks().cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BillingErrorCode;
    use crate::observer::PurchaseObserver;
    use crate::properties::keys;
    use crate::state::ProviderState;
    use crate::test_utils::{
        assert_quiet, next_event, wait_until, CountingProgress, MockPurchasingService, ObserverEvent,
        PurchasingCall, RecordingObserver,
    };
    use crate::transport::purchasing::{ItemData, Receipt};
    use tokio::runtime::Handle;
    use tokio::sync::mpsc::UnboundedReceiver;

    struct Harness {
        provider: AmazonBillingProvider,
        service: Arc<MockPurchasingService>,
        progress: Arc<CountingProgress>,
        events: UnboundedReceiver<ObserverEvent>,
    }

    fn harness() -> Harness {
        let service = Arc::new(MockPurchasingService::new());
        let progress = Arc::new(CountingProgress::default());
        let context = ProviderContext::new(Handle::current()).with_progress(progress.clone());
        let provider = AmazonBillingProvider::new(service.clone(), AmazonConfig::default(), context);
        let (observer, events) = RecordingObserver::channel();
        provider.set_purchase_observer(observer);
        Harness {
            provider,
            service,
            progress,
            events,
        }
    }

    /// Initialize and return the request id of the startup restore.
    async fn initialize(h: &Harness) -> RequestId {
        h.provider.initialize();
        assert!(matches!(h.service.next_call().await, PurchasingCall::UserId(_)));
        match h.service.next_call().await {
            PurchasingCall::PurchaseUpdates(id, Offset::Beginning) => id,
            other => panic!("expected a purchase updates request, got {:?}", other),
        }
    }

    fn receipt(sku: &str, item_type: ItemType) -> Receipt {
        Receipt {
            sku: sku.into(),
            item_type,
            purchase_token: format!("tok-{}", sku),
            subscription_period: None,
        }
    }

    fn updates(request_id: &str, receipts: Vec<Receipt>, offset: Offset, is_more: bool) -> PurchasingEvent {
        PurchasingEvent::PurchaseUpdates(PurchaseUpdatesResponse {
            request_id: request_id.into(),
            status: RequestStatus::Successful,
            receipts,
            revoked_skus: Vec::new(),
            offset,
            is_more,
        })
    }

    async fn ready(h: &mut Harness) {
        let restore = initialize(h).await;
        h.service
            .emit(updates(&restore, Vec::new(), Offset::Beginning, false));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::StateChanged(String::new(), PurchaseState::Restored)
        );
    }

    #[tokio::test]
    async fn initialize_registers_once() {
        let h = harness();
        assert!(!h.provider.can_make_purchase());
        assert!(!h.provider.enable_updates());

        initialize(&h).await;
        h.provider.initialize();
        assert_eq!(h.service.registrations(), 1);
        assert_eq!(h.service.calls().len(), 2);
        assert_eq!(h.provider.state(), ProviderState::Ready);
        assert!(h.provider.can_make_purchase());
        assert!(h.provider.confirm_delivery(1));
    }

    #[tokio::test]
    async fn restore_follows_the_offset_and_skips_consumables() {
        let mut h = harness();
        let first = initialize(&h).await;

        h.service.emit(PurchasingEvent::PurchaseUpdates(PurchaseUpdatesResponse {
            request_id: first,
            status: RequestStatus::Successful,
            receipts: vec![
                receipt("remove_ads", ItemType::Entitled),
                receipt("coins", ItemType::Consumable),
                receipt("pro", ItemType::Subscription),
            ],
            revoked_skus: vec!["old_pack".into()],
            offset: Offset::Token("page-2".into()),
            is_more: true,
        }));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::StateChanged("remove_ads".into(), PurchaseState::Restored)
        );
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::StateChanged("pro".into(), PurchaseState::Restored)
        );

        let second = match h.service.next_call().await {
            PurchasingCall::PurchaseUpdates(id, offset) => {
                assert_eq!(offset, Offset::Token("page-2".into()));
                id
            }
            other => panic!("expected a follow-up request, got {:?}", other),
        };
        h.service.emit(updates(
            &second,
            vec![receipt("remove_ads", ItemType::Entitled), receipt("level_pack", ItemType::Entitled)],
            Offset::Token("page-3".into()),
            false,
        ));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::StateChanged("level_pack".into(), PurchaseState::Restored)
        );
        assert_quiet(&mut h.events).await;

        assert_eq!(h.service.calls().len(), 3);
        assert_eq!(h.provider.get_purchase_list(), r#"["level_pack","pro","remove_ads"]"#);
        assert!(!h.provider.core().owned().contains("coins"));
        assert_eq!(h.progress.shows(), 1);
        assert_eq!(h.progress.dismissals(), 1);
    }

    #[tokio::test]
    async fn failed_restore_reports_without_sentinel() {
        let mut h = harness();
        let restore = initialize(&h).await;

        h.service.emit(PurchasingEvent::PurchaseUpdates(PurchaseUpdatesResponse {
            request_id: restore,
            status: RequestStatus::Failed,
            receipts: Vec::new(),
            revoked_skus: Vec::new(),
            offset: Offset::Beginning,
            is_more: false,
        }));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::ProviderError(BillingErrorCode::VendorRejected)
        );
        assert_quiet(&mut h.events).await;
    }

    #[tokio::test]
    async fn superseded_restore_is_ignored() {
        let mut h = harness();
        let stale = initialize(&h).await;
        assert!(h.provider.restore_purchases());
        let current = match h.service.next_call().await {
            PurchasingCall::PurchaseUpdates(id, Offset::Beginning) => id,
            other => panic!("expected a purchase updates request, got {:?}", other),
        };

        h.service.emit(updates(
            &stale,
            vec![receipt("remove_ads", ItemType::Entitled)],
            Offset::Beginning,
            false,
        ));
        h.service.emit(updates(
            &current,
            vec![receipt("remove_ads", ItemType::Entitled)],
            Offset::Beginning,
            false,
        ));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::StateChanged("remove_ads".into(), PurchaseState::Restored)
        );
        assert_quiet(&mut h.events).await;
    }

    /// Starts a new restore from inside the first restore callback, while
    /// the page that produced it is still being processed.
    struct RestartingObserver {
        inner: Mutex<Option<Arc<AmazonInner>>>,
        states: Mutex<Vec<String>>,
    }

    impl PurchaseObserver for RestartingObserver {
        fn on_purchase_state_changed(&self, product_id: &str, _state: PurchaseState) {
            self.states.lock().unwrap().push(product_id.to_string());
            if let Some(inner) = self.inner.lock().unwrap().take() {
                inner.start_restore();
            }
        }

        fn on_product_details_received(&self, _product_id: &str) {}

        fn on_product_details_error(&self, _product_id: &str, _message: &str) {}
    }

    #[tokio::test]
    async fn restore_started_mid_page_keeps_progress_balanced() {
        let h = harness();
        let first = initialize(&h).await;
        let observer = Arc::new(RestartingObserver {
            inner: Mutex::new(Some(Arc::clone(&h.provider.inner))),
            states: Mutex::new(Vec::new()),
        });
        h.provider.set_purchase_observer(observer.clone());
        assert_eq!(h.progress.shows(), 1);

        h.service.emit(updates(
            &first,
            vec![receipt("remove_ads", ItemType::Entitled)],
            Offset::Beginning,
            true,
        ));
        let second = match h.service.next_call().await {
            PurchasingCall::PurchaseUpdates(id, Offset::Beginning) => id,
            other => panic!("expected a purchase updates request, got {:?}", other),
        };
        assert_eq!(h.progress.shows(), 1);
        assert_eq!(h.progress.dismissals(), 0);

        h.service.emit(updates(
            &second,
            vec![receipt("remove_ads", ItemType::Entitled)],
            Offset::Beginning,
            false,
        ));
        wait_until(|| h.progress.dismissals() == 1).await;
        assert_eq!(h.progress.shows(), 1);
        assert_eq!(*observer.states.lock().unwrap(), vec!["remove_ads", "remove_ads"]);
        assert_eq!(h.service.calls().len(), 3);
    }

    #[tokio::test]
    async fn subscription_purchase_reports_parent_sku() {
        let mut h = harness();
        ready(&mut h).await;
        h.provider.product_set_type("pro_monthly", "subscription");

        assert!(h.provider.send_request(4, "pro_monthly", ""));
        let request_id = match h.service.next_call().await {
            PurchasingCall::Purchase(id, sku) => {
                assert_eq!(sku, "pro_monthly");
                id
            }
            other => panic!("expected a purchase request, got {:?}", other),
        };

        let mut parent = receipt("pro", ItemType::Subscription);
        parent.subscription_period = Some("2024-01-01".into());
        h.service.emit(PurchasingEvent::Purchase(PurchaseResponse {
            request_id,
            status: PurchaseRequestStatus::Successful,
            receipt: Some(parent),
        }));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::StateChanged("pro".into(), PurchaseState::Purchased)
        );
        assert!(h.provider.core().owned().contains("pro"));
        assert_eq!(h.provider.get_purchase_property("pro", keys::PURCHASE_TOKEN), "tok-pro");
        assert_eq!(h.provider.get_purchase_property("pro", keys::SUBSCRIPTION_PERIOD), "2024-01-01");
    }

    #[tokio::test]
    async fn failed_purchase_uses_requested_sku() {
        let mut h = harness();
        ready(&mut h).await;
        h.provider.product_set_type("gems", "consumable");

        assert!(h.provider.send_request(1, "gems", ""));
        let PurchasingCall::Purchase(request_id, _) = h.service.next_call().await else {
            panic!("expected a purchase request");
        };
        h.service.emit(PurchasingEvent::Purchase(PurchaseResponse {
            request_id: request_id.clone(),
            status: PurchaseRequestStatus::InvalidSku,
            receipt: None,
        }));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::StateChanged("gems".into(), PurchaseState::ItemUnavailable)
        );

        // Replayed responses are dropped.
        h.service.emit(PurchasingEvent::Purchase(PurchaseResponse {
            request_id,
            status: PurchaseRequestStatus::Failed,
            receipt: None,
        }));
        assert_quiet(&mut h.events).await;
    }

    #[tokio::test]
    async fn sdk_and_user_id_are_captured() {
        let mut h = harness();
        ready(&mut h).await;
        let PurchasingCall::UserId(request_id) = h.service.calls()[0].clone() else {
            panic!("expected the user id request first");
        };

        h.service.emit(PurchasingEvent::SdkAvailable { sandbox: true });
        h.service.emit(PurchasingEvent::UserId(UserIdResponse {
            request_id,
            status: RequestStatus::Successful,
            user_id: Some("amzn1.account.42".into()),
        }));
        crate::test_utils::wait_until(|| h.provider.user_id().is_some()).await;
        assert!(h.provider.is_sandbox());
        assert_eq!(h.provider.user_id().as_deref(), Some("amzn1.account.42"));
    }

    #[tokio::test]
    async fn item_data_fills_product_details() {
        let mut h = harness();
        ready(&mut h).await;

        assert!(h.provider.request_product_details("level_pack"));
        let PurchasingCall::ItemData(request_id, skus) = h.service.next_call().await else {
            panic!("expected an item data request");
        };
        assert_eq!(skus, vec!["level_pack"]);
        h.service.emit(PurchasingEvent::ItemData(ItemDataResponse {
            request_id,
            status: RequestStatus::Successful,
            items: vec![ItemData {
                sku: "level_pack".into(),
                item_type: ItemType::Entitled,
                price: "$1.99".into(),
                title: "Level pack".into(),
                description: "Ten more levels".into(),
                small_icon_url: String::new(),
            }],
            unavailable_skus: Vec::new(),
        }));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::DetailsReceived("level_pack".into())
        );
        assert_eq!(h.provider.get_purchase_property("level_pack", keys::TITLE), "Level pack");

        assert!(h.provider.request_product_details("missing"));
        let PurchasingCall::ItemData(request_id, _) = h.service.next_call().await else {
            panic!("expected an item data request");
        };
        h.service.emit(PurchasingEvent::ItemData(ItemDataResponse {
            request_id,
            status: RequestStatus::Successful,
            items: Vec::new(),
            unavailable_skus: vec!["missing".into()],
        }));
        assert_eq!(
            next_event(&mut h.events).await,
            ObserverEvent::DetailsError("missing".into(), PRODUCT_NOT_FOUND.into())
        );
    }

    #[tokio::test]
    async fn consume_is_local_and_activity_results_are_ignored() {
        let mut h = harness();
        let restore = initialize(&h).await;
        h.service.emit(updates(
            &restore,
            vec![receipt("remove_ads", ItemType::Entitled)],
            Offset::Beginning,
            false,
        ));
        next_event(&mut h.events).await;

        assert!(h.provider.consume_purchase("remove_ads"));
        assert!(!h.provider.consume_purchase("remove_ads"));
        assert!(!h.provider.on_activity_result(0x1000, -1, None));
    }
}
