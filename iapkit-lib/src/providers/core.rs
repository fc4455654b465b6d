//! State shared by every vendor provider.
//!
//! [`ProviderCore`] owns the lifecycle state, the property store, the owned
//! set, the catalog, the single pending-purchase slot and the background task
//! slots. Vendor providers hold one inside their shared inner state and
//! drive it from host calls and background tasks alike.

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tokio::runtime::Handle;

use crate::errors::BillingError;
use crate::observer::{NoProgress, ProgressIndicator, PurchaseObserver};
use crate::product::{Product, ProductType, PurchaseRecord};
use crate::properties::{keys, OwnedSet, PropertyStore};
use crate::state::{ProviderState, PurchasePhase, PurchaseState, Vendor};
use crate::tasks::{TaskKind, TaskSlots};
use crate::Result;

/// Returned for product details that were never fetched or do not exist.
pub const PRODUCT_NOT_FOUND: &str = "Product ID not found";

/// Runtime and host UI a provider runs against.
#[derive(Clone)]
pub struct ProviderContext {
    pub runtime: Handle,
    pub progress: Arc<dyn ProgressIndicator>,
}

impl ProviderContext {
    pub fn new(runtime: Handle) -> Self {
        Self {
            runtime,
            progress: Arc::new(NoProgress),
        }
    }

    /// Context on the runtime of the calling task.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| BillingError::Internal(format!("no tokio runtime: {}", e)))
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressIndicator>) -> Self {
        self.progress = progress;
        self
    }
}

/// Shared, swappable observer reference.
///
/// Purchase-state callbacks are held back while updates are paused and
/// replayed in order once they resume. Callbacks are never invoked with a
/// lock held.
#[derive(Clone, Default)]
pub struct ObserverHandle {
    inner: Arc<ObserverInner>,
}

#[derive(Default)]
struct ObserverInner {
    observer: RwLock<Option<Arc<dyn PurchaseObserver>>>,
    gate: Mutex<UpdateGate>,
}

/// Pause state and the updates held behind it. `replaying` is set while one
/// caller delivers the held queue; updates arriving meanwhile queue behind it.
#[derive(Default)]
struct UpdateGate {
    paused: bool,
    replaying: bool,
    held: VecDeque<(String, PurchaseState)>,
}

impl ObserverHandle {
    pub fn set(&self, observer: Arc<dyn PurchaseObserver>) {
        *self
            .inner
            .observer
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(observer);
    }

    fn get(&self) -> Option<Arc<dyn PurchaseObserver>> {
        self.inner
            .observer
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn gate(&self) -> MutexGuard<'_, UpdateGate> {
        self.inner
            .gate
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn purchase_state_changed(&self, product_id: &str, state: PurchaseState) {
        {
            let mut gate = self.gate();
            if gate.paused || gate.replaying {
                gate.held.push_back((product_id.to_string(), state));
                return;
            }
        }
        self.deliver(product_id, state);
    }

    fn deliver(&self, product_id: &str, state: PurchaseState) {
        match self.get() {
            Some(observer) => observer.on_purchase_state_changed(product_id, state),
            None => tracing::warn!(product_id, ?state, "no observer set, dropping purchase update"),
        }
    }

    pub fn product_details_received(&self, product_id: &str) {
        if let Some(observer) = self.get() {
            observer.on_product_details_received(product_id);
        }
    }

    pub fn product_details_error(&self, product_id: &str, message: &str) {
        if let Some(observer) = self.get() {
            observer.on_product_details_error(product_id, message);
        }
    }

    pub fn report_error(&self, error: &BillingError) {
        if let Some(observer) = self.get() {
            observer.on_provider_error(error);
        }
    }

    pub fn pause(&self) {
        self.gate().paused = true;
    }

    /// Resume delivery and replay held updates, oldest first. Updates that
    /// arrive during the replay are delivered after everything held before.
    pub fn resume(&self) {
        {
            let mut gate = self.gate();
            gate.paused = false;
            if gate.replaying {
                return;
            }
            gate.replaying = true;
        }
        loop {
            let next = {
                let mut gate = self.gate();
                let next = if gate.paused { None } else { gate.held.pop_front() };
                if next.is_none() {
                    gate.replaying = false;
                }
                next
            };
            match next {
                Some((product_id, state)) => self.deliver(&product_id, state),
                None => break,
            }
        }
    }

    pub fn is_paused(&self) -> bool {
        self.gate().paused
    }
}

#[derive(Debug, Default)]
struct PurchaseSlot {
    product_id: Option<String>,
    phase: PurchasePhase,
}

/// Vendor-independent provider state.
pub struct ProviderCore {
    vendor: Vendor,
    state: RwLock<ProviderState>,
    properties: PropertyStore,
    owned: OwnedSet,
    catalog: RwLock<HashMap<String, Product>>,
    product_types: RwLock<HashMap<String, ProductType>>,
    purchase: Mutex<PurchaseSlot>,
    observer: ObserverHandle,
    progress: Arc<dyn ProgressIndicator>,
    tasks: TaskSlots,
}

impl ProviderCore {
    pub fn new(vendor: Vendor, context: ProviderContext) -> Self {
        Self {
            vendor,
            state: RwLock::new(ProviderState::Uninitialized),
            properties: PropertyStore::new(),
            owned: OwnedSet::new(),
            catalog: RwLock::new(HashMap::new()),
            product_types: RwLock::new(HashMap::new()),
            purchase: Mutex::new(PurchaseSlot::default()),
            observer: ObserverHandle::default(),
            progress: context.progress.clone(),
            tasks: TaskSlots::new(context.runtime, context.progress),
        }
    }

    pub fn vendor(&self) -> Vendor {
        self.vendor
    }

    pub fn properties(&self) -> &PropertyStore {
        &self.properties
    }

    pub fn owned(&self) -> &OwnedSet {
        &self.owned
    }

    pub fn observer(&self) -> &ObserverHandle {
        &self.observer
    }

    pub fn progress(&self) -> &Arc<dyn ProgressIndicator> {
        &self.progress
    }

    pub fn tasks(&self) -> &TaskSlots {
        &self.tasks
    }

    // Lifecycle

    pub fn state(&self) -> ProviderState {
        *self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: ProviderState) {
        *self.state.write().unwrap_or_else(PoisonError::into_inner) = state;
    }

    pub fn is_ready(&self) -> bool {
        self.state() == ProviderState::Ready
    }

    pub fn require_ready(&self) -> Result<()> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(BillingError::NotInitialized)
        }
    }

    /// Move Uninitialized to Initializing. False when already past that.
    pub fn begin_initialize(&self) -> bool {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if *state != ProviderState::Uninitialized {
            tracing::debug!(vendor = %self.vendor, state = ?*state, "initialize ignored");
            return false;
        }
        *state = ProviderState::Initializing;
        true
    }

    pub fn mark_ready(&self) {
        self.set_state(ProviderState::Ready);
        tracing::info!(vendor = %self.vendor, "billing provider ready");
    }

    /// Return to Uninitialized after a failed initialization and tell the host.
    pub fn fail_initialize(&self, error: &BillingError) {
        self.set_state(ProviderState::Uninitialized);
        tracing::error!(vendor = %self.vendor, "initialization failed: {}", error);
        self.observer.report_error(error);
    }

    // Products

    /// Remember the host-declared type and mirror it into the `itemType`
    /// property.
    pub fn register_product_type(&self, product_id: &str, product_type: ProductType) {
        self.properties
            .set(product_id, keys::ITEM_TYPE, product_type.as_str());
        self.product_types
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id.to_string(), product_type);
    }

    pub fn product_type(&self, product_id: &str) -> Option<ProductType> {
        self.product_types
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(product_id)
            .copied()
    }

    /// Replace the catalog entry and mirror it into the property store.
    pub fn store_product(&self, product: Product) {
        self.properties
            .set_all(&product.product_id, product.to_properties());
        self.catalog
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product.product_id.clone(), product);
    }

    pub fn product(&self, product_id: &str) -> Option<Product> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(product_id)
            .cloned()
    }

    /// Catalog entry as JSON, or [`PRODUCT_NOT_FOUND`].
    pub fn product_details_json(&self, product_id: &str) -> String {
        self.product(product_id)
            .map(|product| product.to_json())
            .unwrap_or_else(|| PRODUCT_NOT_FOUND.to_string())
    }

    /// Upsert a purchase record. Ownership is granted for purchased and
    /// restored states only.
    pub fn record_purchase(&self, record: &PurchaseRecord, state: PurchaseState) {
        let mut props = record.to_properties();
        props.push((keys::PURCHASE_STATE, state.code().to_string()));
        self.properties.set_all(&record.product_id, props);
        if state.grants_ownership() && self.owned.insert(&record.product_id) {
            tracing::debug!(product_id = %record.product_id, "added to owned set");
        }
    }

    // Purchase slot

    /// Validate and claim the single purchase slot for `product_id`.
    pub fn begin_purchase(&self, product_id: &str) -> Result<ProductType> {
        self.require_ready()?;
        let product_type = self.product_type(product_id).ok_or_else(|| {
            BillingError::invalid_product(product_id, "product type was never registered")
        })?;
        let mut slot = self.purchase.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.phase == PurchasePhase::AwaitingVendorResponse {
            return Err(BillingError::PurchaseInProgress {
                product_id: slot.product_id.clone().unwrap_or_default(),
            });
        }
        slot.product_id = Some(product_id.to_string());
        slot.phase = PurchasePhase::AwaitingVendorResponse;
        tracing::info!(vendor = %self.vendor, product_id, "purchase started");
        Ok(product_type)
    }

    pub fn pending_purchase(&self) -> Option<String> {
        self.purchase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .product_id
            .clone()
    }

    pub fn purchase_phase(&self) -> PurchasePhase {
        self.purchase
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .phase
    }

    /// Close the purchase slot and emit its single terminal callback.
    ///
    /// The product id comes from the vendor response when present, else from
    /// the pending marker.
    pub fn resolve_purchase(&self, vendor_product_id: Option<&str>, state: PurchaseState) -> String {
        let marker = {
            let mut slot = self.purchase.lock().unwrap_or_else(PoisonError::into_inner);
            slot.phase = PurchasePhase::Resolved;
            slot.product_id.take()
        };
        let product_id = vendor_product_id
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .or(marker)
            .unwrap_or_default();
        tracing::info!(vendor = %self.vendor, product_id = %product_id, ?state, "purchase resolved");
        self.observer.purchase_state_changed(&product_id, state);
        product_id
    }

    // Background work

    /// Run `future` in `kind`'s slot. Errors are logged and reported to the
    /// observer; a cancelled task reports nothing.
    pub fn spawn<F>(&self, kind: TaskKind, future: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let observer = self.observer.clone();
        let vendor = self.vendor;
        self.tasks.spawn(kind, async move {
            if let Err(err) = future.await {
                tracing::error!(%vendor, ?kind, "background task failed: {}", err);
                observer.report_error(&err);
            }
        });
    }

    /// Run `future` outside the task slots.
    pub fn spawn_detached<F>(&self, future: F)
    where
        F: Future<Output = Result<()>> + Send + 'static,
    {
        let observer = self.observer.clone();
        let vendor = self.vendor;
        self.tasks.spawn_detached(async move {
            if let Err(err) = future.await {
                tracing::error!(%vendor, "background request failed: {}", err);
                observer.report_error(&err);
            }
        });
    }
}
