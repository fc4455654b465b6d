//! Host callback interfaces and their bridges into the library traits.
//!
//! Kotlin code implements the `*FFI` interfaces around the platform SDKs.
//! Each bridge wraps one of them and provides the matching `iapkit_lib`
//! trait. Blocking host calls made from async trait methods run on the
//! runtime's blocking pool.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use iapkit_lib::bundle::Bundle;
use iapkit_lib::observer::{ActivityLauncher, ActivityRequest, ProgressIndicator, PurchaseObserver};
use iapkit_lib::transport::iap_service::IapConnector;
use iapkit_lib::transport::play::{
    OwnedPurchase, PlayBillingClient, PurchaseFlowRequest, PurchasesResult, SkuDetails, SkuDetailsResult,
};
use iapkit_lib::transport::purchasing::{Offset, PurchasingEvent, PurchasingService, RequestId};
use iapkit_lib::{BillingError, PurchaseState};

use crate::{bundle_from_entries, bundle_to_entries, BundleEntry, IapMobileError};

/// Run a blocking host call off the async workers.
async fn blocking<T, F>(call: F) -> iapkit_lib::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, IapMobileError> + Send + 'static,
{
    tokio::task::spawn_blocking(call)
        .await
        .map_err(|e| BillingError::Internal(format!("host callback failed: {}", e)))?
        .map_err(BillingError::from)
}

// ============================================================================
// Host UI
// ============================================================================

/// Receives purchase outcomes.
///
/// # Thread Safety
///
/// Called from runtime worker threads.
#[uniffi::export(callback_interface)]
pub trait PurchaseObserverFFI: Send + Sync {
    /// `state` is the canonical code: 0 purchased, 1 cancelled, 2 item
    /// unavailable, 3 already owned, 5 restored.
    fn on_purchase_state_changed(&self, product_id: String, state: i32);

    fn on_product_details_received(&self, product_id: String);

    fn on_product_details_error(&self, product_id: String, message: String);

    /// `code` is the numeric error code of the failure. `upgrade_url` is set
    /// when the store service must be upgraded first.
    fn on_provider_error(&self, code: i32, message: String, upgrade_url: Option<String>);
}

/// Modal progress UI.
#[uniffi::export(callback_interface)]
pub trait ProgressIndicatorFFI: Send + Sync {
    fn show(&self);

    /// May be called when nothing is shown.
    fn dismiss(&self);
}

/// Starts store activities for a result.
#[uniffi::export(callback_interface)]
pub trait ActivityLauncherFFI: Send + Sync {
    fn start_activity_for_result(
        &self,
        component: String,
        extras: Vec<BundleEntry>,
        request_code: i32,
    ) -> Result<(), IapMobileError>;
}

/// Bridge from [`PurchaseObserverFFI`] to [`PurchaseObserver`].
pub struct ObserverBridge {
    ffi: Arc<dyn PurchaseObserverFFI>,
}

impl ObserverBridge {
    pub fn new(ffi: Arc<dyn PurchaseObserverFFI>) -> Self {
        Self { ffi }
    }
}

impl PurchaseObserver for ObserverBridge {
    fn on_purchase_state_changed(&self, product_id: &str, state: PurchaseState) {
        self.ffi
            .on_purchase_state_changed(product_id.to_string(), state.code());
    }

    fn on_product_details_received(&self, product_id: &str) {
        self.ffi.on_product_details_received(product_id.to_string());
    }

    fn on_product_details_error(&self, product_id: &str, message: &str) {
        self.ffi
            .on_product_details_error(product_id.to_string(), message.to_string());
    }

    fn on_provider_error(&self, error: &BillingError) {
        self.ffi.on_provider_error(
            error.code() as i32,
            error.message(),
            error.upgrade_url().map(str::to_string),
        );
    }
}

/// Bridge from [`ProgressIndicatorFFI`] to [`ProgressIndicator`].
pub struct ProgressBridge {
    ffi: Arc<dyn ProgressIndicatorFFI>,
}

impl ProgressBridge {
    pub fn new(ffi: Arc<dyn ProgressIndicatorFFI>) -> Self {
        Self { ffi }
    }
}

impl ProgressIndicator for ProgressBridge {
    fn show(&self) {
        self.ffi.show();
    }

    fn dismiss(&self) {
        self.ffi.dismiss();
    }
}

/// Bridge from [`ActivityLauncherFFI`] to [`ActivityLauncher`].
pub struct LauncherBridge {
    ffi: Arc<dyn ActivityLauncherFFI>,
}

impl LauncherBridge {
    pub fn new(ffi: Arc<dyn ActivityLauncherFFI>) -> Self {
        Self { ffi }
    }
}

impl ActivityLauncher for LauncherBridge {
    fn start_activity_for_result(&self, request: ActivityRequest, request_code: i32) -> iapkit_lib::Result<()> {
        self.ffi
            .start_activity_for_result(request.component, bundle_to_entries(&request.extras), request_code)
            .map_err(BillingError::from)
    }
}

// ============================================================================
// Play Billing Service
// ============================================================================

/// Parameters for the store purchase UI.
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct PurchaseFlowRequestFFI {
    pub sku: String,
    pub item_type: String,
    pub developer_payload: String,
    /// Pass back unchanged with the activity result.
    pub request_code: i32,
}

impl From<PurchaseFlowRequest> for PurchaseFlowRequestFFI {
    fn from(request: PurchaseFlowRequest) -> Self {
        Self {
            sku: request.sku,
            item_type: request.item_type,
            developer_payload: request.developer_payload,
            request_code: request.request_code,
        }
    }
}

/// An owned purchase as the store signed it.
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct OwnedPurchaseFFI {
    pub purchase_json: String,
    pub signature: String,
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct PurchasesResultFFI {
    pub response_code: i32,
    pub purchases: Vec<OwnedPurchaseFFI>,
}

/// SKU details as the raw JSON strings the store returns.
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct SkuDetailsResultFFI {
    pub response_code: i32,
    pub details_json: Vec<String>,
}

/// In-app billing service calls. Methods may block.
#[uniffi::export(callback_interface)]
pub trait PlayBillingClientFFI: Send + Sync {
    fn connect(&self) -> Result<(), IapMobileError>;

    fn is_billing_supported(&self, item_type: String) -> Result<i32, IapMobileError>;

    fn get_sku_details(&self, item_type: String, skus: Vec<String>) -> Result<SkuDetailsResultFFI, IapMobileError>;

    fn get_purchases(&self, item_type: String) -> Result<PurchasesResultFFI, IapMobileError>;

    /// Launch the purchase UI and return the immediate response code.
    fn launch_purchase_flow(&self, request: PurchaseFlowRequestFFI) -> Result<i32, IapMobileError>;

    fn consume_purchase(&self, purchase_token: String) -> Result<i32, IapMobileError>;
}

/// Bridge from [`PlayBillingClientFFI`] to [`PlayBillingClient`].
pub struct PlayClientBridge {
    ffi: Arc<dyn PlayBillingClientFFI>,
}

impl PlayClientBridge {
    pub fn new(ffi: Arc<dyn PlayBillingClientFFI>) -> Self {
        Self { ffi }
    }
}

impl std::fmt::Debug for PlayClientBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlayClientBridge")
            .field("ffi", &"<PlayBillingClientFFI>")
            .finish()
    }
}

#[async_trait]
impl PlayBillingClient for PlayClientBridge {
    async fn connect(&self) -> iapkit_lib::Result<()> {
        let ffi = Arc::clone(&self.ffi);
        blocking(move || ffi.connect()).await
    }

    async fn is_billing_supported(&self, item_type: &str) -> iapkit_lib::Result<i32> {
        let ffi = Arc::clone(&self.ffi);
        let item_type = item_type.to_string();
        blocking(move || ffi.is_billing_supported(item_type)).await
    }

    async fn get_sku_details(&self, item_type: &str, skus: &[String]) -> iapkit_lib::Result<SkuDetailsResult> {
        let ffi = Arc::clone(&self.ffi);
        let item_type = item_type.to_string();
        let skus = skus.to_vec();
        let result = blocking(move || ffi.get_sku_details(item_type, skus)).await?;
        let details = result
            .details_json
            .iter()
            .map(|json| SkuDetails::from_json(json))
            .collect::<iapkit_lib::Result<Vec<_>>>()?;
        Ok(SkuDetailsResult {
            response_code: result.response_code,
            details,
        })
    }

    async fn get_purchases(&self, item_type: &str) -> iapkit_lib::Result<PurchasesResult> {
        let ffi = Arc::clone(&self.ffi);
        let item_type = item_type.to_string();
        let result = blocking(move || ffi.get_purchases(item_type)).await?;
        let purchases = result
            .purchases
            .iter()
            .map(|owned| OwnedPurchase::parse(&owned.purchase_json, &owned.signature))
            .collect::<iapkit_lib::Result<Vec<_>>>()?;
        Ok(PurchasesResult {
            response_code: result.response_code,
            purchases,
        })
    }

    async fn launch_purchase_flow(&self, request: PurchaseFlowRequest) -> iapkit_lib::Result<i32> {
        let ffi = Arc::clone(&self.ffi);
        blocking(move || ffi.launch_purchase_flow(request.into())).await
    }

    async fn consume_purchase(&self, purchase_token: &str) -> iapkit_lib::Result<i32> {
        let ffi = Arc::clone(&self.ffi);
        let purchase_token = purchase_token.to_string();
        blocking(move || ffi.consume_purchase(purchase_token)).await
    }
}

// ============================================================================
// IAP Service
// ============================================================================

/// Raw calls on the bound IAP service. Methods may block.
///
/// Responses are the bundles the service returns, flattened to entries.
#[uniffi::export(callback_interface)]
pub trait IapConnectorFFI: Send + Sync {
    fn is_package_installed(&self) -> bool;

    fn package_signature_hash(&self) -> Option<i32>;

    fn bind(&self) -> Result<(), IapMobileError>;

    fn unbind(&self);

    fn init(&self, mode: i32) -> Result<Vec<BundleEntry>, IapMobileError>;

    fn get_item_list(
        &self,
        mode: i32,
        package_name: String,
        item_group_id: String,
        start: u32,
        end: u32,
        item_type: String,
    ) -> Result<Vec<BundleEntry>, IapMobileError>;

    fn get_items_inbox(
        &self,
        package_name: String,
        item_group_id: String,
        start: u32,
        end: u32,
        start_date: String,
        end_date: String,
    ) -> Result<Vec<BundleEntry>, IapMobileError>;
}

/// Bridge from [`IapConnectorFFI`] to [`IapConnector`].
pub struct IapConnectorBridge {
    ffi: Arc<dyn IapConnectorFFI>,
}

impl IapConnectorBridge {
    pub fn new(ffi: Arc<dyn IapConnectorFFI>) -> Self {
        Self { ffi }
    }
}

#[async_trait]
impl IapConnector for IapConnectorBridge {
    fn is_package_installed(&self) -> bool {
        self.ffi.is_package_installed()
    }

    fn package_signature_hash(&self) -> Option<i32> {
        self.ffi.package_signature_hash()
    }

    async fn bind(&self) -> iapkit_lib::Result<()> {
        let ffi = Arc::clone(&self.ffi);
        blocking(move || ffi.bind()).await
    }

    async fn unbind(&self) {
        let ffi = Arc::clone(&self.ffi);
        if let Err(err) = blocking(move || {
            ffi.unbind();
            Ok(())
        })
        .await
        {
            tracing::warn!("unbind failed: {}", err);
        }
    }

    async fn init(&self, mode: i32) -> iapkit_lib::Result<Bundle> {
        let ffi = Arc::clone(&self.ffi);
        blocking(move || ffi.init(mode)).await.map(bundle_from_entries)
    }

    async fn get_item_list(
        &self,
        mode: i32,
        package_name: &str,
        item_group_id: &str,
        start: u32,
        end: u32,
        item_type: &str,
    ) -> iapkit_lib::Result<Bundle> {
        let ffi = Arc::clone(&self.ffi);
        let (package_name, item_group_id, item_type) =
            (package_name.to_string(), item_group_id.to_string(), item_type.to_string());
        blocking(move || ffi.get_item_list(mode, package_name, item_group_id, start, end, item_type))
            .await
            .map(bundle_from_entries)
    }

    async fn get_items_inbox(
        &self,
        package_name: &str,
        item_group_id: &str,
        start: u32,
        end: u32,
        start_date: &str,
        end_date: &str,
    ) -> iapkit_lib::Result<Bundle> {
        let ffi = Arc::clone(&self.ffi);
        let (package_name, item_group_id, start_date, end_date) = (
            package_name.to_string(),
            item_group_id.to_string(),
            start_date.to_string(),
            end_date.to_string(),
        );
        blocking(move || ffi.get_items_inbox(package_name, item_group_id, start, end, start_date, end_date))
            .await
            .map(bundle_from_entries)
    }
}

// ============================================================================
// Alternate Store
// ============================================================================

/// Request side of the alternate store SDK.
///
/// Each call returns the SDK request id. Responses are handed back through
/// `BillingProviderFFI::deliver_purchasing_event`.
#[uniffi::export(callback_interface)]
pub trait PurchasingServiceFFI: Send + Sync {
    /// Start listening for store responses.
    fn register_observer(&self);

    fn initiate_get_user_id_request(&self) -> String;

    /// `offset` of `None` starts from the beginning of the history.
    fn initiate_purchase_updates_request(&self, offset: Option<String>) -> String;

    fn initiate_purchase_request(&self, sku: String) -> String;

    fn initiate_item_data_request(&self, skus: Vec<String>) -> String;
}

/// Sending half of the provider's event channel, filled in on registration.
#[derive(Clone, Default)]
pub struct EventSender {
    tx: Arc<Mutex<Option<mpsc::UnboundedSender<PurchasingEvent>>>>,
}

impl EventSender {
    /// False until the provider has registered, or after it is gone.
    pub fn send(&self, event: PurchasingEvent) -> bool {
        match self.tx.lock().unwrap_or_else(PoisonError::into_inner).as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => {
                tracing::warn!("purchasing event dropped: provider not registered");
                false
            }
        }
    }

    fn set(&self, tx: mpsc::UnboundedSender<PurchasingEvent>) {
        *self.tx.lock().unwrap_or_else(PoisonError::into_inner) = Some(tx);
    }
}

/// Bridge from [`PurchasingServiceFFI`] to [`PurchasingService`].
pub struct PurchasingServiceBridge {
    ffi: Arc<dyn PurchasingServiceFFI>,
    events: EventSender,
}

impl PurchasingServiceBridge {
    pub fn new(ffi: Arc<dyn PurchasingServiceFFI>) -> Self {
        Self {
            ffi,
            events: EventSender::default(),
        }
    }

    /// Handle for delivering host responses.
    pub fn events(&self) -> EventSender {
        self.events.clone()
    }
}

impl PurchasingService for PurchasingServiceBridge {
    fn register_observer(&self, events: mpsc::UnboundedSender<PurchasingEvent>) {
        self.events.set(events);
        self.ffi.register_observer();
    }

    fn initiate_get_user_id_request(&self) -> RequestId {
        self.ffi.initiate_get_user_id_request()
    }

    fn initiate_purchase_updates_request(&self, offset: Offset) -> RequestId {
        let offset = match offset {
            Offset::Beginning => None,
            Offset::Token(token) => Some(token),
        };
        self.ffi.initiate_purchase_updates_request(offset)
    }

    fn initiate_purchase_request(&self, sku: &str) -> RequestId {
        self.ffi.initiate_purchase_request(sku.to_string())
    }

    fn initiate_item_data_request(&self, skus: &[String]) -> RequestId {
        self.ffi.initiate_item_data_request(skus.to_vec())
    }
}
