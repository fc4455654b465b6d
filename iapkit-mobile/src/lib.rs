//! IAPkit Mobile FFI Bindings
//!
//! This crate provides UniFFI bindings for IAPkit so an Android host
//! (Kotlin) can drive in-app purchases through one object regardless of the
//! store it ships to.
//!
//! # Architecture
//!
//! The host implements the vendor SDK surfaces as callback interfaces
//! ([`callbacks`]). A [`BillingProviderFFI`] owns a Tokio runtime and the
//! vendor provider, and bridges the callbacks into the library traits.
//!
//! # Thread Safety
//!
//! All exposed types are thread-safe. Observer callbacks arrive on runtime
//! worker threads; hosts must hop to their UI thread themselves.

pub mod callbacks;

pub use callbacks::{
    ActivityLauncherFFI, IapConnectorFFI, OwnedPurchaseFFI, PlayBillingClientFFI,
    ProgressIndicatorFFI, PurchaseFlowRequestFFI, PurchaseObserverFFI, PurchasesResultFFI,
    PurchasingServiceFFI, SkuDetailsResultFFI,
};

use std::sync::Arc;

use iapkit_lib::bundle::{Bundle, BundleValue};
use iapkit_lib::config::BillingConfig;
use iapkit_lib::providers::ProviderContext;
use iapkit_lib::transport::purchasing::{
    ItemData, ItemDataResponse, ItemType, Offset, PurchaseRequestStatus, PurchaseResponse,
    PurchaseUpdatesResponse, PurchasingEvent, Receipt, RequestStatus, UserIdResponse,
};
use iapkit_lib::{
    AmazonBillingProvider, BillingError, BillingProvider, GoogleBillingProvider, ProviderState,
    SamsungBillingProvider, Vendor,
};

// UniFFI scaffolding
uniffi::setup_scaffolding!();

// ============================================================================
// Error Types
// ============================================================================

/// Mobile-friendly error type.
#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum IapMobileError {
    /// Provider has not finished initialization.
    #[error("Not initialized: {msg}")]
    NotInitialized { msg: String },

    /// Store service missing or unsupported.
    #[error("Vendor unavailable: {msg}")]
    VendorUnavailable { msg: String },

    /// Product unknown, unregistered or not owned.
    #[error("Invalid product: {msg}")]
    InvalidProduct { msg: String },

    /// Another purchase is still waiting for the store.
    #[error("Purchase in progress: {msg}")]
    PurchaseInProgress { msg: String },

    /// Store answered with an error status.
    #[error("Vendor rejected ({code}): {msg}")]
    VendorRejected { code: i32, msg: String },

    /// Purchase could not be verified.
    #[error("Verification failed: {msg}")]
    VerificationFailed { msg: String },

    /// Store service must be upgraded first.
    #[error("Upgrade required: {msg}")]
    UpgradeRequired {
        msg: String,
        upgrade_url: Option<String>,
    },

    /// Transport layer error (IPC, network).
    #[error("Transport error: {msg}")]
    Transport { msg: String },

    /// Serialization/deserialization error.
    #[error("Serialization error: {msg}")]
    Serialization { msg: String },

    /// Configuration rejected.
    #[error("Invalid configuration: {msg}")]
    InvalidConfig { msg: String },

    /// Internal error (unexpected state).
    #[error("Internal error: {msg}")]
    Internal { msg: String },
}

impl From<BillingError> for IapMobileError {
    fn from(e: BillingError) -> Self {
        match e {
            BillingError::NotInitialized => Self::NotInitialized {
                msg: "billing provider is not initialized".to_string(),
            },
            BillingError::VendorUnavailable(msg) => Self::VendorUnavailable { msg },
            BillingError::InvalidProduct { product_id, reason } => Self::InvalidProduct {
                msg: format!("{}: {}", product_id, reason),
            },
            BillingError::PurchaseInProgress { product_id } => Self::PurchaseInProgress {
                msg: product_id,
            },
            BillingError::VendorRejected { code, message } => Self::VendorRejected { code, msg: message },
            BillingError::VerificationFailed(msg) => Self::VerificationFailed { msg },
            BillingError::UpgradeRequired {
                message,
                upgrade_url,
            } => Self::UpgradeRequired {
                msg: message,
                upgrade_url,
            },
            BillingError::Transport(msg) => Self::Transport { msg },
            BillingError::Serialization(msg) => Self::Serialization { msg },
            BillingError::InvalidConfig(msg) => Self::InvalidConfig { msg },
            BillingError::Internal(msg) => Self::Internal { msg },
        }
    }
}

impl From<IapMobileError> for BillingError {
    fn from(e: IapMobileError) -> Self {
        match e {
            IapMobileError::NotInitialized { .. } => BillingError::NotInitialized,
            IapMobileError::VendorUnavailable { msg } => BillingError::VendorUnavailable(msg),
            IapMobileError::InvalidProduct { msg } => BillingError::invalid_product("", msg),
            IapMobileError::PurchaseInProgress { msg } => BillingError::PurchaseInProgress { product_id: msg },
            IapMobileError::VendorRejected { code, msg } => BillingError::rejected(code, msg),
            IapMobileError::VerificationFailed { msg } => BillingError::VerificationFailed(msg),
            IapMobileError::UpgradeRequired { msg, upgrade_url } => BillingError::UpgradeRequired {
                message: msg,
                upgrade_url,
            },
            IapMobileError::Transport { msg } => BillingError::Transport(msg),
            IapMobileError::Serialization { msg } => BillingError::Serialization(msg),
            IapMobileError::InvalidConfig { msg } => BillingError::InvalidConfig(msg),
            IapMobileError::Internal { msg } => BillingError::Internal(msg),
        }
    }
}

impl From<uniffi::UnexpectedUniFFICallbackError> for IapMobileError {
    fn from(e: uniffi::UnexpectedUniFFICallbackError) -> Self {
        Self::Transport { msg: e.reason }
    }
}

pub type Result<T> = std::result::Result<T, IapMobileError>;

// ============================================================================
// State Types
// ============================================================================

/// Billing backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum VendorFFI {
    Google,
    Samsung,
    Amazon,
}

impl From<Vendor> for VendorFFI {
    fn from(vendor: Vendor) -> Self {
        match vendor {
            Vendor::Google => Self::Google,
            Vendor::Samsung => Self::Samsung,
            Vendor::Amazon => Self::Amazon,
        }
    }
}

/// Provider lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum ProviderStateFFI {
    Uninitialized,
    Initializing,
    Ready,
}

impl From<ProviderState> for ProviderStateFFI {
    fn from(state: ProviderState) -> Self {
        match state {
            ProviderState::Uninitialized => Self::Uninitialized,
            ProviderState::Initializing => Self::Initializing,
            ProviderState::Ready => Self::Ready,
        }
    }
}

// ============================================================================
// Bundle Types
// ============================================================================

/// A typed bundle value.
#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum BundleValueFFI {
    Int { value: i32 },
    Long { value: i64 },
    Bool { value: bool },
    Str { value: String },
    StrList { values: Vec<String> },
}

/// One key of an intent extras bundle.
#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct BundleEntry {
    pub key: String,
    pub value: BundleValueFFI,
}

impl From<BundleValue> for BundleValueFFI {
    fn from(value: BundleValue) -> Self {
        match value {
            BundleValue::Int(value) => Self::Int { value },
            BundleValue::Long(value) => Self::Long { value },
            BundleValue::Bool(value) => Self::Bool { value },
            BundleValue::Str(value) => Self::Str { value },
            BundleValue::StrList(values) => Self::StrList { values },
        }
    }
}

impl From<BundleValueFFI> for BundleValue {
    fn from(value: BundleValueFFI) -> Self {
        match value {
            BundleValueFFI::Int { value } => Self::Int(value),
            BundleValueFFI::Long { value } => Self::Long(value),
            BundleValueFFI::Bool { value } => Self::Bool(value),
            BundleValueFFI::Str { value } => Self::Str(value),
            BundleValueFFI::StrList { values } => Self::StrList(values),
        }
    }
}

/// Build a library bundle from host entries. Later duplicates win.
pub fn bundle_from_entries(entries: Vec<BundleEntry>) -> Bundle {
    let mut bundle = Bundle::new();
    for entry in entries {
        bundle.insert(entry.key, entry.value.into());
    }
    bundle
}

/// Flatten a library bundle, sorted by key.
pub fn bundle_to_entries(bundle: &Bundle) -> Vec<BundleEntry> {
    let mut entries: Vec<BundleEntry> = bundle
        .iter()
        .map(|(key, value)| BundleEntry {
            key: key.clone(),
            value: value.clone().into(),
        })
        .collect();
    entries.sort_by(|a, b| a.key.cmp(&b.key));
    entries
}

// ============================================================================
// Alternate Store Event Types
// ============================================================================

/// Store-side item classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum ItemTypeFFI {
    Consumable,
    Entitled,
    Subscription,
}

impl From<ItemTypeFFI> for ItemType {
    fn from(item_type: ItemTypeFFI) -> Self {
        match item_type {
            ItemTypeFFI::Consumable => Self::Consumable,
            ItemTypeFFI::Entitled => Self::Entitled,
            ItemTypeFFI::Subscription => Self::Subscription,
        }
    }
}

/// Purchase request outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq, uniffi::Enum)]
pub enum PurchaseRequestStatusFFI {
    Successful,
    Failed,
    InvalidSku,
    AlreadyEntitled,
}

impl From<PurchaseRequestStatusFFI> for PurchaseRequestStatus {
    fn from(status: PurchaseRequestStatusFFI) -> Self {
        match status {
            PurchaseRequestStatusFFI::Successful => Self::Successful,
            PurchaseRequestStatusFFI::Failed => Self::Failed,
            PurchaseRequestStatusFFI::InvalidSku => Self::InvalidSku,
            PurchaseRequestStatusFFI::AlreadyEntitled => Self::AlreadyEntitled,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct ReceiptFFI {
    pub sku: String,
    pub item_type: ItemTypeFFI,
    pub purchase_token: String,
    pub subscription_period: Option<String>,
}

impl From<ReceiptFFI> for Receipt {
    fn from(receipt: ReceiptFFI) -> Self {
        Self {
            sku: receipt.sku,
            item_type: receipt.item_type.into(),
            purchase_token: receipt.purchase_token,
            subscription_period: receipt.subscription_period,
        }
    }
}

#[derive(Clone, Debug, PartialEq, uniffi::Record)]
pub struct ItemDataFFI {
    pub sku: String,
    pub item_type: ItemTypeFFI,
    pub price: String,
    pub title: String,
    pub description: String,
    pub small_icon_url: String,
}

impl From<ItemDataFFI> for ItemData {
    fn from(item: ItemDataFFI) -> Self {
        Self {
            sku: item.sku,
            item_type: item.item_type.into(),
            price: item.price,
            title: item.title,
            description: item.description,
            small_icon_url: item.small_icon_url,
        }
    }
}

/// A response delivered by the alternate store SDK.
///
/// `offset` of `None` means the beginning of the purchase history.
#[derive(Clone, Debug, PartialEq, uniffi::Enum)]
pub enum PurchasingEventFFI {
    SdkAvailable {
        sandbox: bool,
    },
    UserId {
        request_id: String,
        successful: bool,
        user_id: Option<String>,
    },
    Purchase {
        request_id: String,
        status: PurchaseRequestStatusFFI,
        receipt: Option<ReceiptFFI>,
    },
    PurchaseUpdates {
        request_id: String,
        successful: bool,
        receipts: Vec<ReceiptFFI>,
        revoked_skus: Vec<String>,
        offset: Option<String>,
        is_more: bool,
    },
    ItemData {
        request_id: String,
        successful: bool,
        items: Vec<ItemDataFFI>,
        unavailable_skus: Vec<String>,
    },
}

fn request_status(successful: bool) -> RequestStatus {
    if successful {
        RequestStatus::Successful
    } else {
        RequestStatus::Failed
    }
}

impl From<PurchasingEventFFI> for PurchasingEvent {
    fn from(event: PurchasingEventFFI) -> Self {
        match event {
            PurchasingEventFFI::SdkAvailable { sandbox } => Self::SdkAvailable { sandbox },
            PurchasingEventFFI::UserId {
                request_id,
                successful,
                user_id,
            } => Self::UserId(UserIdResponse {
                request_id,
                status: request_status(successful),
                user_id,
            }),
            PurchasingEventFFI::Purchase {
                request_id,
                status,
                receipt,
            } => Self::Purchase(PurchaseResponse {
                request_id,
                status: status.into(),
                receipt: receipt.map(Receipt::from),
            }),
            PurchasingEventFFI::PurchaseUpdates {
                request_id,
                successful,
                receipts,
                revoked_skus,
                offset,
                is_more,
            } => Self::PurchaseUpdates(PurchaseUpdatesResponse {
                request_id,
                status: request_status(successful),
                receipts: receipts.into_iter().map(Receipt::from).collect(),
                revoked_skus,
                offset: offset.map(Offset::Token).unwrap_or_default(),
                is_more,
            }),
            PurchasingEventFFI::ItemData {
                request_id,
                successful,
                items,
                unavailable_skus,
            } => Self::ItemData(ItemDataResponse {
                request_id,
                status: request_status(successful),
                items: items.into_iter().map(ItemData::from).collect(),
                unavailable_skus,
            }),
        }
    }
}

// ============================================================================
// Billing Provider
// ============================================================================

enum VendorProvider {
    Google(GoogleBillingProvider),
    Samsung(SamsungBillingProvider),
    Amazon {
        provider: AmazonBillingProvider,
        events: callbacks::EventSender,
    },
}

impl VendorProvider {
    fn as_provider(&self) -> &dyn BillingProvider {
        match self {
            Self::Google(provider) => provider,
            Self::Samsung(provider) => provider,
            Self::Amazon { provider, .. } => provider,
        }
    }
}

/// Billing provider for mobile hosts.
///
/// One instance per store. Construct it with the constructor matching the
/// vendor named in the configuration document.
#[derive(uniffi::Object)]
pub struct BillingProviderFFI {
    /// Dropped before the runtime so shutdown work can still be spawned.
    provider: VendorProvider,
    /// Tokio runtime for background work.
    runtime: tokio::runtime::Runtime,
}

fn parse_config(config_json: &str, vendor: Vendor) -> Result<BillingConfig> {
    let config = BillingConfig::from_json(config_json)?;
    if config.vendor != vendor {
        return Err(IapMobileError::InvalidConfig {
            msg: format!("configuration is for {}, not {}", config.vendor, vendor),
        });
    }
    Ok(config)
}

fn context(runtime: &tokio::runtime::Runtime, progress: Box<dyn ProgressIndicatorFFI>) -> ProviderContext {
    ProviderContext::new(runtime.handle().clone())
        .with_progress(Arc::new(callbacks::ProgressBridge::new(Arc::from(progress))))
}

fn new_runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| IapMobileError::Internal { msg: e.to_string() })
}

#[uniffi::export]
impl BillingProviderFFI {
    /// Create a provider for the Play store billing service.
    ///
    /// # Arguments
    ///
    /// * `config_json` - Configuration document with `"vendor": "google"`
    /// * `client` - Host wrapper around the billing service
    /// * `observer` - Receives purchase and product callbacks
    /// * `progress` - Modal progress UI
    #[uniffi::constructor]
    pub fn new_google(
        config_json: String,
        client: Box<dyn PlayBillingClientFFI>,
        observer: Box<dyn PurchaseObserverFFI>,
        progress: Box<dyn ProgressIndicatorFFI>,
    ) -> Result<Arc<Self>> {
        let config = parse_config(&config_json, Vendor::Google)?;
        let runtime = new_runtime()?;
        let client = Arc::new(callbacks::PlayClientBridge::new(Arc::from(client)));
        let provider = GoogleBillingProvider::new(client, config.play, context(&runtime, progress));
        Ok(Self::assemble(VendorProvider::Google(provider), observer, runtime))
    }

    /// Create a provider for the IAP service.
    ///
    /// # Arguments
    ///
    /// * `config_json` - Configuration document with `"vendor": "samsung"`
    ///   and a `samsung` section
    /// * `connector` - Host wrapper around the bound service
    /// * `launcher` - Starts the account and payment activities
    /// * `observer` - Receives purchase and product callbacks
    /// * `progress` - Modal progress UI
    #[uniffi::constructor]
    pub fn new_samsung(
        config_json: String,
        connector: Box<dyn IapConnectorFFI>,
        launcher: Box<dyn ActivityLauncherFFI>,
        observer: Box<dyn PurchaseObserverFFI>,
        progress: Box<dyn ProgressIndicatorFFI>,
    ) -> Result<Arc<Self>> {
        let config = parse_config(&config_json, Vendor::Samsung)?;
        let samsung = config.samsung_config()?;
        let runtime = new_runtime()?;
        let provider = SamsungBillingProvider::new(
            Arc::new(callbacks::IapConnectorBridge::new(Arc::from(connector))),
            Arc::new(callbacks::LauncherBridge::new(Arc::from(launcher))),
            samsung,
            context(&runtime, progress),
        )?;
        Ok(Self::assemble(VendorProvider::Samsung(provider), observer, runtime))
    }

    /// Create a provider for the alternate store.
    ///
    /// Store responses are handed back with
    /// [`BillingProviderFFI::deliver_purchasing_event`].
    #[uniffi::constructor]
    pub fn new_amazon(
        config_json: String,
        service: Box<dyn PurchasingServiceFFI>,
        observer: Box<dyn PurchaseObserverFFI>,
        progress: Box<dyn ProgressIndicatorFFI>,
    ) -> Result<Arc<Self>> {
        let config = parse_config(&config_json, Vendor::Amazon)?;
        let runtime = new_runtime()?;
        let bridge = callbacks::PurchasingServiceBridge::new(Arc::from(service));
        let events = bridge.events();
        let provider = AmazonBillingProvider::new(Arc::new(bridge), config.amazon, context(&runtime, progress));
        Ok(Self::assemble(
            VendorProvider::Amazon { provider, events },
            observer,
            runtime,
        ))
    }

    pub fn vendor(&self) -> VendorFFI {
        self.provider().vendor().into()
    }

    pub fn state(&self) -> ProviderStateFFI {
        self.provider().state().into()
    }

    /// Start vendor setup. Owned products are restored once it completes.
    pub fn initialize(&self) {
        self.provider().initialize();
    }

    pub fn can_make_purchase(&self) -> bool {
        self.provider().can_make_purchase()
    }

    pub fn restore_purchases(&self) -> bool {
        self.provider().restore_purchases()
    }

    /// Start a purchase. The outcome arrives on the observer.
    pub fn send_request(&self, purchase_id: i32, product_id: String, developer_payload: String) -> bool {
        self.provider()
            .send_request(purchase_id, &product_id, &developer_payload)
    }

    pub fn consume_purchase(&self, product_id: String) -> bool {
        self.provider().consume_purchase(&product_id)
    }

    pub fn request_product_details(&self, product_id: String) -> bool {
        self.provider().request_product_details(&product_id)
    }

    /// Forward an activity result. Returns false when the request code is
    /// not one of ours.
    pub fn on_activity_result(&self, request_code: i32, result_code: i32, data: Option<Vec<BundleEntry>>) -> bool {
        self.provider()
            .on_activity_result(request_code, result_code, data.map(bundle_from_entries))
    }

    pub fn enable_updates(&self) -> bool {
        self.provider().enable_updates()
    }

    pub fn disable_updates(&self) -> bool {
        self.provider().disable_updates()
    }

    /// Register a product as `consumable`, `non-consumable` or `subscription`.
    pub fn product_set_type(&self, product_id: String, product_type: String) -> bool {
        self.provider().product_set_type(&product_id, &product_type)
    }

    pub fn confirm_delivery(&self, purchase_id: i32) -> bool {
        self.provider().confirm_delivery(purchase_id)
    }

    pub fn set_purchase_property(&self, product_id: String, name: String, value: String) -> bool {
        self.provider()
            .set_purchase_property(&product_id, &name, &value)
    }

    pub fn get_purchase_property(&self, product_id: String, name: String) -> String {
        self.provider().get_purchase_property(&product_id, &name)
    }

    /// JSON array of owned product ids.
    pub fn get_purchase_list(&self) -> String {
        self.provider().get_purchase_list()
    }

    pub fn receive_product_details(&self, product_id: String) -> String {
        self.provider().receive_product_details(&product_id)
    }

    /// Hand an alternate store response to the provider.
    ///
    /// Returns false for other vendors or before the provider registered
    /// with the store.
    pub fn deliver_purchasing_event(&self, event: PurchasingEventFFI) -> bool {
        match &self.provider {
            VendorProvider::Amazon { events, .. } => events.send(event.into()),
            _ => false,
        }
    }

    /// Store user id, alternate store only.
    pub fn user_id(&self) -> Option<String> {
        match &self.provider {
            VendorProvider::Amazon { provider, .. } => provider.user_id(),
            _ => None,
        }
    }

    /// Whether the store runs against its sandbox, alternate store only.
    pub fn is_sandbox(&self) -> bool {
        match &self.provider {
            VendorProvider::Amazon { provider, .. } => provider.is_sandbox(),
            _ => false,
        }
    }
}

impl BillingProviderFFI {
    fn assemble(
        provider: VendorProvider,
        observer: Box<dyn PurchaseObserverFFI>,
        runtime: tokio::runtime::Runtime,
    ) -> Arc<Self> {
        provider
            .as_provider()
            .set_purchase_observer(Arc::new(callbacks::ObserverBridge::new(Arc::from(observer))));
        Arc::new(Self { provider, runtime })
    }

    fn provider(&self) -> &dyn BillingProvider {
        self.provider.as_provider()
    }

    /// Runtime the provider spawns onto.
    pub fn runtime(&self) -> &tokio::runtime::Runtime {
        &self.runtime
    }
}

// ============================================================================
// Utility Functions
// ============================================================================

/// Install a global tracing subscriber.
///
/// `filter` uses `RUST_LOG` syntax and defaults to `iapkit_lib=info`.
/// Returns false when a subscriber was already installed.
#[uniffi::export]
pub fn init_logging(filter: Option<String>) -> bool {
    let filter = filter.unwrap_or_else(|| "iapkit_lib=info,iapkit_mobile=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .try_init()
        .is_ok()
}

/// Get the library version.
#[uniffi::export]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use iapkit_lib::BillingErrorCode;

    #[test]
    fn test_error_round_trip_keeps_code() {
        let errors = vec![
            BillingError::NotInitialized,
            BillingError::rejected(-1003, "already purchased"),
            BillingError::UpgradeRequired {
                message: "upgrade".into(),
                upgrade_url: Some("samsungapps://ProductDetail/com.sec.android.iap".into()),
            },
            BillingError::Serialization("bad json".into()),
        ];
        for error in errors {
            let code = error.code();
            let mobile = IapMobileError::from(error);
            assert_eq!(BillingError::from(mobile).code(), code);
        }
    }

    #[test]
    fn test_upgrade_url_survives_conversion() {
        let mobile = IapMobileError::from(BillingError::UpgradeRequired {
            message: "upgrade".into(),
            upgrade_url: Some("market://iap".into()),
        });
        match mobile {
            IapMobileError::UpgradeRequired { upgrade_url, .. } => {
                assert_eq!(upgrade_url.as_deref(), Some("market://iap"))
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_bundle_entries_round_trip() {
        let bundle = Bundle::new()
            .with_int("RESPONSE_CODE", 0)
            .with_string("INAPP_PURCHASE_DATA", "{}")
            .with_string_list("RESULT_LIST", vec!["a".into(), "b".into()]);
        let entries = bundle_to_entries(&bundle);
        assert_eq!(entries[0].key, "INAPP_PURCHASE_DATA");
        assert_eq!(bundle_from_entries(entries), bundle);
    }

    #[test]
    fn test_purchase_updates_offset_defaults_to_beginning() {
        let event = PurchasingEvent::from(PurchasingEventFFI::PurchaseUpdates {
            request_id: "r1".into(),
            successful: true,
            receipts: Vec::new(),
            revoked_skus: Vec::new(),
            offset: None,
            is_more: false,
        });
        match event {
            PurchasingEvent::PurchaseUpdates(response) => {
                assert_eq!(response.offset, Offset::Beginning);
                assert_eq!(response.status, RequestStatus::Successful);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_config_vendor_must_match() {
        let err = parse_config(r#"{"vendor":"google"}"#, Vendor::Amazon).unwrap_err();
        assert_eq!(BillingError::from(err).code(), BillingErrorCode::InvalidConfig);
        assert!(parse_config(r#"{"vendor":"amazon"}"#, Vendor::Amazon).is_ok());
    }

    #[test]
    fn test_get_version() {
        assert!(!get_version().is_empty());
    }
}
