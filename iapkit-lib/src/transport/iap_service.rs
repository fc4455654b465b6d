//! Signed-binder IAP service surface.
//!
//! [`IapConnector`] is the raw IPC interface. [`IapServiceClient`] layers the
//! package checks, the idempotent bind/init handshake and bundle decoding on
//! top of it.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};

use crate::bundle::{self, Bundle};
use crate::config::IapMode;
use crate::errors::BillingError;
use crate::observer::ActivityRequest;
use crate::product::{Product, ProductType, PurchaseRecord, SubscriptionDuration};
use crate::Result;

/// Status codes reported in `STATUS_CODE`.
pub mod status {
    pub const NONE: i32 = 0;
    pub const PAYMENT_IS_CANCELED: i32 = 1;
    pub const INITIALIZATION: i32 = -1000;
    pub const NEED_APP_UPGRADE: i32 = -1001;
    pub const COMMON: i32 = -1002;
    pub const ALREADY_PURCHASED: i32 = -1003;
    pub const WHILE_RUNNING: i32 = -1004;
    pub const PRODUCT_DOES_NOT_EXIST: i32 = -1005;
    pub const CONFIRM_INBOX: i32 = -1006;
}

pub const IAP_PACKAGE_NAME: &str = "com.sec.android.iap";
pub const IAP_SERVICE_NAME: &str = "com.sec.android.iap.service.iapService";
pub const ACCOUNT_ACTIVITY: &str = "com.sec.android.iap/com.sec.android.iap.activity.AccountActivity";
pub const PAYMENT_ACTIVITY: &str =
    "com.sec.android.iap/com.sec.android.iap.activity.PaymentMethodListActivity";
/// Hash of the signing certificate of a genuine service package.
pub const IAP_SIGNATURE_HASHCODE: i32 = 0x7a7e_af4b;

pub const ITEM_TYPE_CONSUMABLE: &str = "00";
pub const ITEM_TYPE_NON_CONSUMABLE: &str = "01";
pub const ITEM_TYPE_SUBSCRIPTION: &str = "02";
pub const ITEM_TYPE_ALL: &str = "10";

/// Raw IPC calls exposed by the bound service.
#[async_trait]
pub trait IapConnector: Send + Sync {
    fn is_package_installed(&self) -> bool;

    /// Signature hash of the installed service package.
    fn package_signature_hash(&self) -> Option<i32>;

    async fn bind(&self) -> Result<()>;

    async fn unbind(&self);

    async fn init(&self, mode: i32) -> Result<Bundle>;

    async fn get_item_list(
        &self,
        mode: i32,
        package_name: &str,
        item_group_id: &str,
        start: u32,
        end: u32,
        item_type: &str,
    ) -> Result<Bundle>;

    async fn get_items_inbox(
        &self,
        package_name: &str,
        item_group_id: &str,
        start: u32,
        end: u32,
        start_date: &str,
        end_date: &str,
    ) -> Result<Bundle>;
}

/// Status block decoded from a response bundle.
#[derive(Clone, Debug, PartialEq)]
pub struct ErrorInfo {
    pub code: i32,
    pub message: String,
    pub upgrade_url: Option<String>,
}

impl ErrorInfo {
    pub fn from_bundle(bundle: &Bundle) -> Self {
        Self {
            code: bundle
                .get_int(bundle::keys::STATUS_CODE)
                .unwrap_or(status::COMMON),
            message: bundle
                .get_string(bundle::keys::ERROR_STRING)
                .unwrap_or_default()
                .to_string(),
            upgrade_url: bundle
                .get_string(bundle::keys::IAP_UPGRADE_URL)
                .filter(|url| !url.is_empty())
                .map(str::to_string),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.code == status::NONE
    }

    pub fn into_error(self) -> BillingError {
        match self.code {
            status::NEED_APP_UPGRADE => BillingError::UpgradeRequired {
                message: self.message,
                upgrade_url: self.upgrade_url,
            },
            code => BillingError::rejected(code, self.message),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(value) => value,
        other => other.to_string(),
    })
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Catalog entry from `RESULT_LIST` of an item-list call.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ItemInfo {
    #[serde(rename = "mItemId")]
    pub item_id: String,
    #[serde(rename = "mItemName", default)]
    pub item_name: String,
    #[serde(rename = "mItemPriceString", default)]
    pub item_price_string: String,
    #[serde(rename = "mCurrencyUnit", default)]
    pub currency_unit: String,
    #[serde(rename = "mItemDesc", default)]
    pub item_desc: String,
    #[serde(rename = "mItemImageUrl", default)]
    pub item_image_url: String,
    #[serde(rename = "mItemDownloadUrl", default)]
    pub item_download_url: String,
    #[serde(rename = "mType", default)]
    pub item_type: String,
    #[serde(rename = "mSubscriptionDurationUnit", default)]
    pub subscription_duration_unit: String,
    #[serde(
        rename = "mSubscriptionDurationMultiplier",
        default,
        deserialize_with = "lenient_string"
    )]
    pub subscription_duration_multiplier: String,
}

impl ItemInfo {
    pub fn into_product(self) -> Product {
        Product {
            product_type: ProductType::parse(&self.item_type),
            subscription_duration: SubscriptionDuration::from_parts(
                &self.subscription_duration_unit,
                &self.subscription_duration_multiplier,
            ),
            product_id: self.item_id,
            price: self.item_price_string,
            title: self.item_name,
            description: self.item_desc,
            currency_unit: self.currency_unit,
            image_url: non_empty(self.item_image_url),
            download_url: non_empty(self.item_download_url),
        }
    }
}

/// Purchase history entry from `RESULT_LIST` of an inbox call.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct InboxItem {
    #[serde(rename = "mItemId")]
    pub item_id: String,
    #[serde(rename = "mPaymentId", default)]
    pub payment_id: String,
    #[serde(rename = "mPurchaseDate", default, deserialize_with = "lenient_string")]
    pub purchase_date: String,
    #[serde(rename = "mSubscriptionEndDate", default, deserialize_with = "lenient_string")]
    pub subscription_end_date: String,
    #[serde(rename = "mType", default)]
    pub item_type: String,
}

impl InboxItem {
    pub fn product_type(&self) -> Option<ProductType> {
        ProductType::parse(&self.item_type)
    }

    pub fn to_record(&self) -> PurchaseRecord {
        PurchaseRecord {
            product_id: self.item_id.clone(),
            product_type: self.product_type(),
            order_id: self.payment_id.clone(),
            purchase_date: self.purchase_date.clone(),
            subscription_end_date: self.subscription_end_date.clone(),
            ..PurchaseRecord::default()
        }
    }
}

/// Payment outcome from `RESULT_OBJECT`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct PurchaseInfo {
    #[serde(rename = "mItemId")]
    pub item_id: String,
    #[serde(rename = "mPaymentId", default)]
    pub payment_id: String,
    #[serde(rename = "mPurchaseId", default)]
    pub purchase_id: String,
    #[serde(rename = "mPurchaseDate", default, deserialize_with = "lenient_string")]
    pub purchase_date: String,
    #[serde(rename = "mVerifyUrl", default)]
    pub verify_url: String,
}

impl PurchaseInfo {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_record(&self, product_type: Option<ProductType>) -> PurchaseRecord {
        PurchaseRecord {
            product_id: self.item_id.clone(),
            product_type,
            order_id: self.payment_id.clone(),
            purchase_token: self.purchase_id.clone(),
            purchase_date: self.purchase_date.clone(),
            verify_url: self.verify_url.clone(),
            ..PurchaseRecord::default()
        }
    }
}

/// Decoded extras of a payment activity result.
#[derive(Clone, Debug, PartialEq)]
pub struct PaymentResult {
    pub status: ErrorInfo,
    pub item_id: Option<String>,
    pub purchase_json: Option<String>,
}

impl PaymentResult {
    /// Missing extras decode as a cancelled payment.
    pub fn from_bundle(data: Option<&Bundle>) -> Self {
        let Some(data) = data else {
            return Self {
                status: ErrorInfo {
                    code: status::PAYMENT_IS_CANCELED,
                    message: String::new(),
                    upgrade_url: None,
                },
                item_id: None,
                purchase_json: None,
            };
        };
        let mut status = ErrorInfo::from_bundle(data);
        if !data.contains(bundle::keys::STATUS_CODE) {
            status.code = status::PAYMENT_IS_CANCELED;
        }
        Self {
            status,
            item_id: data
                .get_string(bundle::keys::ITEM_ID)
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            purchase_json: data
                .get_string(bundle::keys::RESULT_OBJECT)
                .map(str::to_string),
        }
    }
}

/// Account sign-in activity.
pub fn account_request() -> ActivityRequest {
    ActivityRequest::new(ACCOUNT_ACTIVITY, Bundle::new())
}

/// Payment activity for one item.
pub fn payment_request(package_name: &str, item_group_id: &str, item_id: &str) -> ActivityRequest {
    let extras = Bundle::new()
        .with_string(bundle::keys::THIRD_PARTY_NAME, package_name)
        .with_string(bundle::keys::ITEM_GROUP_ID, item_group_id)
        .with_string(bundle::keys::ITEM_ID, item_id);
    ActivityRequest::new(PAYMENT_ACTIVITY, extras)
}

/// Connection lifecycle of the service.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum BindState {
    #[default]
    Term,
    Bound,
    Ready,
}

/// One window of a `RESULT_LIST` response.
///
/// `entry_count` counts every entry the service sent, including ones that
/// failed to decode, so paging decisions follow what the service returned.
#[derive(Clone, Debug)]
pub struct ResultPage<T> {
    pub items: Vec<T>,
    pub entry_count: usize,
}

impl<T> ResultPage<T> {
    /// A full window means the service may hold more entries.
    pub fn is_full(&self, page_size: u32) -> bool {
        self.entry_count >= page_size as usize
    }
}

/// Typed client over an [`IapConnector`].
pub struct IapServiceClient {
    connector: Arc<dyn IapConnector>,
    package_name: String,
    mode: IapMode,
    state: Mutex<BindState>,
}

impl IapServiceClient {
    pub fn new(connector: Arc<dyn IapConnector>, package_name: impl Into<String>, mode: IapMode) -> Self {
        Self {
            connector,
            package_name: package_name.into(),
            mode,
            state: Mutex::new(BindState::Term),
        }
    }

    pub fn bind_state(&self) -> BindState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_bind_state(&self, state: BindState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// The service package must be installed and carry the genuine signature.
    pub fn check_package(&self) -> Result<()> {
        if !self.connector.is_package_installed() {
            return Err(BillingError::VendorUnavailable(format!(
                "{} is not installed",
                IAP_PACKAGE_NAME
            )));
        }
        match self.connector.package_signature_hash() {
            Some(IAP_SIGNATURE_HASHCODE) => Ok(()),
            _ => Err(BillingError::VendorUnavailable(format!(
                "{} has an invalid signature",
                IAP_PACKAGE_NAME
            ))),
        }
    }

    /// Bind to the service. No-op once bound.
    pub async fn bind(&self) -> Result<()> {
        if self.bind_state() >= BindState::Bound {
            return Ok(());
        }
        self.connector
            .bind()
            .await
            .map_err(|err| BillingError::VendorUnavailable(format!("bind failed: {}", err)))?;
        self.set_bind_state(BindState::Bound);
        tracing::debug!(service = IAP_SERVICE_NAME, "bound to IAP service");
        Ok(())
    }

    /// Bind if needed, then initialize the service. No-op once ready.
    pub async fn init(&self) -> Result<()> {
        if self.bind_state() == BindState::Ready {
            return Ok(());
        }
        self.bind().await?;
        let response = self.connector.init(self.mode.code()).await?;
        let status = ErrorInfo::from_bundle(&response);
        if !status.is_ok() {
            return Err(status.into_error());
        }
        self.set_bind_state(BindState::Ready);
        tracing::info!(mode = ?self.mode, "IAP service initialized");
        Ok(())
    }

    fn decode_list<T>(response: &Bundle) -> Result<ResultPage<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let status = ErrorInfo::from_bundle(response);
        if !status.is_ok() {
            return Err(status.into_error());
        }
        let entries = response
            .get_string_list(bundle::keys::RESULT_LIST)
            .unwrap_or_default();
        let items = entries
            .iter()
            .filter_map(|entry| match serde_json::from_str(entry) {
                Ok(item) => Some(item),
                Err(err) => {
                    tracing::warn!("skipping malformed result entry: {}", err);
                    None
                }
            })
            .collect();
        Ok(ResultPage {
            items,
            entry_count: entries.len(),
        })
    }

    /// Catalog window `[start, end]`, both inclusive.
    pub async fn item_list(
        &self,
        item_group_id: &str,
        start: u32,
        end: u32,
        item_type: &str,
    ) -> Result<ResultPage<ItemInfo>> {
        let response = self
            .connector
            .get_item_list(
                self.mode.code(),
                &self.package_name,
                item_group_id,
                start,
                end,
                item_type,
            )
            .await?;
        Self::decode_list(&response)
    }

    /// Purchase history window `[start, end]` between two `yyyyMMdd` dates.
    pub async fn inbox(
        &self,
        item_group_id: &str,
        start: u32,
        end: u32,
        start_date: &str,
        end_date: &str,
    ) -> Result<ResultPage<InboxItem>> {
        let response = self
            .connector
            .get_items_inbox(
                &self.package_name,
                item_group_id,
                start,
                end,
                start_date,
                end_date,
            )
            .await?;
        Self::decode_list(&response)
    }

    /// Unbind and return to the initial state.
    pub async fn dispose(&self) {
        if self.bind_state() > BindState::Term {
            self.connector.unbind().await;
            self.set_bind_state(BindState::Term);
        }
    }
}
