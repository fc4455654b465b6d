//! Play billing service surface.
//!
//! [`PlayBillingClient`] mirrors the in-app billing service calls. The
//! purchase flow itself is launched by the client; its outcome arrives later
//! as an activity result and is decoded with [`PurchaseActivityResult`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bundle::{self, Bundle};
use crate::product::{Product, ProductType, PurchaseRecord, SubscriptionDuration};
use crate::Result;

/// Billing response codes.
pub mod response {
    pub const OK: i32 = 0;
    pub const USER_CANCELED: i32 = 1;
    pub const SERVICE_UNAVAILABLE: i32 = 2;
    pub const BILLING_UNAVAILABLE: i32 = 3;
    pub const ITEM_UNAVAILABLE: i32 = 4;
    pub const DEVELOPER_ERROR: i32 = 5;
    pub const ERROR: i32 = 6;
    pub const ITEM_ALREADY_OWNED: i32 = 7;
    pub const ITEM_NOT_OWNED: i32 = 8;

    /// Human readable text for a response code.
    pub fn describe(code: i32) -> &'static str {
        match code {
            OK => "ok",
            USER_CANCELED => "user canceled",
            SERVICE_UNAVAILABLE => "service unavailable",
            BILLING_UNAVAILABLE => "billing unavailable",
            ITEM_UNAVAILABLE => "item unavailable",
            DEVELOPER_ERROR => "developer error",
            ERROR => "error",
            ITEM_ALREADY_OWNED => "item already owned",
            ITEM_NOT_OWNED => "item not owned",
            _ => "unknown response",
        }
    }
}

pub const ITEM_TYPE_INAPP: &str = "inapp";
pub const ITEM_TYPE_SUBS: &str = "subs";

/// Purchase data as signed by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayPurchase {
    #[serde(default)]
    pub order_id: String,
    #[serde(default)]
    pub package_name: String,
    pub product_id: String,
    #[serde(default)]
    pub purchase_time: i64,
    #[serde(default)]
    pub purchase_state: i32,
    #[serde(default)]
    pub developer_payload: String,
    #[serde(default)]
    pub purchase_token: String,
}

impl PlayPurchase {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A purchase together with the raw JSON it was parsed from and its signature.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedPurchase {
    pub purchase: PlayPurchase,
    pub original_json: String,
    pub signature: String,
}

impl OwnedPurchase {
    pub fn parse(original_json: &str, signature: &str) -> Result<Self> {
        Ok(Self {
            purchase: PlayPurchase::from_json(original_json)?,
            original_json: original_json.to_string(),
            signature: signature.to_string(),
        })
    }

    pub fn to_record(&self, product_type: Option<ProductType>) -> PurchaseRecord {
        PurchaseRecord {
            product_id: self.purchase.product_id.clone(),
            product_type,
            order_id: self.purchase.order_id.clone(),
            purchase_token: self.purchase.purchase_token.clone(),
            purchase_date: self.purchase.purchase_time.to_string(),
            developer_payload: self.purchase.developer_payload.clone(),
            signature: self.signature.clone(),
            signed_data: self.original_json.clone(),
            ..PurchaseRecord::default()
        }
    }
}

/// Result of a purchases query. The query returns everything at once.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PurchasesResult {
    pub response_code: i32,
    pub purchases: Vec<OwnedPurchase>,
}

/// Listing information for one SKU.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkuDetails {
    pub product_id: String,
    #[serde(rename = "type", default)]
    pub item_type: String,
    #[serde(default)]
    pub price: String,
    #[serde(rename = "price_currency_code", default)]
    pub price_currency_code: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub subscription_period: Option<String>,
}

impl SkuDetails {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn into_product(self, product_type: Option<ProductType>) -> Product {
        let product_type = product_type.or_else(|| {
            (self.item_type == ITEM_TYPE_SUBS).then_some(ProductType::Subscription)
        });
        Product {
            subscription_duration: self
                .subscription_period
                .as_deref()
                .and_then(SubscriptionDuration::parse_iso8601),
            product_id: self.product_id,
            product_type,
            price: self.price,
            title: self.title,
            description: self.description,
            currency_unit: self.price_currency_code,
            image_url: None,
            download_url: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SkuDetailsResult {
    pub response_code: i32,
    pub details: Vec<SkuDetails>,
}

/// Parameters for launching the store's purchase UI.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseFlowRequest {
    pub sku: String,
    pub item_type: String,
    pub developer_payload: String,
    pub request_code: i32,
}

/// Decoded extras of a purchase activity result.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseActivityResult {
    pub response_code: i32,
    pub purchase_data: Option<String>,
    pub signature: Option<String>,
}

impl PurchaseActivityResult {
    /// A missing response code is treated as success, as the store omits it
    /// on some versions.
    pub fn from_bundle(data: Option<&Bundle>) -> Self {
        let response_code = data
            .and_then(|data| data.get_int(bundle::keys::RESPONSE_CODE))
            .unwrap_or(response::OK);
        Self {
            response_code,
            purchase_data: data
                .and_then(|data| data.get_string(bundle::keys::INAPP_PURCHASE_DATA))
                .map(str::to_string),
            signature: data
                .and_then(|data| data.get_string(bundle::keys::INAPP_DATA_SIGNATURE))
                .map(str::to_string),
        }
    }
}

/// In-app billing service calls.
#[async_trait]
pub trait PlayBillingClient: Send + Sync {
    /// Bind to the billing service.
    async fn connect(&self) -> Result<()>;

    /// Response code for whether `item_type` billing is supported.
    async fn is_billing_supported(&self, item_type: &str) -> Result<i32>;

    async fn get_sku_details(&self, item_type: &str, skus: &[String]) -> Result<SkuDetailsResult>;

    /// Every owned purchase of `item_type`.
    async fn get_purchases(&self, item_type: &str) -> Result<PurchasesResult>;

    /// Launch the purchase UI. Returns the immediate response code; on `OK`
    /// the final outcome arrives as an activity result.
    async fn launch_purchase_flow(&self, request: PurchaseFlowRequest) -> Result<i32>;

    /// Consume a purchase by token. Returns the response code.
    async fn consume_purchase(&self, purchase_token: &str) -> Result<i32>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::DurationUnit;
    use crate::properties::keys;

    const PURCHASE_JSON: &str = r#"{"orderId":"GPA.1234","packageName":"com.example.app","productId":"remove_ads","purchaseTime":1700000000000,"purchaseState":0,"developerPayload":"p1","purchaseToken":"tok-abc"}"#;

    #[test]
    fn purchase_record_carries_token_and_signature() {
        let owned = OwnedPurchase::parse(PURCHASE_JSON, "sig==").unwrap();
        let record = owned.to_record(Some(ProductType::NonConsumable));
        assert_eq!(record.product_id, "remove_ads");
        assert_eq!(record.purchase_token, "tok-abc");
        assert_eq!(record.signed_data, PURCHASE_JSON);
        let props = record.to_properties();
        assert!(props.contains(&(keys::SIGNATURE, "sig==".to_string())));
        assert!(props.contains(&(keys::ORDER_ID, "GPA.1234".to_string())));
    }

    #[test]
    fn malformed_purchase_json_is_rejected() {
        assert!(OwnedPurchase::parse("{\"orderId\":1", "").is_err());
        assert!(OwnedPurchase::parse("{}", "").is_err());
    }

    #[test]
    fn sku_details_become_products() {
        let json = r#"{"productId":"pro","type":"subs","price":"$4.99","price_currency_code":"USD","title":"Pro","description":"Pro tier","subscriptionPeriod":"P1M"}"#;
        let product = SkuDetails::from_json(json).unwrap().into_product(None);
        assert_eq!(product.product_type, Some(ProductType::Subscription));
        assert_eq!(product.currency_unit, "USD");
        let duration = product.subscription_duration.unwrap();
        assert_eq!(duration.unit, DurationUnit::Month);
        assert_eq!(duration.multiplier, 1);
    }

    #[test]
    fn activity_result_defaults_to_ok() {
        let result = PurchaseActivityResult::from_bundle(None);
        assert_eq!(result.response_code, response::OK);
        assert_eq!(result.purchase_data, None);

        let data = Bundle::new()
            .with_int(bundle::keys::RESPONSE_CODE, response::ITEM_ALREADY_OWNED)
            .with_string(bundle::keys::INAPP_PURCHASE_DATA, PURCHASE_JSON);
        let result = PurchaseActivityResult::from_bundle(Some(&data));
        assert_eq!(result.response_code, 7);
        assert_eq!(result.purchase_data.as_deref(), Some(PURCHASE_JSON));
        assert_eq!(result.signature, None);
    }
}
