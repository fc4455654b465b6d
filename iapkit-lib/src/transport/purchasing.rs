//! Alternate-store purchasing service surface.
//!
//! Requests return a request id immediately. Responses are delivered later
//! as [`PurchasingEvent`]s on the channel handed to
//! [`PurchasingService::register_observer`].

use std::fmt;

use tokio::sync::mpsc;

use crate::product::{Product, ProductType, PurchaseRecord};
use crate::properties::keys;

pub type RequestId = String;

/// Position in the purchase history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum Offset {
    #[default]
    Beginning,
    Token(String),
}

impl fmt::Display for Offset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Beginning => f.write_str("BEGINNING"),
            Self::Token(token) => f.write_str(token),
        }
    }
}

/// Store-side item classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemType {
    Consumable,
    Entitled,
    Subscription,
}

impl ItemType {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CONSUMABLE" => Some(Self::Consumable),
            "ENTITLED" => Some(Self::Entitled),
            "SUBSCRIPTION" => Some(Self::Subscription),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consumable => "CONSUMABLE",
            Self::Entitled => "ENTITLED",
            Self::Subscription => "SUBSCRIPTION",
        }
    }

    pub fn product_type(self) -> ProductType {
        match self {
            Self::Consumable => ProductType::Consumable,
            Self::Entitled => ProductType::NonConsumable,
            Self::Subscription => ProductType::Subscription,
        }
    }
}

/// Proof of a purchase issued by the store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Receipt {
    pub sku: String,
    pub item_type: ItemType,
    pub purchase_token: String,
    pub subscription_period: Option<String>,
}

impl Receipt {
    pub fn to_record(&self) -> PurchaseRecord {
        PurchaseRecord {
            product_id: self.sku.clone(),
            product_type: Some(self.item_type.product_type()),
            purchase_token: self.purchase_token.clone(),
            ..PurchaseRecord::default()
        }
    }

    /// Receipt-only properties on top of the purchase record.
    pub fn extra_properties(&self) -> Vec<(&'static str, String)> {
        self.subscription_period
            .iter()
            .map(|period| (keys::SUBSCRIPTION_PERIOD, period.clone()))
            .collect()
    }
}

/// Outcome of a purchase request, ordinal-compatible with the store SDK.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum PurchaseRequestStatus {
    Successful = 0,
    Failed = 1,
    InvalidSku = 2,
    AlreadyEntitled = 3,
}

impl PurchaseRequestStatus {
    pub fn from_ordinal(ordinal: i32) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Successful),
            1 => Some(Self::Failed),
            2 => Some(Self::InvalidSku),
            3 => Some(Self::AlreadyEntitled),
            _ => None,
        }
    }
}

/// Outcome of user-id, purchase-updates and item-data requests.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Successful,
    Failed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UserIdResponse {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseResponse {
    pub request_id: RequestId,
    pub status: PurchaseRequestStatus,
    pub receipt: Option<Receipt>,
}

/// One page of purchase history.
#[derive(Clone, Debug, PartialEq)]
pub struct PurchaseUpdatesResponse {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub receipts: Vec<Receipt>,
    pub revoked_skus: Vec<String>,
    pub offset: Offset,
    pub is_more: bool,
}

/// Store listing for one SKU.
#[derive(Clone, Debug, PartialEq)]
pub struct ItemData {
    pub sku: String,
    pub item_type: ItemType,
    pub price: String,
    pub title: String,
    pub description: String,
    pub small_icon_url: String,
}

impl ItemData {
    pub fn into_product(self) -> Product {
        Product {
            product_type: Some(self.item_type.product_type()),
            image_url: (!self.small_icon_url.is_empty()).then_some(self.small_icon_url),
            product_id: self.sku,
            price: self.price,
            title: self.title,
            description: self.description,
            currency_unit: String::new(),
            subscription_duration: None,
            download_url: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ItemDataResponse {
    pub request_id: RequestId,
    pub status: RequestStatus,
    pub items: Vec<ItemData>,
    pub unavailable_skus: Vec<String>,
}

/// Responses delivered by the store.
#[derive(Clone, Debug, PartialEq)]
pub enum PurchasingEvent {
    SdkAvailable { sandbox: bool },
    UserId(UserIdResponse),
    Purchase(PurchaseResponse),
    PurchaseUpdates(PurchaseUpdatesResponse),
    ItemData(ItemDataResponse),
}

impl PurchasingEvent {
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::SdkAvailable { .. } => None,
            Self::UserId(response) => Some(&response.request_id),
            Self::Purchase(response) => Some(&response.request_id),
            Self::PurchaseUpdates(response) => Some(&response.request_id),
            Self::ItemData(response) => Some(&response.request_id),
        }
    }
}

/// Request side of the purchasing service.
pub trait PurchasingService: Send + Sync {
    /// Route every later response to `events`.
    fn register_observer(&self, events: mpsc::UnboundedSender<PurchasingEvent>);

    fn initiate_get_user_id_request(&self) -> RequestId;

    fn initiate_purchase_updates_request(&self, offset: Offset) -> RequestId;

    fn initiate_purchase_request(&self, sku: &str) -> RequestId;

    fn initiate_item_data_request(&self, skus: &[String]) -> RequestId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_ordinals_match_the_store() {
        assert_eq!(
            PurchaseRequestStatus::from_ordinal(3),
            Some(PurchaseRequestStatus::AlreadyEntitled)
        );
        assert_eq!(PurchaseRequestStatus::from_ordinal(4), None);
        assert_eq!(PurchaseRequestStatus::InvalidSku as i32, 2);
    }

    #[test]
    fn receipt_record_uses_sku_and_token() {
        let receipt = Receipt {
            sku: "pro_yearly".into(),
            item_type: ItemType::Subscription,
            purchase_token: "tok".into(),
            subscription_period: Some("2024-01-01..".into()),
        };
        let record = receipt.to_record();
        assert_eq!(record.product_id, "pro_yearly");
        assert_eq!(record.product_type, Some(ProductType::Subscription));
        assert_eq!(receipt.extra_properties().len(), 1);
    }

    #[test]
    fn item_type_names() {
        assert_eq!(ItemType::parse("entitled"), Some(ItemType::Entitled));
        assert_eq!(ItemType::parse("bogus"), None);
        assert_eq!(Offset::Beginning.to_string(), "BEGINNING");
    }
}
