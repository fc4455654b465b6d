//! Product catalog entries and purchase records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::properties::keys;

/// Kind of product as registered by the host.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProductType {
    Consumable,
    NonConsumable,
    Subscription,
}

impl ProductType {
    /// Parse a host or vendor type tag.
    ///
    /// Accepts the host names as well as the two-digit item type codes used
    /// by the IAP service.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "consumable" | "00" => Some(Self::Consumable),
            "non-consumable" | "nonconsumable" | "non_consumable" | "01" => {
                Some(Self::NonConsumable)
            }
            "subscription" | "subs" | "02" => Some(Self::Subscription),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Consumable => "consumable",
            Self::NonConsumable => "non-consumable",
            Self::Subscription => "subscription",
        }
    }

    /// Item type code used by the IAP service.
    pub fn samsung_code(self) -> &'static str {
        match self {
            Self::Consumable => "00",
            Self::NonConsumable => "01",
            Self::Subscription => "02",
        }
    }

    /// Item type understood by the Play billing service.
    pub fn play_item_type(self) -> &'static str {
        match self {
            Self::Subscription => crate::transport::play::ITEM_TYPE_SUBS,
            _ => crate::transport::play::ITEM_TYPE_INAPP,
        }
    }

    /// Non-consumables and subscriptions survive reinstalls and are restored.
    pub fn is_restorable(self) -> bool {
        !matches!(self, Self::Consumable)
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Subscription billing period unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DurationUnit {
    Day,
    Week,
    Month,
    Year,
}

impl DurationUnit {
    /// Parse a unit name such as `MONTH` or `week`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "day" | "days" => Some(Self::Day),
            "week" | "weeks" => Some(Self::Week),
            "month" | "months" => Some(Self::Month),
            "year" | "years" => Some(Self::Year),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

/// Subscription billing period, e.g. three months.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionDuration {
    pub unit: DurationUnit,
    pub multiplier: u32,
}

impl SubscriptionDuration {
    /// Parse a single-component ISO 8601 period (`P1M`, `P1W`, `P3M`, `P1Y`, `P7D`).
    pub fn parse_iso8601(period: &str) -> Option<Self> {
        let body = period.trim().strip_prefix('P')?;
        let unit_char = body.chars().last()?;
        let count = &body[..body.len() - unit_char.len_utf8()];
        let multiplier: u32 = count.parse().ok()?;
        let unit = match unit_char {
            'D' => DurationUnit::Day,
            'W' => DurationUnit::Week,
            'M' => DurationUnit::Month,
            'Y' => DurationUnit::Year,
            _ => return None,
        };
        (multiplier > 0).then_some(Self { unit, multiplier })
    }

    /// Build from a unit name and a textual multiplier as reported by the IAP service.
    pub fn from_parts(unit: &str, multiplier: &str) -> Option<Self> {
        let unit = DurationUnit::parse(unit)?;
        let multiplier = multiplier.trim().parse().ok().filter(|m| *m > 0)?;
        Some(Self { unit, multiplier })
    }
}

/// Catalog entry for one product.
///
/// Entries are replaced wholesale when a newer detail fetch arrives.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub product_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
    pub price: String,
    pub title: String,
    pub description: String,
    pub currency_unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_duration: Option<SubscriptionDuration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

impl Product {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            ..Self::default()
        }
    }

    /// Property name/value pairs mirrored into the property store.
    pub fn to_properties(&self) -> Vec<(&'static str, String)> {
        let mut props = vec![
            (keys::PRODUCT_ID, self.product_id.clone()),
            (keys::PRICE, self.price.clone()),
            (keys::TITLE, self.title.clone()),
            (keys::DESCRIPTION, self.description.clone()),
            (keys::CURRENCY_UNIT, self.currency_unit.clone()),
        ];
        if let Some(product_type) = self.product_type {
            props.push((keys::ITEM_TYPE, product_type.as_str().to_string()));
        }
        if let Some(duration) = self.subscription_duration {
            props.push((keys::SUBSCRIPTION_DURATION_UNIT, duration.unit.as_str().to_string()));
            props.push((
                keys::SUBSCRIPTION_DURATION_MULTIPLIER,
                duration.multiplier.to_string(),
            ));
        }
        if let Some(url) = &self.image_url {
            props.push((keys::ITEM_IMAGE_URL, url.clone()));
        }
        if let Some(url) = &self.download_url {
            props.push((keys::ITEM_DOWNLOAD_URL, url.clone()));
        }
        props
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// A vendor-confirmed purchase as recorded in the property store.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PurchaseRecord {
    pub product_id: String,
    pub product_type: Option<ProductType>,
    pub order_id: String,
    pub purchase_token: String,
    pub purchase_date: String,
    pub developer_payload: String,
    pub verify_url: String,
    pub signature: String,
    pub signed_data: String,
    pub subscription_end_date: String,
}

impl PurchaseRecord {
    pub fn new(product_id: impl Into<String>) -> Self {
        Self {
            product_id: product_id.into(),
            ..Self::default()
        }
    }

    /// Non-empty fields as property name/value pairs.
    pub fn to_properties(&self) -> Vec<(&'static str, String)> {
        let mut props = vec![(keys::PRODUCT_ID, self.product_id.clone())];
        if let Some(product_type) = self.product_type {
            props.push((keys::ITEM_TYPE, product_type.as_str().to_string()));
        }
        let optional = [
            (keys::ORDER_ID, &self.order_id),
            (keys::PURCHASE_TOKEN, &self.purchase_token),
            (keys::PURCHASE_DATE, &self.purchase_date),
            (keys::DEVELOPER_PAYLOAD, &self.developer_payload),
            (keys::VERIFY_URL, &self.verify_url),
            (keys::SIGNATURE, &self.signature),
            (keys::SIGNED_DATA, &self.signed_data),
            (keys::SUBSCRIPTION_END_DATE, &self.subscription_end_date),
        ];
        props.extend(
            optional
                .into_iter()
                .filter(|(_, value)| !value.is_empty())
                .map(|(name, value)| (name, value.clone())),
        );
        props
    }
}
