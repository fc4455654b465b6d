//! Per-product property store and the owned-product set.
//!
//! Both structures are shared between host calls and background tasks, so
//! every access goes through a lock. A poisoned lock is recovered rather
//! than propagated: the data is plain strings and stays consistent.

use std::collections::{BTreeSet, HashMap};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Well-known property names written by the providers.
pub mod keys {
    pub const PRODUCT_ID: &str = "productId";
    pub const ITEM_TYPE: &str = "itemType";
    pub const PRICE: &str = "price";
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const CURRENCY_UNIT: &str = "currencyUnit";
    pub const SUBSCRIPTION_DURATION_UNIT: &str = "subscriptionDurationUnit";
    pub const SUBSCRIPTION_DURATION_MULTIPLIER: &str = "subscriptionDurationMultiplier";
    pub const ITEM_IMAGE_URL: &str = "itemImageUrl";
    pub const ITEM_DOWNLOAD_URL: &str = "itemDownloadUrl";
    pub const ORDER_ID: &str = "orderId";
    pub const PURCHASE_TOKEN: &str = "purchaseToken";
    pub const PURCHASE_DATE: &str = "purchaseDate";
    pub const DEVELOPER_PAYLOAD: &str = "developerPayload";
    pub const VERIFY_URL: &str = "verifyUrl";
    pub const SIGNATURE: &str = "signature";
    pub const SIGNED_DATA: &str = "signedData";
    pub const SUBSCRIPTION_END_DATE: &str = "subscriptionEndDate";
    pub const PURCHASE_STATE: &str = "purchaseState";
    pub const SUBSCRIPTION_PERIOD: &str = "subscriptionPeriod";
    pub const VERIFIED: &str = "verified";
}

/// Product-id keyed map of name/value string properties.
#[derive(Debug, Default)]
pub struct PropertyStore {
    records: RwLock<HashMap<String, HashMap<String, String>>>,
}

impl PropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, HashMap<String, String>>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, HashMap<String, String>>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Upsert one property, creating the record if needed.
    pub fn set(&self, product_id: &str, name: &str, value: &str) {
        self.write()
            .entry(product_id.to_string())
            .or_default()
            .insert(name.to_string(), value.to_string());
    }

    /// Upsert several properties under a single lock acquisition.
    pub fn set_all<I, K, V>(&self, product_id: &str, values: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut records = self.write();
        let record = records.entry(product_id.to_string()).or_default();
        for (name, value) in values {
            record.insert(name.into(), value.into());
        }
    }

    /// Property value, or the empty string when absent.
    pub fn get(&self, product_id: &str, name: &str) -> String {
        self.read()
            .get(product_id)
            .and_then(|record| record.get(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.read().contains_key(product_id)
    }

    /// Copy of every property stored for a product.
    pub fn snapshot(&self, product_id: &str) -> HashMap<String, String> {
        self.read().get(product_id).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }
}

/// Product identifiers the current user owns.
#[derive(Debug, Default)]
pub struct OwnedSet {
    items: RwLock<BTreeSet<String>>,
}

impl OwnedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the product was not already owned.
    pub fn insert(&self, product_id: &str) -> bool {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(product_id.to_string())
    }

    /// Returns true if the product was owned.
    pub fn remove(&self, product_id: &str) -> bool {
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(product_id)
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(product_id)
    }

    /// Sorted product identifiers.
    pub fn to_vec(&self) -> Vec<String> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// JSON array of the sorted product identifiers.
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.to_vec()).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
