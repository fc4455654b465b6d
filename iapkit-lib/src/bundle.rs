//! Typed key/value bundles exchanged with vendor services and activity results.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Keys used by the vendor services.
pub mod keys {
    pub const THIRD_PARTY_NAME: &str = "THIRD_PARTY_NAME";
    pub const STATUS_CODE: &str = "STATUS_CODE";
    pub const ERROR_STRING: &str = "ERROR_STRING";
    pub const IAP_UPGRADE_URL: &str = "IAP_UPGRADE_URL";
    pub const ITEM_GROUP_ID: &str = "ITEM_GROUP_ID";
    pub const ITEM_ID: &str = "ITEM_ID";
    pub const RESULT_LIST: &str = "RESULT_LIST";
    pub const RESULT_OBJECT: &str = "RESULT_OBJECT";

    pub const RESPONSE_CODE: &str = "RESPONSE_CODE";
    pub const INAPP_PURCHASE_DATA: &str = "INAPP_PURCHASE_DATA";
    pub const INAPP_DATA_SIGNATURE: &str = "INAPP_DATA_SIGNATURE";
}

/// A single bundle value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum BundleValue {
    Int(i32),
    Long(i64),
    Bool(bool),
    Str(String),
    StrList(Vec<String>),
}

/// String-keyed map of typed values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    values: HashMap<String, BundleValue>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: BundleValue) {
        self.values.insert(key.into(), value);
    }

    pub fn put_int(&mut self, key: impl Into<String>, value: i32) {
        self.insert(key, BundleValue::Int(value));
    }

    pub fn put_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.insert(key, BundleValue::Str(value.into()));
    }

    pub fn put_string_list(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.insert(key, BundleValue::StrList(values));
    }

    /// Builder form of [`Bundle::put_int`].
    pub fn with_int(mut self, key: impl Into<String>, value: i32) -> Self {
        self.put_int(key, value);
        self
    }

    /// Builder form of [`Bundle::put_string`].
    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.put_string(key, value);
        self
    }

    /// Builder form of [`Bundle::put_string_list`].
    pub fn with_string_list(mut self, key: impl Into<String>, values: Vec<String>) -> Self {
        self.put_string_list(key, values);
        self
    }

    pub fn get(&self, key: &str) -> Option<&BundleValue> {
        self.values.get(key)
    }

    pub fn get_int(&self, key: &str) -> Option<i32> {
        match self.values.get(key)? {
            BundleValue::Int(value) => Some(*value),
            BundleValue::Long(value) => i32::try_from(*value).ok(),
            _ => None,
        }
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            BundleValue::Str(value) => Some(value),
            _ => None,
        }
    }

    pub fn get_string_list(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key)? {
            BundleValue::StrList(values) => Some(values),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &BundleValue)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, BundleValue)> for Bundle {
    fn from_iter<T: IntoIterator<Item = (String, BundleValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_getters_reject_mismatched_values() {
        let bundle = Bundle::new()
            .with_int(keys::STATUS_CODE, -1003)
            .with_string(keys::ERROR_STRING, "already purchased")
            .with_string_list(keys::RESULT_LIST, vec!["{}".into()]);

        assert_eq!(bundle.get_int(keys::STATUS_CODE), Some(-1003));
        assert_eq!(bundle.get_string(keys::STATUS_CODE), None);
        assert_eq!(bundle.get_string(keys::ERROR_STRING), Some("already purchased"));
        assert_eq!(bundle.get_string_list(keys::RESULT_LIST).map(<[String]>::len), Some(1));
        assert_eq!(bundle.get_int("missing"), None);
    }

    #[test]
    fn long_values_narrow_when_in_range() {
        let mut bundle = Bundle::new();
        bundle.insert("small", BundleValue::Long(7));
        bundle.insert("large", BundleValue::Long(i64::MAX));
        assert_eq!(bundle.get_int("small"), Some(7));
        assert_eq!(bundle.get_int("large"), None);
    }
}
