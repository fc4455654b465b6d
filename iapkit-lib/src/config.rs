//! Configuration types for billing providers.
//!
//! Everything is plain serde data so a host can ship a single JSON document.

use serde::{Deserialize, Serialize};

use crate::errors::BillingError;
use crate::state::Vendor;
use crate::Result;

/// Operating mode of the IAP service.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IapMode {
    /// Real payments.
    #[default]
    Commercial,
    /// Every payment succeeds without charging.
    TestSuccess,
    /// Every payment fails.
    TestFail,
}

impl IapMode {
    /// Mode value passed to the service's `init` call.
    pub fn code(self) -> i32 {
        match self {
            Self::Commercial => 0,
            Self::TestSuccess => 1,
            Self::TestFail => -1,
        }
    }
}

/// Purchase verification over HTTP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyConfig {
    /// Connect timeout in seconds.
    #[serde(default = "default_verify_timeout")]
    pub connect_timeout_secs: u64,

    /// Read timeout in seconds.
    #[serde(default = "default_verify_timeout")]
    pub read_timeout_secs: u64,
}

fn default_verify_timeout() -> u64 {
    10
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: default_verify_timeout(),
            read_timeout_secs: default_verify_timeout(),
        }
    }
}

/// Configuration for the IAP service provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamsungConfig {
    /// Item group the application's products belong to.
    #[serde(default)]
    pub item_group_id: String,

    /// Package name of the host application.
    #[serde(default)]
    pub package_name: String,

    #[serde(default)]
    pub mode: IapMode,

    /// Records requested per item-list or inbox page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// First day (`yyyyMMdd`) of the inbox range used for restores.
    #[serde(default = "default_inbox_start_date")]
    pub inbox_start_date: String,

    #[serde(default)]
    pub verify: VerifyConfig,
}

fn default_page_size() -> u32 {
    25
}

fn default_inbox_start_date() -> String {
    "20131001".to_string()
}

impl SamsungConfig {
    /// Create a configuration for an item group.
    pub fn new(item_group_id: impl Into<String>, package_name: impl Into<String>) -> Self {
        Self {
            item_group_id: item_group_id.into(),
            package_name: package_name.into(),
            mode: IapMode::default(),
            page_size: default_page_size(),
            inbox_start_date: default_inbox_start_date(),
            verify: VerifyConfig::default(),
        }
    }

    /// Set the service mode.
    pub fn with_mode(mut self, mode: IapMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the page size for item-list and inbox queries.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.item_group_id.trim().is_empty() {
            return Err(BillingError::InvalidConfig("item_group_id is required".into()));
        }
        if self.page_size == 0 {
            return Err(BillingError::InvalidConfig("page_size must be positive".into()));
        }
        let date_ok = self.inbox_start_date.len() == 8
            && chrono::NaiveDate::parse_from_str(&self.inbox_start_date, "%Y%m%d").is_ok();
        if !date_ok {
            return Err(BillingError::InvalidConfig(format!(
                "inbox_start_date must be yyyyMMdd, got {:?}",
                self.inbox_start_date
            )));
        }
        Ok(())
    }
}

/// Configuration for the Play billing provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayConfig {
    /// Query and restore subscriptions in addition to in-app products.
    #[serde(default = "default_true")]
    pub subscriptions_enabled: bool,
}

impl Default for PlayConfig {
    fn default() -> Self {
        Self {
            subscriptions_enabled: true,
        }
    }
}

/// Configuration for the alternate-store provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmazonConfig {
    /// Ask the store for the current user id during initialization.
    #[serde(default = "default_true")]
    pub request_user_id: bool,
}

impl Default for AmazonConfig {
    fn default() -> Self {
        Self {
            request_user_id: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Top-level document selecting a vendor and its settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingConfig {
    pub vendor: Vendor,

    #[serde(default)]
    pub play: PlayConfig,

    #[serde(default)]
    pub samsung: Option<SamsungConfig>,

    #[serde(default)]
    pub amazon: AmazonConfig,
}

impl BillingConfig {
    /// Parse and validate a JSON configuration document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        match (self.vendor, &self.samsung) {
            (Vendor::Samsung, Some(samsung)) => samsung.validate(),
            (Vendor::Samsung, None) => Err(BillingError::InvalidConfig(
                "samsung section is required for the samsung vendor".into(),
            )),
            _ => Ok(()),
        }
    }

    /// The IAP service section, validated.
    pub fn samsung_config(&self) -> Result<SamsungConfig> {
        let samsung = self
            .samsung
            .clone()
            .ok_or_else(|| BillingError::InvalidConfig("missing samsung section".into()))?;
        samsung.validate()?;
        Ok(samsung)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BillingErrorCode;

    #[test]
    fn samsung_defaults() {
        let config: SamsungConfig =
            serde_json::from_str(r#"{"item_group_id":"100000100001","package_name":"com.example.app"}"#)
                .unwrap();
        assert_eq!(config.mode, IapMode::Commercial);
        assert_eq!(config.page_size, 25);
        assert_eq!(config.inbox_start_date, "20131001");
        assert_eq!(config.verify, VerifyConfig::default());
        assert_eq!(config.verify.connect_timeout_secs, 10);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn mode_codes() {
        assert_eq!(IapMode::Commercial.code(), 0);
        assert_eq!(IapMode::TestSuccess.code(), 1);
        assert_eq!(IapMode::TestFail.code(), -1);
        let mode: IapMode = serde_json::from_str("\"test_success\"").unwrap();
        assert_eq!(mode, IapMode::TestSuccess);
    }

    #[test]
    fn validation_rejects_bad_samsung_settings() {
        let config = SamsungConfig::new("", "com.example.app");
        assert_eq!(
            config.validate().unwrap_err().code(),
            BillingErrorCode::InvalidConfig
        );

        let mut config = SamsungConfig::new("100000100001", "com.example.app");
        config.inbox_start_date = "2013-10-01".into();
        assert!(config.validate().is_err());

        let config = SamsungConfig::new("100000100001", "com.example.app").with_page_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn billing_config_from_json() {
        let config = BillingConfig::from_json(r#"{"vendor":"google"}"#).unwrap();
        assert_eq!(config.vendor, Vendor::Google);
        assert!(config.play.subscriptions_enabled);
        assert!(config.amazon.request_user_id);

        assert!(BillingConfig::from_json(r#"{"vendor":"samsung"}"#).is_err());

        let config = BillingConfig::from_json(
            r#"{"vendor":"samsung","samsung":{"item_group_id":"100000100001","mode":"test_success"}}"#,
        )
        .unwrap();
        assert_eq!(config.samsung_config().unwrap().mode, IapMode::TestSuccess);
    }
}
