//! IAPkit library.
//!
//! One in-app purchase contract over three billing backends: the Play store
//! billing service, the IAP service reached through a signed binder, and an
//! alternate store whose SDK answers on an event channel.
//!
//! # Features
//!
//! - **Canonical states**: every vendor outcome collapses to a [`PurchaseState`]
//! - **Single purchase slot**: one purchase in flight, one terminal callback
//! - **Restore**: owned products are restored on startup and on request
//! - **Verification**: IAP service payments are confirmed over HTTP
//!
//! # Example
//!
//! ```ignore
//! use iapkit_lib::prelude::*;
//!
//! let provider = GoogleBillingProvider::new(client, PlayConfig::default(), ProviderContext::current()?);
//! provider.set_purchase_observer(observer);
//! provider.product_set_type("remove_ads", "non-consumable");
//! provider.initialize();
//!
//! // Later, once the observer saw the restore finish:
//! provider.send_request(1, "remove_ads", "");
//! ```

pub mod bundle;
pub mod config;
pub mod errors;
pub mod mapper;
pub mod observer;
pub mod pending;
pub mod prelude;
pub mod product;
pub mod properties;
pub mod provider;
pub mod providers;
pub mod state;
pub mod tasks;
pub mod transport;
pub mod verify;

/// Mock transports and a recording observer for tests.
///
/// This module is only available with the `test-utils` feature or in test builds.
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use errors::{BillingError, BillingErrorCode};
pub use provider::BillingProvider;
pub use providers::{AmazonBillingProvider, GoogleBillingProvider, SamsungBillingProvider};
pub use state::{ProviderState, PurchasePhase, PurchaseState, Vendor};

/// Common result alias for billing operations.
pub type Result<T> = std::result::Result<T, BillingError>;
