//! Vendor transport surfaces.
//!
//! Each submodule describes what one vendor SDK or service offers, as an
//! async or channel based trait plus its wire types. Hosts implement the
//! traits; providers consume them.

pub mod iap_service;
pub mod play;
pub mod purchasing;

pub use iap_service::{IapConnector, IapServiceClient};
pub use play::PlayBillingClient;
pub use purchasing::{PurchasingEvent, PurchasingService};
