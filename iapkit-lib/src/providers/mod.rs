//! Vendor billing providers.
//!
//! Each provider pairs a shared [`ProviderCore`] with one vendor transport.
//! The core owns product state, the purchase slot and background tasks; the
//! provider translates between vendor responses and canonical states.

pub mod amazon;
pub mod core;
pub mod google;
pub mod restore;
pub mod samsung;

pub use self::core::{ObserverHandle, ProviderContext, ProviderCore, PRODUCT_NOT_FOUND};
pub use amazon::AmazonBillingProvider;
pub use google::GoogleBillingProvider;
pub use restore::RestoreRun;
pub use samsung::SamsungBillingProvider;
