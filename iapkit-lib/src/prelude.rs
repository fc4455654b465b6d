//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use iapkit_lib::prelude::*;
//! ```

// Contract and states
pub use crate::provider::BillingProvider;
pub use crate::state::{ProviderState, PurchaseState, Vendor};

// Error handling
pub use crate::errors::{BillingError, BillingErrorCode};
pub use crate::Result;

// Host callbacks
pub use crate::observer::{ActivityLauncher, ActivityRequest, ProgressIndicator, PurchaseObserver};

// Configuration
pub use crate::config::{AmazonConfig, BillingConfig, PlayConfig, SamsungConfig};

// Providers
pub use crate::providers::{
    AmazonBillingProvider, GoogleBillingProvider, ProviderContext, SamsungBillingProvider,
};

// Vendor transports
pub use crate::transport::{IapConnector, PlayBillingClient, PurchasingEvent, PurchasingService};
