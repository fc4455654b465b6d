//! Test utilities for billing providers.
//!
//! This module provides scripted stand-ins for every host and vendor
//! boundary:
//! - A recording observer and helpers that await its callbacks
//! - Counting progress indicator and recording activity launcher
//! - Mock Play billing client, IAP service connector and purchasing service
//! - Fixture builders for vendor payloads
//!
//! ## Usage
//!
//! ```rust,ignore
//! use iapkit_lib::test_utils::{next_event, MockPlayClient, ObserverEvent, RecordingObserver};
//!
//! let client = Arc::new(MockPlayClient::new());
//! client.add_purchase("inapp", "remove_ads", "tok-1");
//! let provider = GoogleBillingProvider::new(client, PlayConfig::default(), context);
//! let (observer, mut events) = RecordingObserver::channel();
//! provider.set_purchase_observer(observer);
//! provider.initialize();
//! assert_eq!(
//!     next_event(&mut events).await,
//!     ObserverEvent::StateChanged("remove_ads".into(), PurchaseState::Restored)
//! );
//! ```

mod assertions;
mod fixtures;
mod mock_iap;
mod mock_play;
mod mock_purchasing;

pub use assertions::{
    assert_quiet, next_event, wait_until, CountingProgress, ObserverEvent, RecordingLauncher,
    RecordingObserver,
};

pub use fixtures::{iap_purchase_json, inbox_item_json, item_info_json, play_purchase_json};

pub use mock_iap::{MockIapConnector, StaticVerifier};
pub use mock_play::MockPlayClient;
pub use mock_purchasing::{MockPurchasingService, PurchasingCall};
