//! The vendor-neutral billing contract.

use std::sync::Arc;

use crate::bundle::Bundle;
use crate::observer::PurchaseObserver;
use crate::product::ProductType;
use crate::providers::core::ProviderCore;
use crate::state::{ProviderState, Vendor};

/// Operations every billing provider offers the host.
///
/// Methods return immediately. Outcomes of asynchronous work arrive on the
/// [`PurchaseObserver`]. Boolean results only say whether the request was
/// accepted.
pub trait BillingProvider: Send + Sync {
    /// Shared provider state.
    fn core(&self) -> &ProviderCore;

    /// Start vendor setup. Idempotent while initializing or ready.
    fn initialize(&self);

    fn can_make_purchase(&self) -> bool;

    fn restore_purchases(&self) -> bool;

    /// Start a purchase of a registered product. `purchase_id` is the host's
    /// own tag and is only logged.
    fn send_request(&self, purchase_id: i32, product_id: &str, developer_payload: &str) -> bool;

    fn consume_purchase(&self, product_id: &str) -> bool;

    fn request_product_details(&self, product_id: &str) -> bool;

    /// Deliver a host activity result. Returns false for unknown request codes.
    fn on_activity_result(&self, request_code: i32, result_code: i32, data: Option<Bundle>) -> bool;

    fn vendor(&self) -> Vendor {
        self.core().vendor()
    }

    fn state(&self) -> ProviderState {
        self.core().state()
    }

    /// Resume delivery of purchase updates, replaying any held back.
    fn enable_updates(&self) -> bool {
        if !self.core().is_ready() {
            return false;
        }
        self.core().observer().resume();
        true
    }

    /// Hold back purchase updates until [`BillingProvider::enable_updates`].
    fn disable_updates(&self) -> bool {
        if !self.core().is_ready() {
            return false;
        }
        self.core().observer().pause();
        true
    }

    fn product_set_type(&self, product_id: &str, product_type: &str) -> bool {
        match ProductType::parse(product_type) {
            Some(parsed) => {
                self.core().register_product_type(product_id, parsed);
                true
            }
            None => {
                tracing::warn!(product_id, product_type, "unknown product type");
                false
            }
        }
    }

    /// Acknowledge delivery. Vendors here need no explicit acknowledgement.
    fn confirm_delivery(&self, purchase_id: i32) -> bool {
        tracing::debug!(purchase_id, "delivery confirmed");
        self.core().is_ready()
    }

    fn set_purchase_property(&self, product_id: &str, name: &str, value: &str) -> bool {
        self.core().properties().set(product_id, name, value);
        true
    }

    /// Stored value, or the empty string.
    fn get_purchase_property(&self, product_id: &str, name: &str) -> String {
        self.core().properties().get(product_id, name)
    }

    /// JSON array of owned product ids.
    fn get_purchase_list(&self) -> String {
        self.core().owned().to_json()
    }

    /// Cached product details as JSON, or the not-found sentinel.
    fn receive_product_details(&self, product_id: &str) -> String {
        self.core().product_details_json(product_id)
    }

    fn set_purchase_observer(&self, observer: Arc<dyn PurchaseObserver>) {
        self.core().observer().set(observer);
    }
}
