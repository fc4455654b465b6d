//! Host-facing boundaries: the purchase observer, progress indicator and
//! activity launcher.

use crate::bundle::Bundle;
use crate::errors::BillingError;
use crate::state::PurchaseState;
use crate::Result;

/// Receives every asynchronous outcome a provider produces.
///
/// Callbacks may arrive on any runtime worker thread.
pub trait PurchaseObserver: Send + Sync {
    fn on_purchase_state_changed(&self, product_id: &str, state: PurchaseState);

    fn on_product_details_received(&self, product_id: &str);

    fn on_product_details_error(&self, product_id: &str, message: &str);

    /// Failures that are not tied to a single purchase callback, such as a
    /// failed initialization, a rejected restore or a verification failure.
    fn on_provider_error(&self, _error: &BillingError) {}
}

/// Modal progress UI shown while background work is in flight.
pub trait ProgressIndicator: Send + Sync {
    fn show(&self);

    /// Must be idempotent.
    fn dismiss(&self);
}

/// Progress indicator that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressIndicator for NoProgress {
    fn show(&self) {}

    fn dismiss(&self) {}
}

/// Host activity started for a result.
#[derive(Clone, Debug, PartialEq)]
pub struct ActivityRequest {
    /// Fully qualified component (`package/class`).
    pub component: String,
    pub extras: Bundle,
}

impl ActivityRequest {
    pub fn new(component: impl Into<String>, extras: Bundle) -> Self {
        Self {
            component: component.into(),
            extras,
        }
    }
}

/// Starts vendor activities on the host UI.
///
/// The result comes back through `BillingProvider::on_activity_result` with
/// the same request code.
pub trait ActivityLauncher: Send + Sync {
    fn start_activity_for_result(&self, request: ActivityRequest, request_code: i32) -> Result<()>;
}
