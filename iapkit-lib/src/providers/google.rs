//! Play billing provider.
//!
//! Purchases are launched through the billing client and complete through
//! the host activity result. Restores query owned purchases per item type in
//! a single page. Consumption is a vendor round-trip by purchase token.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::bundle::Bundle;
use crate::config::PlayConfig;
use crate::errors::BillingError;
use crate::mapper::map_play_response;
use crate::pending::{PendingTable, RESULT_OK};
use crate::product::ProductType;
use crate::properties::keys;
use crate::provider::BillingProvider;
use crate::providers::core::{ProviderContext, ProviderCore, PRODUCT_NOT_FOUND};
use crate::providers::restore::RestoreRun;
use crate::state::{PurchaseState, Vendor};
use crate::tasks::TaskKind;
use crate::transport::play::{
    response, OwnedPurchase, PlayBillingClient, PurchaseActivityResult, PurchaseFlowRequest,
    ITEM_TYPE_INAPP, ITEM_TYPE_SUBS,
};
use crate::Result;

/// Billing provider backed by a [`PlayBillingClient`].
pub struct GoogleBillingProvider {
    inner: Arc<GoogleInner>,
}

struct GoogleInner {
    core: ProviderCore,
    client: Arc<dyn PlayBillingClient>,
    config: PlayConfig,
    pending: PendingTable<String>,
    billing_supported: AtomicBool,
    subscriptions_supported: AtomicBool,
}

impl GoogleBillingProvider {
    pub fn new(client: Arc<dyn PlayBillingClient>, config: PlayConfig, context: ProviderContext) -> Self {
        Self {
            inner: Arc::new(GoogleInner {
                core: ProviderCore::new(Vendor::Google, context),
                client,
                config,
                pending: PendingTable::new(),
                billing_supported: AtomicBool::new(false),
                subscriptions_supported: AtomicBool::new(false),
            }),
        }
    }

    pub fn subscriptions_supported(&self) -> bool {
        self.inner.subscriptions_supported.load(Ordering::SeqCst)
    }
}

impl GoogleInner {
    /// Connect and check which item types the store can bill.
    async fn connect(&self) -> Result<()> {
        self.client
            .connect()
            .await
            .map_err(|err| BillingError::VendorUnavailable(format!("billing connect failed: {}", err)))?;

        let code = self.client.is_billing_supported(ITEM_TYPE_INAPP).await?;
        if code != response::OK {
            return Err(BillingError::VendorUnavailable(format!(
                "in-app billing not supported: {}",
                response::describe(code)
            )));
        }
        self.billing_supported.store(true, Ordering::SeqCst);

        if self.config.subscriptions_enabled {
            match self.client.is_billing_supported(ITEM_TYPE_SUBS).await {
                Ok(response::OK) => self.subscriptions_supported.store(true, Ordering::SeqCst),
                Ok(code) => tracing::warn!("subscriptions not supported: {}", response::describe(code)),
                Err(err) => tracing::warn!("subscription support check failed: {}", err),
            }
        }
        Ok(())
    }

    fn item_types(&self) -> Vec<&'static str> {
        let mut types = vec![ITEM_TYPE_INAPP];
        if self.subscriptions_supported.load(Ordering::SeqCst) {
            types.push(ITEM_TYPE_SUBS);
        }
        types
    }

    fn start_restore(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.core
            .spawn(TaskKind::Restore, async move { inner.restore().await });
    }

    async fn restore(&self) -> Result<()> {
        let mut run = RestoreRun::new();
        for item_type in self.item_types() {
            run.next_page();
            let result = self.client.get_purchases(item_type).await?;
            if result.response_code != response::OK {
                return Err(BillingError::rejected(
                    result.response_code,
                    format!("owned {} query failed: {}", item_type, response::describe(result.response_code)),
                ));
            }
            for owned in &result.purchases {
                let product_type = self.core.product_type(&owned.purchase.product_id).or(
                    (item_type == ITEM_TYPE_SUBS).then_some(ProductType::Subscription),
                );
                let record = owned.to_record(product_type);
                if product_type == Some(ProductType::Consumable) {
                    // Bought but never consumed.
                    self.core.record_purchase(&record, PurchaseState::Purchased);
                } else {
                    run.restore(&self.core, &record);
                }
            }
        }
        run.finish(&self.core);
        Ok(())
    }

    async fn launch(&self, request: PurchaseFlowRequest) -> Result<()> {
        let request_code = request.request_code;
        match self.client.launch_purchase_flow(request).await {
            Ok(response::OK) => Ok(()),
            Ok(code) => {
                if self.pending.take(request_code).is_some() {
                    tracing::warn!("purchase flow refused: {}", response::describe(code));
                    self.core.resolve_purchase(None, map_play_response(code));
                }
                Ok(())
            }
            Err(err) => {
                if self.pending.take(request_code).is_some() {
                    self.core.resolve_purchase(None, PurchaseState::Cancelled);
                }
                Err(err)
            }
        }
    }

    fn complete_purchase(&self, product_id: &str, result_code: i32, result: PurchaseActivityResult) {
        if result_code != RESULT_OK {
            tracing::debug!(product_id, result_code, "purchase activity cancelled");
            self.core.resolve_purchase(None, PurchaseState::Cancelled);
            return;
        }
        if result.response_code != response::OK {
            self.core
                .resolve_purchase(None, map_play_response(result.response_code));
            return;
        }

        let Some(data) = result.purchase_data else {
            self.core.resolve_purchase(None, PurchaseState::Cancelled);
            self.core.observer().report_error(&BillingError::Serialization(
                "purchase result carries no purchase data".into(),
            ));
            return;
        };
        match OwnedPurchase::parse(&data, result.signature.as_deref().unwrap_or_default()) {
            Ok(owned) => {
                let sku = owned.purchase.product_id.clone();
                let product_type = self
                    .core
                    .product_type(&sku)
                    .or_else(|| self.core.product_type(product_id));
                self.core
                    .record_purchase(&owned.to_record(product_type), PurchaseState::Purchased);
                self.core.resolve_purchase(Some(&sku), PurchaseState::Purchased);
            }
            Err(err) => {
                self.core.resolve_purchase(None, PurchaseState::Cancelled);
                self.core.observer().report_error(&err);
            }
        }
    }

    async fn consume(&self, product_id: &str, purchase_token: &str) -> Result<()> {
        let code = self.client.consume_purchase(purchase_token).await?;
        if code != response::OK {
            return Err(BillingError::rejected(
                code,
                format!("consume of {} failed: {}", product_id, response::describe(code)),
            ));
        }
        self.core.owned().remove(product_id);
        tracing::info!(product_id, "purchase consumed");
        Ok(())
    }

    async fn fetch_details(&self, product_id: &str, item_type: &str) {
        let observer = self.core.observer();
        let result = match self
            .client
            .get_sku_details(item_type, &[product_id.to_string()])
            .await
        {
            Ok(result) if result.response_code == response::OK => result,
            Ok(result) => {
                observer.product_details_error(product_id, response::describe(result.response_code));
                return;
            }
            Err(err) => {
                observer.product_details_error(product_id, &err.to_string());
                return;
            }
        };

        match result
            .details
            .into_iter()
            .find(|details| details.product_id == product_id)
        {
            Some(details) => {
                let product = details.into_product(self.core.product_type(product_id));
                self.core.store_product(product);
                observer.product_details_received(product_id);
            }
            None => observer.product_details_error(product_id, PRODUCT_NOT_FOUND),
        }
    }
}

impl BillingProvider for GoogleBillingProvider {
    fn core(&self) -> &ProviderCore {
        &self.inner.core
    }

    fn initialize(&self) {
        if !self.inner.core.begin_initialize() {
            return;
        }
        let inner = Arc::clone(&self.inner);
        self.inner.core.spawn(TaskKind::Init, async move {
            match inner.connect().await {
                Ok(()) => {
                    inner.core.mark_ready();
                    inner.start_restore();
                }
                Err(err) => inner.core.fail_initialize(&err),
            }
            Ok(())
        });
    }

    fn can_make_purchase(&self) -> bool {
        self.inner.core.is_ready() && self.inner.billing_supported.load(Ordering::SeqCst)
    }

    fn restore_purchases(&self) -> bool {
        if !self.inner.core.is_ready() {
            tracing::warn!("restore rejected: billing not initialized");
            return false;
        }
        self.inner.start_restore();
        true
    }

    fn send_request(&self, purchase_id: i32, product_id: &str, developer_payload: &str) -> bool {
        let core = &self.inner.core;
        if core.product_type(product_id) == Some(ProductType::Subscription) && !self.subscriptions_supported() {
            tracing::warn!(purchase_id, product_id, "purchase rejected: subscriptions not supported");
            return false;
        }
        let product_type = match core.begin_purchase(product_id) {
            Ok(product_type) => product_type,
            Err(err) => {
                tracing::warn!(purchase_id, product_id, "purchase rejected: {}", err);
                return false;
            }
        };

        let request_code = self.inner.pending.register(product_id.to_string());
        let request = PurchaseFlowRequest {
            sku: product_id.to_string(),
            item_type: product_type.play_item_type().to_string(),
            developer_payload: developer_payload.to_string(),
            request_code,
        };
        tracing::debug!(purchase_id, product_id, request_code, "launching purchase flow");
        let inner = Arc::clone(&self.inner);
        core.spawn_detached(async move { inner.launch(request).await });
        true
    }

    fn consume_purchase(&self, product_id: &str) -> bool {
        let core = &self.inner.core;
        if !core.is_ready() {
            tracing::warn!(product_id, "consume rejected: billing not initialized");
            return false;
        }
        if !core.owned().contains(product_id) {
            tracing::warn!(product_id, "consume rejected: product not owned");
            return false;
        }
        let purchase_token = core.properties().get(product_id, keys::PURCHASE_TOKEN);
        if purchase_token.is_empty() {
            tracing::warn!(product_id, "consume rejected: no purchase token");
            return false;
        }

        let inner = Arc::clone(&self.inner);
        let product_id = product_id.to_string();
        core.spawn_detached(async move { inner.consume(&product_id, &purchase_token).await });
        true
    }

    fn request_product_details(&self, product_id: &str) -> bool {
        let core = &self.inner.core;
        if !core.is_ready() {
            return false;
        }
        let item_type = core
            .product_type(product_id)
            .map(ProductType::play_item_type)
            .unwrap_or(ITEM_TYPE_INAPP);
        let inner = Arc::clone(&self.inner);
        let product_id = product_id.to_string();
        core.spawn_detached(async move {
            inner.fetch_details(&product_id, item_type).await;
            Ok(())
        });
        true
    }

    fn on_activity_result(&self, request_code: i32, result_code: i32, data: Option<Bundle>) -> bool {
        let Some(product_id) = self.inner.pending.take(request_code) else {
            return false;
        };
        let result = PurchaseActivityResult::from_bundle(data.as_ref());
        self.inner.complete_purchase(&product_id, result_code, result);
        true
    }
}

impl Drop for GoogleBillingProvider {
    fn drop(&mut self) {
        self.inner.core.tasks().cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle;
    use crate::errors::BillingErrorCode;
    use crate::pending::RESULT_CANCELED;
    use crate::state::ProviderState;
    use crate::test_utils::{
        assert_quiet, next_event, play_purchase_json, MockPlayClient, ObserverEvent, RecordingObserver,
    };
    use crate::transport::play::SkuDetails;
    use tokio::runtime::Handle;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn provider(client: Arc<MockPlayClient>) -> (GoogleBillingProvider, UnboundedReceiver<ObserverEvent>) {
        let provider = GoogleBillingProvider::new(
            client,
            PlayConfig::default(),
            ProviderContext::new(Handle::current()),
        );
        let (observer, events) = RecordingObserver::channel();
        provider.set_purchase_observer(observer);
        (provider, events)
    }

    /// Initialized provider with the startup restore already drained.
    async fn ready(client: Arc<MockPlayClient>) -> (GoogleBillingProvider, UnboundedReceiver<ObserverEvent>) {
        let (provider, mut events) = provider(client);
        provider.initialize();
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged(String::new(), PurchaseState::Restored)
        );
        assert_eq!(provider.state(), ProviderState::Ready);
        (provider, events)
    }

    fn purchase_bundle(product_id: &str, token: &str) -> Bundle {
        Bundle::new()
            .with_int(bundle::keys::RESPONSE_CODE, response::OK)
            .with_string(bundle::keys::INAPP_PURCHASE_DATA, play_purchase_json(product_id, token))
            .with_string(bundle::keys::INAPP_DATA_SIGNATURE, "sig==")
    }

    #[tokio::test]
    async fn initialize_restores_owned_products() {
        let client = Arc::new(MockPlayClient::new());
        client.add_purchase(ITEM_TYPE_INAPP, "remove_ads", "tok-1");
        client.add_purchase(ITEM_TYPE_SUBS, "pro_monthly", "tok-2");
        let (provider, mut events) = provider(client);

        provider.initialize();
        provider.initialize();
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("remove_ads".into(), PurchaseState::Restored)
        );
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("pro_monthly".into(), PurchaseState::Restored)
        );
        assert_quiet(&mut events).await;

        assert!(provider.can_make_purchase());
        assert_eq!(provider.get_purchase_list(), r#"["pro_monthly","remove_ads"]"#);
        assert_eq!(provider.get_purchase_property("remove_ads", keys::PURCHASE_TOKEN), "tok-1");
    }

    #[tokio::test]
    async fn unsupported_billing_fails_initialization() {
        let client = Arc::new(MockPlayClient::new());
        client.set_billing_supported(ITEM_TYPE_INAPP, response::BILLING_UNAVAILABLE);
        let (provider, mut events) = provider(client);

        provider.initialize();
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::ProviderError(BillingErrorCode::VendorUnavailable)
        );
        assert_eq!(provider.state(), ProviderState::Uninitialized);
        assert!(!provider.can_make_purchase());
        assert!(!provider.restore_purchases());
    }

    #[tokio::test]
    async fn unconsumed_consumables_are_owned_without_restore_callback() {
        let client = Arc::new(MockPlayClient::new());
        client.add_purchase(ITEM_TYPE_INAPP, "gems", "tok-gems");
        let (provider, mut events) = provider(client);
        provider.product_set_type("gems", "consumable");

        provider.initialize();
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged(String::new(), PurchaseState::Restored)
        );
        assert!(provider.core().owned().contains("gems"));
    }

    #[tokio::test]
    async fn purchase_before_ready_is_rejected() {
        let client = Arc::new(MockPlayClient::new());
        let (provider, _events) = provider(client.clone());
        provider.product_set_type("gems", "consumable");

        assert!(!provider.send_request(1, "gems", ""));
        assert_eq!(provider.core().pending_purchase(), None);
        assert!(client.launches().is_empty());
    }

    #[tokio::test]
    async fn purchase_completes_through_activity_result() {
        let client = Arc::new(MockPlayClient::new());
        let (provider, mut events) = ready(client.clone()).await;
        provider.product_set_type("remove_ads", "non-consumable");

        assert!(!provider.send_request(1, "unregistered", ""));
        assert!(provider.send_request(1, "remove_ads", "payload"));
        assert!(!provider.send_request(2, "remove_ads", "payload"));

        let launch = client.next_launch().await;
        assert_eq!(launch.sku, "remove_ads");
        assert_eq!(launch.item_type, ITEM_TYPE_INAPP);
        assert_eq!(launch.developer_payload, "payload");

        assert!(!provider.on_activity_result(launch.request_code + 1, RESULT_OK, None));
        assert!(provider.on_activity_result(
            launch.request_code,
            RESULT_OK,
            Some(purchase_bundle("remove_ads", "tok-9"))
        ));
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("remove_ads".into(), PurchaseState::Purchased)
        );
        assert!(provider.core().owned().contains("remove_ads"));
        assert_eq!(provider.get_purchase_property("remove_ads", keys::SIGNATURE), "sig==");
        assert_eq!(provider.core().pending_purchase(), None);
    }

    #[tokio::test]
    async fn cancelled_activity_resolves_with_marker() {
        let client = Arc::new(MockPlayClient::new());
        let (provider, mut events) = ready(client.clone()).await;
        provider.product_set_type("gems", "consumable");

        assert!(provider.send_request(7, "gems", ""));
        let launch = client.next_launch().await;
        assert!(provider.on_activity_result(launch.request_code, RESULT_CANCELED, None));
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("gems".into(), PurchaseState::Cancelled)
        );
        assert!(!provider.core().owned().contains("gems"));
    }

    #[tokio::test]
    async fn refused_launch_maps_response_code() {
        let client = Arc::new(MockPlayClient::new());
        client.set_launch_response(response::ITEM_ALREADY_OWNED);
        let (provider, mut events) = ready(client).await;
        provider.product_set_type("remove_ads", "non-consumable");

        assert!(provider.send_request(1, "remove_ads", ""));
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("remove_ads".into(), PurchaseState::AlreadyOwned)
        );
        assert_quiet(&mut events).await;
    }

    #[tokio::test]
    async fn unreadable_purchase_data_is_reported() {
        let client = Arc::new(MockPlayClient::new());
        let (provider, mut events) = ready(client.clone()).await;
        provider.product_set_type("gems", "consumable");

        assert!(provider.send_request(1, "gems", ""));
        let launch = client.next_launch().await;
        let data = Bundle::new()
            .with_int(bundle::keys::RESPONSE_CODE, response::OK)
            .with_string(bundle::keys::INAPP_PURCHASE_DATA, "{not json");
        assert!(provider.on_activity_result(launch.request_code, RESULT_OK, Some(data)));

        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("gems".into(), PurchaseState::Cancelled)
        );
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::ProviderError(BillingErrorCode::Serialization)
        );
    }

    #[tokio::test]
    async fn consume_requires_ownership_and_vendor_success() {
        let client = Arc::new(MockPlayClient::new());
        client.add_purchase(ITEM_TYPE_INAPP, "gems", "tok-gems");
        let (provider, mut events) = provider(client.clone());
        provider.product_set_type("gems", "consumable");
        provider.initialize();
        next_event(&mut events).await;

        assert!(!provider.consume_purchase("not_owned"));
        assert!(client.consumed().is_empty());

        client.set_consume_response(response::ERROR);
        assert!(provider.consume_purchase("gems"));
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::ProviderError(BillingErrorCode::VendorRejected)
        );
        assert!(provider.core().owned().contains("gems"));

        client.set_consume_response(response::OK);
        assert!(provider.consume_purchase("gems"));
        client.wait_for_consumes(2).await;
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!provider.core().owned().contains("gems"));
        assert_eq!(client.consumed(), vec!["tok-gems", "tok-gems"]);
    }

    #[tokio::test]
    async fn product_details_are_cached() {
        let client = Arc::new(MockPlayClient::new());
        client.add_sku_details(SkuDetails {
            product_id: "pro_monthly".into(),
            item_type: ITEM_TYPE_SUBS.into(),
            price: "$4.99".into(),
            price_currency_code: "USD".into(),
            title: "Pro".into(),
            description: "Monthly pro tier".into(),
            subscription_period: Some("P1M".into()),
        });
        let (provider, mut events) = ready(client).await;
        provider.product_set_type("pro_monthly", "subscription");

        assert_eq!(provider.receive_product_details("pro_monthly"), PRODUCT_NOT_FOUND);
        assert!(provider.request_product_details("pro_monthly"));
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::DetailsReceived("pro_monthly".into())
        );
        let details: serde_json::Value =
            serde_json::from_str(&provider.receive_product_details("pro_monthly")).unwrap();
        assert_eq!(details["price"], "$4.99");
        assert_eq!(provider.get_purchase_property("pro_monthly", keys::CURRENCY_UNIT), "USD");

        assert!(provider.request_product_details("missing"));
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::DetailsError("missing".into(), PRODUCT_NOT_FOUND.into())
        );
    }

    #[tokio::test]
    async fn second_restore_cancels_the_first() {
        let client = Arc::new(MockPlayClient::new());
        let (provider, mut events) = ready(client.clone()).await;
        client.add_purchase(ITEM_TYPE_INAPP, "remove_ads", "tok-1");

        client.stall_next_queries(1);
        assert!(provider.restore_purchases());
        client.wait_for_stalled().await;
        assert!(provider.restore_purchases());

        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("remove_ads".into(), PurchaseState::Restored)
        );
        assert_quiet(&mut events).await;
    }

    #[tokio::test]
    async fn paused_updates_wait_for_enable() {
        let client = Arc::new(MockPlayClient::new());
        let (provider, mut events) = ready(client.clone()).await;
        client.add_purchase(ITEM_TYPE_INAPP, "remove_ads", "tok-1");

        assert!(provider.disable_updates());
        assert!(provider.restore_purchases());
        assert_quiet(&mut events).await;

        assert!(provider.enable_updates());
        assert_eq!(
            next_event(&mut events).await,
            ObserverEvent::StateChanged("remove_ads".into(), PurchaseState::Restored)
        );
    }
}
