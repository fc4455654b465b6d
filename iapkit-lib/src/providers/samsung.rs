//! IAP service provider.
//!
//! Setup runs in stages: package checks, account certification through a
//! host activity, then the service bind and init handshake. After that the
//! catalog is loaded and the purchase inbox is restored page by page.
//! Payments go through a host activity and are verified against the
//! service's verification endpoint once the host has been told.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::bundle::Bundle;
use crate::config::SamsungConfig;
use crate::errors::BillingError;
use crate::mapper::map_samsung_status;
use crate::observer::{ActivityLauncher, ActivityRequest};
use crate::pending::{PendingTable, RESULT_OK};
use crate::product::ProductType;
use crate::properties::keys;
use crate::provider::BillingProvider;
use crate::providers::core::{ProviderContext, ProviderCore, PRODUCT_NOT_FOUND};
use crate::providers::restore::RestoreRun;
use crate::state::{PurchaseState, Vendor};
use crate::tasks::TaskKind;
use crate::transport::iap_service::{
    self, status, IapConnector, IapServiceClient, PaymentResult, PurchaseInfo, ITEM_TYPE_ALL,
};
use crate::verify::{HttpVerifier, VerificationRequest, Verifier};
use crate::Result;

/// Activity a request code was issued for.
#[derive(Clone, Debug, PartialEq, Eq)]
enum SamsungOp {
    AccountCertification,
    Payment { item_id: String },
}

/// The single catalog fetch and everything waiting on it.
#[derive(Debug, Default)]
struct CatalogFetch {
    running: bool,
    waiting: Vec<String>,
    restore_after: bool,
}

/// Billing provider backed by the IAP service.
pub struct SamsungBillingProvider {
    inner: Arc<SamsungInner>,
}

struct SamsungInner {
    core: ProviderCore,
    client: IapServiceClient,
    launcher: Arc<dyn ActivityLauncher>,
    verifier: Arc<dyn Verifier>,
    config: SamsungConfig,
    pending: PendingTable<SamsungOp>,
    catalog_fetch: Mutex<CatalogFetch>,
}

impl SamsungBillingProvider {
    /// Provider verifying payments over HTTP.
    pub fn new(
        connector: Arc<dyn IapConnector>,
        launcher: Arc<dyn ActivityLauncher>,
        config: SamsungConfig,
        context: ProviderContext,
    ) -> Result<Self> {
        let verifier = Arc::new(HttpVerifier::new(config.verify.clone())?);
        Self::with_verifier(connector, launcher, verifier, config, context)
    }

    pub fn with_verifier(
        connector: Arc<dyn IapConnector>,
        launcher: Arc<dyn ActivityLauncher>,
        verifier: Arc<dyn Verifier>,
        config: SamsungConfig,
        context: ProviderContext,
    ) -> Result<Self> {
        config.validate()?;
        let client = IapServiceClient::new(connector, config.package_name.clone(), config.mode);
        Ok(Self {
            inner: Arc::new(SamsungInner {
                core: ProviderCore::new(Vendor::Samsung, context),
                client,
                launcher,
                verifier,
                config,
                pending: PendingTable::new(),
                catalog_fetch: Mutex::new(CatalogFetch::default()),
            }),
        })
    }

    pub fn config(&self) -> &SamsungConfig {
        &self.inner.config
    }
}

impl SamsungInner {
    fn launch(&self, op: SamsungOp, request: ActivityRequest) -> Result<i32> {
        let request_code = self.pending.register(op);
        if let Err(err) = self.launcher.start_activity_for_result(request, request_code) {
            self.pending.take(request_code);
            return Err(err);
        }
        Ok(request_code)
    }

    fn start_account_certification(&self) {
        let launched = self
            .client
            .check_package()
            .and_then(|()| self.launch(SamsungOp::AccountCertification, iap_service::account_request()));
        if let Err(err) = launched {
            self.core.fail_initialize(&err);
        }
    }

    fn on_account_result(self: &Arc<Self>, result_code: i32) {
        if result_code != RESULT_OK {
            self.core.fail_initialize(&BillingError::VendorUnavailable(
                "account certification was cancelled".into(),
            ));
            return;
        }
        let inner = Arc::clone(self);
        self.core.spawn(TaskKind::Init, async move {
            match inner.client.init().await {
                Ok(()) => {
                    inner.core.mark_ready();
                    inner.start_item_list();
                }
                Err(err) => inner.core.fail_initialize(&err),
            }
            Ok(())
        });
    }

    fn catalog_fetch(&self) -> MutexGuard<'_, CatalogFetch> {
        self.catalog_fetch
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Initial catalog load, followed by the inbox restore.
    fn start_item_list(self: &Arc<Self>) {
        let mut fetch = self.catalog_fetch();
        fetch.restore_after = true;
        self.ensure_catalog_fetch(&mut fetch);
    }

    /// Start the item-list task unless one is already running. The running
    /// task picks up every waiter registered before it finishes.
    fn ensure_catalog_fetch(self: &Arc<Self>, fetch: &mut CatalogFetch) {
        if fetch.running {
            return;
        }
        fetch.running = true;
        let inner = Arc::clone(self);
        self.core.spawn(TaskKind::ItemList, async move {
            let loaded = inner.load_catalog().await;
            let (waiting, restore_after) = {
                let mut fetch = inner.catalog_fetch();
                fetch.running = false;
                (
                    std::mem::take(&mut fetch.waiting),
                    std::mem::take(&mut fetch.restore_after),
                )
            };
            inner.answer_details(&waiting, &loaded);
            if restore_after {
                inner.start_inbox();
                return loaded.map(|_| ());
            }
            Ok(())
        });
    }

    fn start_inbox(self: &Arc<Self>) {
        let inner = Arc::clone(self);
        self.core
            .spawn(TaskKind::Inbox, async move { inner.restore_inbox().await });
    }

    /// Inclusive windows of one page each, starting at item 1.
    fn window(&self, start: u32) -> (u32, u32) {
        (start, start + self.config.page_size - 1)
    }

    /// Fetch every catalog page into the product store.
    async fn load_catalog(&self) -> Result<usize> {
        let mut loaded = 0;
        let mut start = 1;
        loop {
            let (first, last) = self.window(start);
            let page = self
                .client
                .item_list(&self.config.item_group_id, first, last, ITEM_TYPE_ALL)
                .await?;
            let full = page.is_full(self.config.page_size);
            for item in page.items {
                let product = item.into_product();
                if let Some(product_type) = product.product_type {
                    if self.core.product_type(&product.product_id).is_none() {
                        self.core
                            .register_product_type(&product.product_id, product_type);
                    }
                }
                self.core.store_product(product);
                loaded += 1;
            }
            if !full {
                break;
            }
            start = last + 1;
        }
        tracing::debug!(loaded, "catalog loaded");
        Ok(loaded)
    }

    async fn restore_inbox(&self) -> Result<()> {
        let today = chrono::Local::now().format("%Y%m%d").to_string();
        let mut run = RestoreRun::new();
        let mut start = 1;
        loop {
            run.next_page();
            let (first, last) = self.window(start);
            let page = self
                .client
                .inbox(
                    &self.config.item_group_id,
                    first,
                    last,
                    &self.config.inbox_start_date,
                    &today,
                )
                .await?;
            let full = page.is_full(self.config.page_size);
            for item in &page.items {
                let record = item.to_record();
                if item.product_type() == Some(ProductType::Consumable) {
                    self.core.record_purchase(&record, PurchaseState::Purchased);
                } else {
                    run.restore(&self.core, &record);
                }
            }
            if !full {
                break;
            }
            start = last + 1;
        }
        run.finish(&self.core);
        Ok(())
    }

    fn on_payment_result(self: &Arc<Self>, item_id: &str, result_code: i32, data: Option<&Bundle>) {
        if result_code != RESULT_OK {
            tracing::debug!(item_id, result_code, "payment activity cancelled");
            self.core.resolve_purchase(None, PurchaseState::Cancelled);
            return;
        }

        let result = PaymentResult::from_bundle(data);
        if !result.status.is_ok() {
            let state = map_samsung_status(result.status.code);
            let vendor_item = result.item_id.clone();
            if result.status.code == status::NEED_APP_UPGRADE {
                self.core.observer().report_error(&result.status.into_error());
            } else {
                tracing::warn!(item_id, code = result.status.code, "payment failed: {}", result.status.message);
            }
            self.core.resolve_purchase(vendor_item.as_deref(), state);
            return;
        }

        let parsed = result
            .purchase_json
            .as_deref()
            .ok_or_else(|| BillingError::Serialization("payment result carries no purchase".into()))
            .and_then(PurchaseInfo::from_json);
        let purchase = match parsed {
            Ok(purchase) => purchase,
            Err(err) => {
                self.core.resolve_purchase(None, PurchaseState::Cancelled);
                self.core.observer().report_error(&err);
                return;
            }
        };

        let product_type = self
            .core
            .product_type(&purchase.item_id)
            .or_else(|| self.core.product_type(item_id));
        self.core
            .record_purchase(&purchase.to_record(product_type), PurchaseState::Purchased);
        self.core
            .resolve_purchase(Some(&purchase.item_id), PurchaseState::Purchased);
        self.start_verify(purchase);
    }

    /// Check the payment with the service and record the verdict.
    fn start_verify(self: &Arc<Self>, purchase: PurchaseInfo) {
        let inner = Arc::clone(self);
        self.core.spawn(TaskKind::Verify, async move {
            let request = VerificationRequest::from_purchase(&purchase);
            let outcome = inner.verifier.verify_purchase_result(&request).await;
            let verified = if outcome.is_ok() { "true" } else { "false" };
            inner
                .core
                .properties()
                .set(&purchase.item_id, keys::VERIFIED, verified);
            outcome.map(|_| ())
        });
    }

    fn answer_details(&self, product_ids: &[String], loaded: &Result<usize>) {
        let observer = self.core.observer();
        for product_id in product_ids {
            match loaded {
                Err(err) => observer.product_details_error(product_id, &err.to_string()),
                Ok(_) if self.core.product(product_id).is_some() => {
                    observer.product_details_received(product_id)
                }
                Ok(_) => observer.product_details_error(product_id, PRODUCT_NOT_FOUND),
            }
        }
    }
}

impl BillingProvider for SamsungBillingProvider {
    fn core(&self) -> &ProviderCore {
        &self.inner.core
    }

    fn initialize(&self) {
        if !self.inner.core.begin_initialize() {
            return;
        }
        self.inner.start_account_certification();
    }

    /// The service cannot report a purchasing-disabled state.
    fn can_make_purchase(&self) -> bool {
        self.inner.core.is_ready()
    }

    fn restore_purchases(&self) -> bool {
        if !self.inner.core.is_ready() {
            tracing::warn!("restore rejected: billing not initialized");
            return false;
        }
        self.inner.start_inbox();
        true
    }

    fn send_request(&self, purchase_id: i32, product_id: &str, _developer_payload: &str) -> bool {
        let core = &self.inner.core;
        if let Err(err) = core.begin_purchase(product_id) {
            tracing::warn!(purchase_id, product_id, "purchase rejected: {}", err);
            return false;
        }
        let request = iap_service::payment_request(
            &self.inner.config.package_name,
            &self.inner.config.item_group_id,
            product_id,
        );
        let op = SamsungOp::Payment {
            item_id: product_id.to_string(),
        };
        if let Err(err) = self.inner.launch(op, request) {
            core.resolve_purchase(None, PurchaseState::Cancelled);
            core.observer().report_error(&err);
        }
        true
    }

    /// No server-side consumption: the product only leaves the owned set.
    fn consume_purchase(&self, product_id: &str) -> bool {
        let core = &self.inner.core;
        if !core.is_ready() {
            return false;
        }
        if !core.owned().remove(product_id) {
            tracing::warn!(product_id, "consume rejected: product not owned");
            return false;
        }
        tracing::info!(product_id, "purchase consumed");
        true
    }

    fn request_product_details(&self, product_id: &str) -> bool {
        let core = &self.inner.core;
        if !core.is_ready() {
            return false;
        }
        let mut fetch = self.inner.catalog_fetch();
        if !fetch.waiting.iter().any(|waiting| waiting == product_id) {
            fetch.waiting.push(product_id.to_string());
        }
        self.inner.ensure_catalog_fetch(&mut fetch);
        true
    }

    fn on_activity_result(&self, request_code: i32, result_code: i32, data: Option<Bundle>) -> bool {
        match self.inner.pending.take(request_code) {
            Some(SamsungOp::AccountCertification) => {
                self.inner.on_account_result(result_code);
                true
            }
            Some(SamsungOp::Payment { item_id }) => {
                self.inner
                    .on_payment_result(&item_id, result_code, data.as_ref());
                true
            }
            None => false,
        }
    }
}

impl Drop for SamsungBillingProvider {
    fn drop(&mut self) {
        self.inner.core.tasks().cancel_all();
        let inner = Arc::clone(&self.inner);
        self.inner
            .core
            .tasks()
            .spawn_detached(async move { inner.client.dispose().await });
    }
}
