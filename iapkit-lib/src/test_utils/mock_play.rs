//! Scripted Play billing client.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::assertions::wait_until;
use super::fixtures::play_purchase_json;
use crate::errors::BillingError;
use crate::transport::play::{
    response, OwnedPurchase, PlayBillingClient, PurchaseFlowRequest, PurchasesResult, SkuDetails,
    SkuDetailsResult,
};
use crate::Result;

#[derive(Default)]
struct PlayState {
    connect_error: Option<BillingError>,
    billing_supported: HashMap<String, i32>,
    purchases: HashMap<String, Vec<OwnedPurchase>>,
    purchases_response: i32,
    sku_details: Vec<SkuDetails>,
    launch_response: i32,
    launches: Vec<PurchaseFlowRequest>,
    consume_response: i32,
    consumed: Vec<String>,
}

/// In-memory [`PlayBillingClient`]. Every call succeeds unless scripted
/// otherwise.
#[derive(Default)]
pub struct MockPlayClient {
    state: Mutex<PlayState>,
    stalled_queries: AtomicUsize,
    launches_taken: AtomicUsize,
}

impl MockPlayClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_connect(&self, error: BillingError) {
        self.state.lock().unwrap().connect_error = Some(error);
    }

    pub fn set_billing_supported(&self, item_type: &str, code: i32) {
        self.state
            .lock()
            .unwrap()
            .billing_supported
            .insert(item_type.to_string(), code);
    }

    /// Add an owned purchase of `item_type`.
    pub fn add_purchase(&self, item_type: &str, product_id: &str, purchase_token: &str) {
        let owned = OwnedPurchase::parse(&play_purchase_json(product_id, purchase_token), "sig==")
            .unwrap();
        self.state
            .lock()
            .unwrap()
            .purchases
            .entry(item_type.to_string())
            .or_default()
            .push(owned);
    }

    pub fn set_purchases_response(&self, code: i32) {
        self.state.lock().unwrap().purchases_response = code;
    }

    pub fn add_sku_details(&self, details: SkuDetails) {
        self.state.lock().unwrap().sku_details.push(details);
    }

    pub fn set_launch_response(&self, code: i32) {
        self.state.lock().unwrap().launch_response = code;
    }

    pub fn launches(&self) -> Vec<PurchaseFlowRequest> {
        self.state.lock().unwrap().launches.clone()
    }

    /// The oldest purchase flow not yet returned by this method.
    pub async fn next_launch(&self) -> PurchaseFlowRequest {
        let index = self.launches_taken.fetch_add(1, Ordering::SeqCst);
        wait_until(|| self.state.lock().unwrap().launches.len() > index).await;
        self.state.lock().unwrap().launches[index].clone()
    }

    pub fn set_consume_response(&self, code: i32) {
        self.state.lock().unwrap().consume_response = code;
    }

    /// Purchase tokens passed to consume, in call order.
    pub fn consumed(&self) -> Vec<String> {
        self.state.lock().unwrap().consumed.clone()
    }

    pub async fn wait_for_consumes(&self, count: usize) {
        wait_until(|| self.state.lock().unwrap().consumed.len() >= count).await;
    }

    /// Make the next `count` purchase queries hang forever.
    pub fn stall_next_queries(&self, count: usize) {
        self.stalled_queries.store(count, Ordering::SeqCst);
    }

    /// Wait until every stalled query has been entered.
    pub async fn wait_for_stalled(&self) {
        wait_until(|| self.stalled_queries.load(Ordering::SeqCst) == 0).await;
    }
}

#[async_trait]
impl PlayBillingClient for MockPlayClient {
    async fn connect(&self) -> Result<()> {
        match self.state.lock().unwrap().connect_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn is_billing_supported(&self, item_type: &str) -> Result<i32> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .billing_supported
            .get(item_type)
            .copied()
            .unwrap_or(response::OK))
    }

    async fn get_sku_details(&self, _item_type: &str, skus: &[String]) -> Result<SkuDetailsResult> {
        let details = self
            .state
            .lock()
            .unwrap()
            .sku_details
            .iter()
            .filter(|details| skus.contains(&details.product_id))
            .cloned()
            .collect();
        Ok(SkuDetailsResult {
            response_code: response::OK,
            details,
        })
    }

    async fn get_purchases(&self, item_type: &str) -> Result<PurchasesResult> {
        let stall = self
            .stalled_queries
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if stall {
            std::future::pending::<()>().await;
        }
        let state = self.state.lock().unwrap();
        Ok(PurchasesResult {
            response_code: state.purchases_response,
            purchases: state.purchases.get(item_type).cloned().unwrap_or_default(),
        })
    }

    async fn launch_purchase_flow(&self, request: PurchaseFlowRequest) -> Result<i32> {
        let mut state = self.state.lock().unwrap();
        state.launches.push(request);
        Ok(state.launch_response)
    }

    async fn consume_purchase(&self, purchase_token: &str) -> Result<i32> {
        let mut state = self.state.lock().unwrap();
        state.consumed.push(purchase_token.to_string());
        Ok(state.consume_response)
    }
}
