//! Scripted IAP service connector and verifier.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::fixtures::{inbox_item_json, item_info_json};
use crate::bundle::{self, Bundle};
use crate::errors::BillingError;
use crate::transport::iap_service::{status, IapConnector, IAP_SIGNATURE_HASHCODE};
use crate::verify::{VerificationRequest, VerificationResponse, Verifier};
use crate::Result;

struct IapState {
    installed: bool,
    signature: Option<i32>,
    init_status: (i32, String, Option<String>),
    item_list_status: i32,
    items: Vec<String>,
    inbox: Vec<String>,
    inbox_windows: Vec<(u32, u32)>,
    item_list_windows: Vec<(u32, u32)>,
}

/// In-memory [`IapConnector`].
///
/// Defaults to an installed, genuine service whose calls all succeed. Item
/// and inbox windows are served 1-based and inclusive, like the real service.
pub struct MockIapConnector {
    state: Mutex<IapState>,
    bind_calls: AtomicUsize,
    init_calls: AtomicUsize,
    unbind_calls: AtomicUsize,
}

impl Default for MockIapConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockIapConnector {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(IapState {
                installed: true,
                signature: Some(IAP_SIGNATURE_HASHCODE),
                init_status: (status::NONE, String::new(), None),
                item_list_status: status::NONE,
                items: Vec::new(),
                inbox: Vec::new(),
                inbox_windows: Vec::new(),
                item_list_windows: Vec::new(),
            }),
            bind_calls: AtomicUsize::new(0),
            init_calls: AtomicUsize::new(0),
            unbind_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_installed(&self, installed: bool) {
        self.state.lock().unwrap().installed = installed;
    }

    pub fn set_signature(&self, signature: Option<i32>) {
        self.state.lock().unwrap().signature = signature;
    }

    pub fn set_init_status(&self, code: i32, message: &str, upgrade_url: Option<&str>) {
        self.state.lock().unwrap().init_status =
            (code, message.to_string(), upgrade_url.map(str::to_string));
    }

    pub fn set_item_list_status(&self, code: i32) {
        self.state.lock().unwrap().item_list_status = code;
    }

    pub fn add_item(&self, item_id: &str, item_type: &str, price: &str) {
        self.state
            .lock()
            .unwrap()
            .items
            .push(item_info_json(item_id, item_type, price));
    }

    pub fn add_inbox_item(&self, item_id: &str, item_type: &str) {
        self.state
            .lock()
            .unwrap()
            .inbox
            .push(inbox_item_json(item_id, item_type));
    }

    /// Add an inbox entry verbatim.
    pub fn push_raw_inbox_entry(&self, entry: &str) {
        self.state.lock().unwrap().inbox.push(entry.to_string());
    }

    /// `(start, end)` of every inbox call, in order.
    pub fn inbox_windows(&self) -> Vec<(u32, u32)> {
        self.state.lock().unwrap().inbox_windows.clone()
    }

    /// `(start, end)` of every item-list call, in order.
    pub fn item_list_windows(&self) -> Vec<(u32, u32)> {
        self.state.lock().unwrap().item_list_windows.clone()
    }

    pub fn bind_calls(&self) -> usize {
        self.bind_calls.load(Ordering::SeqCst)
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn unbind_calls(&self) -> usize {
        self.unbind_calls.load(Ordering::SeqCst)
    }

    fn window(entries: &[String], start: u32, end: u32) -> Vec<String> {
        let from = (start.max(1) - 1) as usize;
        let to = (end as usize).min(entries.len());
        entries.get(from..to).map(<[String]>::to_vec).unwrap_or_default()
    }

    fn list_response(code: i32, entries: Vec<String>) -> Bundle {
        Bundle::new()
            .with_int(bundle::keys::STATUS_CODE, code)
            .with_string(bundle::keys::ERROR_STRING, "")
            .with_string_list(bundle::keys::RESULT_LIST, entries)
    }
}

#[async_trait]
impl IapConnector for MockIapConnector {
    fn is_package_installed(&self) -> bool {
        self.state.lock().unwrap().installed
    }

    fn package_signature_hash(&self) -> Option<i32> {
        self.state.lock().unwrap().signature
    }

    async fn bind(&self) -> Result<()> {
        self.bind_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn unbind(&self) {
        self.unbind_calls.fetch_add(1, Ordering::SeqCst);
    }

    async fn init(&self, _mode: i32) -> Result<Bundle> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        let (code, message, upgrade_url) = self.state.lock().unwrap().init_status.clone();
        let mut response = Bundle::new()
            .with_int(bundle::keys::STATUS_CODE, code)
            .with_string(bundle::keys::ERROR_STRING, message);
        if let Some(url) = upgrade_url {
            response.put_string(bundle::keys::IAP_UPGRADE_URL, url);
        }
        Ok(response)
    }

    async fn get_item_list(
        &self,
        _mode: i32,
        _package_name: &str,
        _item_group_id: &str,
        start: u32,
        end: u32,
        _item_type: &str,
    ) -> Result<Bundle> {
        let mut state = self.state.lock().unwrap();
        state.item_list_windows.push((start, end));
        Ok(Self::list_response(
            state.item_list_status,
            Self::window(&state.items, start, end),
        ))
    }

    async fn get_items_inbox(
        &self,
        _package_name: &str,
        _item_group_id: &str,
        start: u32,
        end: u32,
        _start_date: &str,
        _end_date: &str,
    ) -> Result<Bundle> {
        let mut state = self.state.lock().unwrap();
        state.inbox_windows.push((start, end));
        Ok(Self::list_response(status::NONE, Self::window(&state.inbox, start, end)))
    }
}

/// Verifier with a fixed verdict.
pub struct StaticVerifier {
    verdict: Result<VerificationResponse>,
    requests: Mutex<Vec<VerificationRequest>>,
}

impl StaticVerifier {
    /// Confirms every request.
    pub fn confirming() -> Self {
        Self {
            verdict: Ok(VerificationResponse {
                status: "true".into(),
                ..VerificationResponse::default()
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: BillingError) -> Self {
        Self {
            verdict: Err(error),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<VerificationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Verifier for StaticVerifier {
    async fn verify_purchase_result(&self, request: &VerificationRequest) -> Result<VerificationResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.verdict.clone().map(|verdict| VerificationResponse {
            payment_id: request.payment_id.clone(),
            ..verdict
        })
    }
}
