//! FFI Integration Tests
//!
//! Drive `BillingProviderFFI` the way a Kotlin host would: callback
//! implementations stand in for the store SDKs and responses are fed back
//! through the exported methods.

use iapkit_lib::bundle::keys;
use iapkit_lib::test_utils::play_purchase_json;
use iapkit_lib::PurchaseState;
use iapkit_mobile::*;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ============================================================================
// Host Implementations
// ============================================================================

#[derive(Default)]
struct HostLog {
    states: Mutex<Vec<(String, i32)>>,
    errors: Mutex<Vec<(i32, String)>>,
    shows: AtomicU32,
}

impl HostLog {
    fn saw(&self, product_id: &str, state: PurchaseState) -> bool {
        self.states
            .lock()
            .unwrap()
            .iter()
            .any(|(id, code)| id == product_id && *code == state.code())
    }
}

struct Observer(Arc<HostLog>);

impl PurchaseObserverFFI for Observer {
    fn on_purchase_state_changed(&self, product_id: String, state: i32) {
        self.0.states.lock().unwrap().push((product_id, state));
    }

    fn on_product_details_received(&self, _product_id: String) {}

    fn on_product_details_error(&self, _product_id: String, _message: String) {}

    fn on_provider_error(&self, code: i32, message: String, _upgrade_url: Option<String>) {
        self.0.errors.lock().unwrap().push((code, message));
    }
}

struct Progress(Arc<HostLog>);

impl ProgressIndicatorFFI for Progress {
    fn show(&self) {
        self.0.shows.fetch_add(1, Ordering::SeqCst);
    }

    fn dismiss(&self) {}
}

/// Poll until `condition` holds or two seconds pass.
fn wait_for(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met in time");
        std::thread::sleep(Duration::from_millis(5));
    }
}

// ============================================================================
// Alternate Store
// ============================================================================

#[derive(Default)]
struct StoreCalls {
    registered: AtomicU32,
    next_id: AtomicU32,
    requests: Mutex<Vec<String>>,
}

impl StoreCalls {
    fn record(&self, request: String) -> String {
        self.requests.lock().unwrap().push(request);
        format!("req-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

struct Store(Arc<StoreCalls>);

impl PurchasingServiceFFI for Store {
    fn register_observer(&self) {
        self.0.registered.fetch_add(1, Ordering::SeqCst);
    }

    fn initiate_get_user_id_request(&self) -> String {
        self.0.record("user_id".into())
    }

    fn initiate_purchase_updates_request(&self, offset: Option<String>) -> String {
        self.0
            .record(format!("updates:{}", offset.unwrap_or_else(|| "start".into())))
    }

    fn initiate_purchase_request(&self, sku: String) -> String {
        self.0.record(format!("purchase:{}", sku))
    }

    fn initiate_item_data_request(&self, skus: Vec<String>) -> String {
        self.0.record(format!("items:{}", skus.join(",")))
    }
}

fn amazon_provider() -> (Arc<BillingProviderFFI>, Arc<StoreCalls>, Arc<HostLog>) {
    let calls = Arc::new(StoreCalls::default());
    let log = Arc::new(HostLog::default());
    let provider = BillingProviderFFI::new_amazon(
        r#"{"vendor":"amazon","amazon":{"request_user_id":false}}"#.into(),
        Box::new(Store(calls.clone())),
        Box::new(Observer(log.clone())),
        Box::new(Progress(log.clone())),
    )
    .unwrap();
    (provider, calls, log)
}

fn receipt(sku: &str, item_type: ItemTypeFFI) -> ReceiptFFI {
    ReceiptFFI {
        sku: sku.into(),
        item_type,
        purchase_token: format!("tok-{}", sku),
        subscription_period: None,
    }
}

#[test]
fn test_amazon_restore_and_purchase_through_events() {
    let (provider, calls, log) = amazon_provider();
    assert_eq!(provider.vendor(), VendorFFI::Amazon);
    assert!(!provider.deliver_purchasing_event(PurchasingEventFFI::SdkAvailable { sandbox: true }));

    provider.initialize();
    assert_eq!(provider.state(), ProviderStateFFI::Ready);
    assert_eq!(calls.registered.load(Ordering::SeqCst), 1);
    assert_eq!(*calls.requests.lock().unwrap(), vec!["updates:start".to_string()]);

    assert!(provider.deliver_purchasing_event(PurchasingEventFFI::SdkAvailable { sandbox: true }));
    assert!(provider.deliver_purchasing_event(PurchasingEventFFI::PurchaseUpdates {
        request_id: "req-1".into(),
        successful: true,
        receipts: vec![
            receipt("remove_ads", ItemTypeFFI::Entitled),
            receipt("coins", ItemTypeFFI::Consumable),
        ],
        revoked_skus: Vec::new(),
        offset: Some("o-2".into()),
        is_more: false,
    }));
    wait_for(|| log.saw("remove_ads", PurchaseState::Restored));
    assert_eq!(
        *log.states.lock().unwrap(),
        vec![("remove_ads".to_string(), 5)]
    );
    assert!(provider.is_sandbox());
    assert_eq!(provider.get_purchase_list(), r#"["remove_ads"]"#);
    assert_eq!(log.shows.load(Ordering::SeqCst), 1);

    assert!(provider.product_set_type("gems".into(), "consumable".into()));
    assert!(provider.send_request(1, "gems".into(), String::new()));
    assert_eq!(calls.requests.lock().unwrap()[1], "purchase:gems");
    assert!(provider.deliver_purchasing_event(PurchasingEventFFI::Purchase {
        request_id: "req-2".into(),
        status: PurchaseRequestStatusFFI::InvalidSku,
        receipt: None,
    }));
    wait_for(|| log.saw("gems", PurchaseState::ItemUnavailable));
    assert_eq!(log.states.lock().unwrap().last().unwrap().1, 2);
    assert!(!provider.consume_purchase("gems".into()));
}

#[test]
fn test_wrong_vendor_config_is_rejected() {
    let log = Arc::new(HostLog::default());
    let result = BillingProviderFFI::new_amazon(
        r#"{"vendor":"google"}"#.into(),
        Box::new(Store(Arc::new(StoreCalls::default()))),
        Box::new(Observer(log.clone())),
        Box::new(Progress(log)),
    );
    assert!(matches!(result, Err(IapMobileError::InvalidConfig { .. })));
}

// ============================================================================
// Play Billing
// ============================================================================

#[derive(Default)]
struct PlayCalls {
    launches: Mutex<Vec<PurchaseFlowRequestFFI>>,
}

struct Play(Arc<PlayCalls>);

impl PlayBillingClientFFI for Play {
    fn connect(&self) -> std::result::Result<(), IapMobileError> {
        Ok(())
    }

    fn is_billing_supported(&self, _item_type: String) -> std::result::Result<i32, IapMobileError> {
        Ok(0)
    }

    fn get_sku_details(&self, _item_type: String, _skus: Vec<String>) -> std::result::Result<SkuDetailsResultFFI, IapMobileError> {
        Ok(SkuDetailsResultFFI {
            response_code: 0,
            details_json: vec![
                r#"{"productId":"remove_ads","type":"inapp","price":"$0.99","title":"No ads","description":"Removes ads"}"#
                    .into(),
            ],
        })
    }

    fn get_purchases(&self, _item_type: String) -> std::result::Result<PurchasesResultFFI, IapMobileError> {
        Ok(PurchasesResultFFI {
            response_code: 0,
            purchases: Vec::new(),
        })
    }

    fn launch_purchase_flow(&self, request: PurchaseFlowRequestFFI) -> std::result::Result<i32, IapMobileError> {
        self.0.launches.lock().unwrap().push(request);
        Ok(0)
    }

    fn consume_purchase(&self, _purchase_token: String) -> std::result::Result<i32, IapMobileError> {
        Ok(0)
    }
}

#[test]
fn test_google_purchase_round_trip_through_activity_result() {
    let calls = Arc::new(PlayCalls::default());
    let log = Arc::new(HostLog::default());
    let provider = BillingProviderFFI::new_google(
        r#"{"vendor":"google"}"#.into(),
        Box::new(Play(calls.clone())),
        Box::new(Observer(log.clone())),
        Box::new(Progress(log.clone())),
    )
    .unwrap();

    provider.initialize();
    wait_for(|| log.saw("", PurchaseState::Restored));
    assert!(provider.can_make_purchase());

    assert!(provider.product_set_type("remove_ads".into(), "non-consumable".into()));
    assert!(provider.send_request(7, "remove_ads".into(), "payload".into()));
    wait_for(|| !calls.launches.lock().unwrap().is_empty());
    let launch = calls.launches.lock().unwrap()[0].clone();
    assert_eq!(launch.sku, "remove_ads");
    assert_eq!(launch.developer_payload, "payload");

    let data = vec![
        BundleEntry {
            key: keys::RESPONSE_CODE.into(),
            value: BundleValueFFI::Int { value: 0 },
        },
        BundleEntry {
            key: keys::INAPP_PURCHASE_DATA.into(),
            value: BundleValueFFI::Str {
                value: play_purchase_json("remove_ads", "tok-1"),
            },
        },
        BundleEntry {
            key: keys::INAPP_DATA_SIGNATURE.into(),
            value: BundleValueFFI::Str { value: "sig==".into() },
        },
    ];
    assert!(provider.on_activity_result(launch.request_code, -1, Some(data)));
    assert!(!provider.on_activity_result(launch.request_code, -1, None));
    wait_for(|| log.saw("remove_ads", PurchaseState::Purchased));
    assert_eq!(
        provider.get_purchase_property("remove_ads".into(), "purchaseToken".into()),
        "tok-1"
    );

    assert!(provider.request_product_details("remove_ads".into()));
    wait_for(|| provider.receive_product_details("remove_ads".into()).contains("No ads"));
    assert!(!provider.deliver_purchasing_event(PurchasingEventFFI::SdkAvailable { sandbox: false }));
}
