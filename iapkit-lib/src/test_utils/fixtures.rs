//! Vendor payload builders.

use serde_json::json;

/// Purchase data as returned by the Play billing service.
pub fn play_purchase_json(product_id: &str, purchase_token: &str) -> String {
    json!({
        "orderId": format!("GPA.{}", purchase_token),
        "packageName": "com.example.app",
        "productId": product_id,
        "purchaseTime": 1_700_000_000_000_i64,
        "purchaseState": 0,
        "developerPayload": "",
        "purchaseToken": purchase_token,
    })
    .to_string()
}

/// Catalog entry as listed by the IAP service.
pub fn item_info_json(item_id: &str, item_type: &str, price: &str) -> String {
    json!({
        "mItemId": item_id,
        "mItemName": format!("{} name", item_id),
        "mItemPriceString": price,
        "mCurrencyUnit": "$",
        "mItemDesc": format!("{} description", item_id),
        "mItemImageUrl": "",
        "mItemDownloadUrl": "",
        "mType": item_type,
        "mSubscriptionDurationUnit": if item_type == "02" { "MONTH" } else { "" },
        "mSubscriptionDurationMultiplier": if item_type == "02" { 1 } else { 0 },
    })
    .to_string()
}

/// Purchase history entry as returned by the IAP service inbox.
pub fn inbox_item_json(item_id: &str, item_type: &str) -> String {
    json!({
        "mItemId": item_id,
        "mPaymentId": format!("pay-{}", item_id),
        "mPurchaseDate": 1_700_000_000_000_i64,
        "mType": item_type,
    })
    .to_string()
}

/// Payment outcome carried in `RESULT_OBJECT`.
pub fn iap_purchase_json(item_id: &str, payment_id: &str, purchase_id: &str, verify_url: &str) -> String {
    json!({
        "mItemId": item_id,
        "mPaymentId": payment_id,
        "mPurchaseId": purchase_id,
        "mPurchaseDate": "2024-01-01 10:00:00",
        "mVerifyUrl": verify_url,
    })
    .to_string()
}
