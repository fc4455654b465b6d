//! Vendor status codes to [`PurchaseState`].
//!
//! Every function is total: codes without a dedicated mapping collapse to
//! [`PurchaseState::Cancelled`].

use crate::state::PurchaseState;
use crate::transport::iap_service::status;
use crate::transport::play::response;
use crate::transport::purchasing::PurchaseRequestStatus;

/// Play billing response code.
pub fn map_play_response(code: i32) -> PurchaseState {
    match code {
        response::OK => PurchaseState::Purchased,
        response::ITEM_UNAVAILABLE => PurchaseState::ItemUnavailable,
        response::ITEM_ALREADY_OWNED => PurchaseState::AlreadyOwned,
        _ => PurchaseState::Cancelled,
    }
}

/// IAP service `STATUS_CODE`.
pub fn map_samsung_status(code: i32) -> PurchaseState {
    match code {
        status::NONE => PurchaseState::Purchased,
        status::ALREADY_PURCHASED => PurchaseState::AlreadyOwned,
        status::PRODUCT_DOES_NOT_EXIST => PurchaseState::ItemUnavailable,
        _ => PurchaseState::Cancelled,
    }
}

/// Purchasing service request status.
pub fn map_amazon_status(status: PurchaseRequestStatus) -> PurchaseState {
    match status {
        PurchaseRequestStatus::Successful => PurchaseState::Purchased,
        PurchaseRequestStatus::Failed => PurchaseState::Cancelled,
        PurchaseRequestStatus::InvalidSku => PurchaseState::ItemUnavailable,
        PurchaseRequestStatus::AlreadyEntitled => PurchaseState::AlreadyOwned,
    }
}

/// Purchasing service request status by ordinal.
pub fn map_amazon_ordinal(ordinal: i32) -> PurchaseState {
    PurchaseRequestStatus::from_ordinal(ordinal)
        .map(map_amazon_status)
        .unwrap_or(PurchaseState::Cancelled)
}
