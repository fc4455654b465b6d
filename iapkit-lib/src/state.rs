//! Canonical purchase states and provider lifecycle states.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor-independent outcome of a purchase or restore.
///
/// The integer values are part of the host contract and never change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum PurchaseState {
    Purchased = 0,
    Cancelled = 1,
    ItemUnavailable = 2,
    AlreadyOwned = 3,
    Restored = 5,
}

impl PurchaseState {
    /// Integer code reported to the host.
    pub fn code(self) -> i32 {
        self as i32
    }

    /// Decode a host code. Unknown codes collapse to `Cancelled`.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Self::Purchased,
            2 => Self::ItemUnavailable,
            3 => Self::AlreadyOwned,
            5 => Self::Restored,
            _ => Self::Cancelled,
        }
    }

    /// Whether the state grants the product to the user.
    pub fn grants_ownership(self) -> bool {
        matches!(self, Self::Purchased | Self::Restored)
    }
}

impl From<PurchaseState> for i32 {
    fn from(state: PurchaseState) -> Self {
        state.code()
    }
}

/// Provider lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ProviderState {
    #[default]
    Uninitialized,
    Initializing,
    Ready,
}

/// Lifecycle of the single outstanding purchase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PurchasePhase {
    #[default]
    Idle,
    AwaitingVendorResponse,
    Resolved,
}

/// Billing backend a provider speaks to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Google,
    Samsung,
    Amazon,
}

impl Vendor {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Google => "google",
            Self::Samsung => "samsung",
            Self::Amazon => "amazon",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(PurchaseState::Purchased.code(), 0);
        assert_eq!(PurchaseState::Cancelled.code(), 1);
        assert_eq!(PurchaseState::ItemUnavailable.code(), 2);
        assert_eq!(PurchaseState::AlreadyOwned.code(), 3);
        assert_eq!(PurchaseState::Restored.code(), 5);
    }

    #[test]
    fn unknown_code_is_cancelled() {
        assert_eq!(PurchaseState::from_code(4), PurchaseState::Cancelled);
        assert_eq!(PurchaseState::from_code(-7), PurchaseState::Cancelled);
        assert_eq!(PurchaseState::from_code(5), PurchaseState::Restored);
    }

    #[test]
    fn vendor_serializes_lowercase() {
        let json = serde_json::to_string(&Vendor::Samsung).unwrap();
        assert_eq!(json, "\"samsung\"");
        assert_eq!(Vendor::Amazon.to_string(), "amazon");
    }
}
