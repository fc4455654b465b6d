//! Error types for billing operations.
//!
//! Every vendor failure is folded into [`BillingError`], which carries a
//! stable [`BillingErrorCode`] for the host layer.

/// Error codes for FFI and host integration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum BillingErrorCode {
    /// Operation invoked before the provider reached the ready state
    NotInitialized = 1000,
    /// Vendor service missing, unsupported or unbindable
    VendorUnavailable = 2000,
    /// Product unknown, unregistered or not owned
    InvalidProduct = 3000,
    /// Another purchase is awaiting its vendor response
    PurchaseInProgress = 3001,
    /// Vendor returned an error status
    VendorRejected = 4000,
    /// Purchase verification failed or never answered
    VerificationFailed = 5000,
    /// Vendor service must be upgraded before use
    UpgradeRequired = 6000,
    /// Transport/IPC layer error
    Transport = 7000,
    /// Payload could not be decoded
    Serialization = 8000,
    /// Configuration rejected
    InvalidConfig = 8001,
    /// Internal/unexpected error
    Internal = 9999,
}

/// Comprehensive error type for billing operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BillingError {
    /// Provider has not finished initialization.
    #[error("billing provider is not initialized")]
    NotInitialized,

    /// Vendor service could not be reached or is unsupported.
    #[error("billing service unavailable: {0}")]
    VendorUnavailable(String),

    /// Product unknown to the provider or vendor.
    #[error("invalid product {product_id}: {reason}")]
    InvalidProduct {
        /// Product identifier
        product_id: String,
        /// Reason the product was rejected
        reason: String,
    },

    /// A purchase is already awaiting its vendor response.
    #[error("purchase of {product_id} is already in progress")]
    PurchaseInProgress {
        /// Product of the outstanding purchase
        product_id: String,
    },

    /// Vendor answered with an error status.
    #[error("vendor rejected request ({code}): {message}")]
    VendorRejected {
        /// Raw vendor status code
        code: i32,
        /// Vendor supplied message
        message: String,
    },

    /// Purchase could not be verified.
    #[error("purchase verification failed: {0}")]
    VerificationFailed(String),

    /// Vendor service requires an upgrade before it can be used.
    #[error("billing service upgrade required: {message}")]
    UpgradeRequired {
        /// Vendor supplied message
        message: String,
        /// Where the user can obtain the upgrade
        upgrade_url: Option<String>,
    },

    /// Transport/IPC layer error.
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Configuration could not be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Internal/unexpected error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BillingError {
    /// Get the error code for FFI/host integration.
    pub fn code(&self) -> BillingErrorCode {
        match self {
            Self::NotInitialized => BillingErrorCode::NotInitialized,
            Self::VendorUnavailable(_) => BillingErrorCode::VendorUnavailable,
            Self::InvalidProduct { .. } => BillingErrorCode::InvalidProduct,
            Self::PurchaseInProgress { .. } => BillingErrorCode::PurchaseInProgress,
            Self::VendorRejected { .. } => BillingErrorCode::VendorRejected,
            Self::VerificationFailed(_) => BillingErrorCode::VerificationFailed,
            Self::UpgradeRequired { .. } => BillingErrorCode::UpgradeRequired,
            Self::Transport(_) => BillingErrorCode::Transport,
            Self::Serialization(_) => BillingErrorCode::Serialization,
            Self::InvalidConfig(_) => BillingErrorCode::InvalidConfig,
            Self::Internal(_) => BillingErrorCode::Internal,
        }
    }

    /// Get the error message as an owned String (useful for FFI).
    pub fn message(&self) -> String {
        self.to_string()
    }

    /// Returns true if this error is potentially recoverable by retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::VendorUnavailable(_))
    }

    /// Upgrade location reported by the vendor, if any.
    pub fn upgrade_url(&self) -> Option<&str> {
        match self {
            Self::UpgradeRequired { upgrade_url, .. } => upgrade_url.as_deref(),
            _ => None,
        }
    }

    /// Create a transport error from any error type.
    pub fn transport<E: std::error::Error>(err: E) -> Self {
        Self::Transport(err.to_string())
    }

    /// Create an invalid product error.
    pub fn invalid_product(product_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidProduct {
            product_id: product_id.into(),
            reason: reason.into(),
        }
    }

    /// Create a vendor rejection error.
    pub fn rejected(code: i32, message: impl Into<String>) -> Self {
        Self::VendorRejected {
            code,
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for BillingError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for BillingError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
