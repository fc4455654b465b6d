//! Server-side purchase verification for IAP service payments.
//!
//! The service returns a `verifyUrl` with every payment. Appending the
//! purchase id and issuing a GET yields a JSON verdict; a payment is verified
//! when the verdict's status is `"true"` and its payment id matches.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::VerifyConfig;
use crate::errors::BillingError;
use crate::transport::iap_service::PurchaseInfo;
use crate::Result;

/// Requests made for one verification before it fails. Retries follow each
/// other with no backoff.
pub const VERIFY_ATTEMPTS: u32 = 3;

/// What is needed to verify one payment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VerificationRequest {
    pub verify_url: String,
    pub purchase_id: String,
    pub payment_id: String,
}

impl VerificationRequest {
    pub fn from_purchase(purchase: &PurchaseInfo) -> Self {
        Self {
            verify_url: purchase.verify_url.clone(),
            purchase_id: purchase.purchase_id.clone(),
            payment_id: purchase.payment_id.clone(),
        }
    }

    /// Full verification URL.
    pub fn url(&self) -> String {
        format!("{}&purchaseID={}", self.verify_url, self.purchase_id)
    }

    fn validate(&self) -> Result<()> {
        if self.verify_url.is_empty() || self.purchase_id.is_empty() || self.payment_id.is_empty() {
            return Err(BillingError::VerificationFailed(
                "purchase is missing verifyUrl, purchaseId or paymentId".into(),
            ));
        }
        Ok(())
    }
}

/// Verdict returned by the verification endpoint.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationResponse {
    #[serde(default)]
    pub item_id: String,
    #[serde(default)]
    pub item_name: String,
    #[serde(default)]
    pub purchase_date: String,
    #[serde(default)]
    pub payment_id: String,
    #[serde(default)]
    pub status: String,
}

impl VerificationResponse {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether this verdict confirms `request`.
    pub fn confirms(&self, request: &VerificationRequest) -> bool {
        self.status == "true" && self.payment_id == request.payment_id
    }
}

/// Verifies a completed payment.
#[async_trait]
pub trait Verifier: Send + Sync {
    async fn verify_purchase_result(&self, request: &VerificationRequest) -> Result<VerificationResponse>;
}

/// HTTP verifier with a fixed number of attempts and no backoff.
pub struct HttpVerifier {
    config: VerifyConfig,
    client: reqwest::Client,
}

impl HttpVerifier {
    pub fn new(config: VerifyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .read_timeout(Duration::from_secs(config.read_timeout_secs))
            .build()
            .map_err(|e| BillingError::Internal(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &VerifyConfig {
        &self.config
    }

    /// One GET. Non-success statuses and empty bodies count as failures.
    async fn fetch(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BillingError::Transport(format!("verification endpoint returned {}", status)));
        }
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(BillingError::Transport("empty verification response".into()));
        }
        Ok(body)
    }
}

#[async_trait]
impl Verifier for HttpVerifier {
    async fn verify_purchase_result(&self, request: &VerificationRequest) -> Result<VerificationResponse> {
        request.validate()?;
        let url = request.url();
        let attempts = VERIFY_ATTEMPTS;

        let mut last_error = None;
        let mut body = None;
        for attempt in 1..=attempts {
            match self.fetch(&url).await {
                Ok(text) => {
                    body = Some(text);
                    break;
                }
                Err(err) => {
                    tracing::warn!(attempt, attempts, "verification request failed: {}", err);
                    last_error = Some(err);
                }
            }
        }

        let Some(body) = body else {
            let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(BillingError::VerificationFailed(format!(
                "no response after {} attempts: {}",
                attempts, reason
            )));
        };

        let verdict = VerificationResponse::from_json(&body)
            .map_err(|e| BillingError::VerificationFailed(format!("unreadable verdict: {}", e)))?;
        if !verdict.confirms(request) {
            return Err(BillingError::VerificationFailed(format!(
                "payment {} not confirmed (status {:?})",
                request.payment_id, verdict.status
            )));
        }
        tracing::info!(payment_id = %request.payment_id, "purchase verified");
        Ok(verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BillingErrorCode;

    fn request() -> VerificationRequest {
        VerificationRequest {
            verify_url: "https://iap.example.com/verify?protocolVersion=2.0".into(),
            purchase_id: "pur-1".into(),
            payment_id: "pay-1".into(),
        }
    }

    #[test]
    fn url_appends_purchase_id() {
        assert_eq!(
            request().url(),
            "https://iap.example.com/verify?protocolVersion=2.0&purchaseID=pur-1"
        );
    }

    #[test]
    fn verdict_requires_status_and_matching_payment() {
        let ok = VerificationResponse::from_json(r#"{"status":"true","paymentId":"pay-1"}"#).unwrap();
        assert!(ok.confirms(&request()));

        let wrong_payment =
            VerificationResponse::from_json(r#"{"status":"true","paymentId":"pay-2"}"#).unwrap();
        assert!(!wrong_payment.confirms(&request()));

        let refused = VerificationResponse::from_json(r#"{"status":"false","paymentId":"pay-1"}"#).unwrap();
        assert!(!refused.confirms(&request()));
    }

    #[tokio::test]
    async fn incomplete_request_fails_without_network() {
        let verifier = HttpVerifier::new(VerifyConfig::default()).unwrap();
        let mut incomplete = request();
        incomplete.purchase_id.clear();
        let err = verifier.verify_purchase_result(&incomplete).await.unwrap_err();
        assert_eq!(err.code(), BillingErrorCode::VerificationFailed);
    }
}
