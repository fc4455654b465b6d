//! Integration tests for HTTP purchase verification.
//!
//! These use wiremock to stand in for the verification endpoint.

use iapkit_lib::config::VerifyConfig;
use iapkit_lib::verify::{HttpVerifier, VerificationRequest, Verifier, VERIFY_ATTEMPTS};
use iapkit_lib::BillingErrorCode;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn request_for(server: &MockServer) -> VerificationRequest {
    VerificationRequest {
        verify_url: format!("{}/verify?protocolVersion=2.0", server.uri()),
        purchase_id: "pur-42".into(),
        payment_id: "pay-42".into(),
    }
}

fn verifier() -> HttpVerifier {
    HttpVerifier::new(VerifyConfig {
        connect_timeout_secs: 2,
        read_timeout_secs: 2,
    })
    .unwrap()
}

#[tokio::test]
async fn test_verified_on_first_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/verify"))
        .and(query_param("purchaseID", "pur-42"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"{"itemId":"gems","paymentId":"pay-42","status":"true"}"#,
        ))
        .expect(1)
        .mount(&server)
        .await;

    let verdict = verifier()
        .verify_purchase_result(&request_for(&server))
        .await
        .unwrap();
    assert_eq!(verdict.item_id, "gems");
}

#[tokio::test]
async fn test_succeeds_on_third_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/verify"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/verify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"paymentId":"pay-42","status":"true"}"#),
        )
        .mount(&server)
        .await;

    let result = verifier().verify_purchase_result(&request_for(&server)).await;
    assert!(result.is_ok());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_gives_up_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .mount(&server)
        .await;

    let err = verifier()
        .verify_purchase_result(&request_for(&server))
        .await
        .unwrap_err();
    assert_eq!(err.code(), BillingErrorCode::VerificationFailed);

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
    assert_eq!(VERIFY_ATTEMPTS, 3);
}

#[tokio::test]
async fn test_mismatched_payment_is_rejected_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/verify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"paymentId":"someone-else","status":"true"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let err = verifier()
        .verify_purchase_result(&request_for(&server))
        .await
        .unwrap_err();
    assert_eq!(err.code(), BillingErrorCode::VerificationFailed);
}

#[tokio::test]
async fn test_status_false_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/verify"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(r#"{"paymentId":"pay-42","status":"false"}"#),
        )
        .mount(&server)
        .await;

    let err = verifier()
        .verify_purchase_result(&request_for(&server))
        .await
        .unwrap_err();
    assert_eq!(err.code(), BillingErrorCode::VerificationFailed);
}
