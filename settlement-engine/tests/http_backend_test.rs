mod common;

use common::{invoice, shop, TEST_ACCOUNT_ID, TEST_TAG_ID};
use rust_decimal_macros::dec;
use secrecy::Secret;
use serde_json::json;
use service_core::error::AppError;
use settlement_engine::config::BackendConfig;
use settlement_engine::error::SettlementError;
use settlement_engine::models::{PaymentMethod, ReasonCode};
use settlement_engine::services::backend::{
    HttpBackend, PunchDirection, SettlementBackend, SettlementSubmission,
};
use settlement_engine::services::evidence::{Photo, PhotoKind};
use settlement_engine::services::intent::{SettlementIntent, SettlementIntentBuilder};
use settlement_engine::services::session::FieldSession;
use settlement_engine::services::submitter::SettlementSubmitter;
use std::sync::Arc;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer, token: &str) -> HttpBackend {
    HttpBackend::new(BackendConfig {
        base_url: format!("{}/", server.uri()),
        api_token: Secret::new(token.to_string()),
        request_timeout_secs: 5,
        connect_timeout_secs: 2,
    })
    .unwrap()
}

/// Text-only bytes keep the multipart body valid UTF-8 for body matchers.
fn photo(kind: PhotoKind) -> Photo {
    Photo::jpeg(kind, format!("{}-bytes", kind.as_str()).into_bytes())
}

fn cheque_intent() -> SettlementIntent {
    SettlementIntentBuilder::new(PaymentMethod::Cheque, TEST_ACCOUNT_ID)
        .tag(TEST_TAG_ID)
        .invoices(vec![invoice("INV-1", dec!(750.00), dec!(750.00))])
        .collected_amount(dec!(500.00))
        .photo(photo(PhotoKind::Instrument))
        .photo(photo(PhotoKind::Receiving))
        .reason(ReasonCode::PaymentDisputed)
        .coordinates(shop())
        .build()
        .unwrap()
}

#[tokio::test]
async fn settlement_is_posted_as_multipart_with_bearer_token() {
    let server = MockServer::start().await;
    let intent = cheque_intent();
    Mock::given(method("POST"))
        .and(path("/settlements"))
        .and(header("authorization", "Bearer field-token"))
        .and(header("idempotency-key", intent.intent_id().to_string().as_str()))
        .and(body_string_contains("name=\"intent_id\""))
        .and(body_string_contains("name=\"lat\""))
        .and(body_string_contains("name=\"image1\""))
        .and(body_string_contains("\"vno\":\"INV-1\""))
        .and(body_string_contains("\"paymethod\":\"cheque\""))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"success": true, "message": "Saved"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let ack = backend(&server, "field-token")
        .submit_settlement(&SettlementSubmission::from_intent(&intent))
        .await
        .unwrap();

    assert!(ack.success);
    assert_eq!(ack.message.as_deref(), Some("Saved"));

    let requests = server.received_requests().await.unwrap();
    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains(&shop().lat_string()));
    assert!(body.contains("Payment disputed"));
    assert!(body.contains(&intent.intent_id().to_string()));
    assert!(!body.contains("name=\"image2\""));
}

#[tokio::test]
async fn empty_token_sends_no_authorization_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/attendance/punch"))
        .and(body_string_contains("name=\"status\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;

    backend(&server, "")
        .punch(PunchDirection::In, &photo(PhotoKind::Proof))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert!(!requests[0]
        .headers
        .iter()
        .any(|(name, _)| name.as_str().eq_ignore_ascii_case("authorization")));
}

#[tokio::test]
async fn rejection_body_on_error_status_is_a_validation_rejection() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/settlements"))
        .respond_with(
            ResponseTemplate::new(422)
                .set_body_json(json!({"success": false, "message": "Amount exceeds balance"})),
        )
        .mount(&server)
        .await;

    let http = Arc::new(backend(&server, "t"));
    let submitter = SettlementSubmitter::new(http);
    let intent = cheque_intent();
    let mut session = FieldSession::collection(
        TEST_ACCOUNT_ID,
        vec![invoice("INV-1", dec!(750.00), dec!(750.00))],
        None,
    )
    .unwrap();

    let err = submitter.submit(&intent, &mut session).await.unwrap_err();
    assert_eq!(
        err,
        SettlementError::ValidationRejected {
            message: "Amount exceeds balance".to_string()
        }
    );
}

#[tokio::test]
async fn malformed_success_body_is_a_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/settlements"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy login</html>"))
        .mount(&server)
        .await;

    let intent = cheque_intent();
    let err = backend(&server, "t")
        .submit_settlement(&SettlementSubmission::from_intent(&intent))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadGateway(_)));
    assert!(matches!(
        SettlementError::from(err),
        SettlementError::TransportFailure(_)
    ));
}

#[tokio::test]
async fn server_error_without_ack_is_unexpected() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/settlements"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .mount(&server)
        .await;

    let intent = cheque_intent();
    let err = backend(&server, "t")
        .submit_settlement(&SettlementSubmission::from_intent(&intent))
        .await
        .unwrap_err();

    assert!(matches!(
        SettlementError::from(err),
        SettlementError::Unexpected(_)
    ));
}

#[tokio::test]
async fn unreachable_backend_is_a_transport_failure() {
    let http = HttpBackend::new(BackendConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        api_token: Secret::new(String::new()),
        request_timeout_secs: 2,
        connect_timeout_secs: 1,
    })
    .unwrap();

    let err = http
        .fetch_invoices_for_account(TEST_ACCOUNT_ID)
        .await
        .unwrap_err();
    assert!(matches!(
        SettlementError::from(err),
        SettlementError::TransportFailure(_)
    ));
}

#[tokio::test]
async fn invoice_listing_is_converted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/tags/{}/invoices", TEST_TAG_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "vno": "INV-1",
                "acno": TEST_ACCOUNT_ID,
                "billno": "BL/0001",
                "billdate": "2026-10-02",
                "amount": "1200.00",
                "balance": "450.00",
                "days": 17
            },
            {
                "vno": "INV-2",
                "acno": TEST_ACCOUNT_ID,
                "billdate": "2026-10-05",
                "amount": 300,
                "balance": 0
            }
        ])))
        .mount(&server)
        .await;

    let invoices = backend(&server, "t")
        .fetch_invoices_for_tag(TEST_TAG_ID)
        .await
        .unwrap();

    assert_eq!(invoices.len(), 2);
    assert_eq!(invoices[0].outstanding_amount(), dec!(450.00));
    assert_eq!(invoices[0].age_in_days(), 17);
    assert_eq!(invoices[1].bill_no(), "");
    assert_eq!(invoices[1].outstanding_amount(), dec!(0));
}

#[tokio::test]
async fn inconsistent_invoice_record_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/accounts/{}/invoices", TEST_ACCOUNT_ID)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {
                "vno": "INV-1",
                "acno": TEST_ACCOUNT_ID,
                "billdate": "2026-10-02",
                "amount": "100.00",
                "balance": "250.00"
            }
        ])))
        .mount(&server)
        .await;

    let err = backend(&server, "t")
        .fetch_invoices_for_account(TEST_ACCOUNT_ID)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadGateway(_)));
}

#[tokio::test]
async fn otp_requests_are_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/approvals/otp/verify"))
        .and(body_string_contains("\"otp\":\"482913\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let ack = backend(&server, "t")
        .verify_otp(TEST_ACCOUNT_ID, "482913")
        .await
        .unwrap();
    assert!(ack.success);
}

#[tokio::test]
async fn reserved_characters_in_ids_are_path_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/accounts/ACC%2F12%2301/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tags/TAG%20A%3F1/invoices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let http = backend(&server, "t");
    let invoices = http.fetch_invoices_for_account("ACC/12#01").await.unwrap();
    assert!(invoices.is_empty());
    let invoices = http.fetch_invoices_for_tag("TAG A?1").await.unwrap();
    assert!(invoices.is_empty());
}
