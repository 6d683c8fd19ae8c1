use crate::support::*;
use futures::StreamExt;
use receipt_validator::{
    models::{
        iap::{PurchaseValidationRequest, ReceiptLocation, SubscriptionValidationRequest},
        receipt::ReceiptResponse,
        status::ReceiptStatus,
    },
    ReceiptError,
};
use serde_json::json;
use time::{macros::datetime, Duration, OffsetDateTime};

const NOW: OffsetDateTime = datetime!(2024-05-01 12:00:00 UTC);

#[tokio::test]
async fn test_purchase_scenario_valid() {
    let body = receipt_response(0, "com.app", vec![in_app("p1", "1", None, None)]);
    let transport = ScriptedTransport::new(Reply::Json(body.clone()), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.app");

    let response = service
        .validate_purchase(PurchaseValidationRequest::new("p1"))
        .await
        .unwrap();

    let expected = ReceiptResponse::from_slice(&serde_json::to_vec(&body).unwrap()).unwrap();
    assert_eq!(response, expected);
    assert_eq!(transport.urls(), vec![PRODUCTION_URL]);
}

#[tokio::test]
async fn test_purchase_scenario_bundle_mismatch() {
    let body = receipt_response(0, "com.app", vec![in_app("p1", "1", None, None)]);
    let transport = ScriptedTransport::new(Reply::Json(body), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.other");

    let err = service
        .validate_purchase(PurchaseValidationRequest::new("p1"))
        .await
        .unwrap_err();

    assert!(matches!(err, ReceiptError::BundleIdNotMatching(ReceiptStatus::Valid)));
    assert_eq!(err.status().map(|s| s.code()), Some(0));
}

#[tokio::test]
async fn test_subscription_scenario_active_selection() {
    let mut body = receipt_response(0, "com.app", vec![]);
    body["latest_receipt_info"] = json!([
        in_app("sub", "expired", Some(NOW - Duration::seconds(10)), None),
        in_app("sub", "active", Some(NOW + Duration::seconds(10)), None),
        in_app("sub", "cancelled", Some(NOW + Duration::seconds(100)), Some(NOW)),
    ]);
    let transport = ScriptedTransport::new(Reply::Json(body), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.app");

    let validated = service
        .validate_subscription(SubscriptionValidationRequest::new(NOW))
        .await
        .unwrap();

    let ids: Vec<_> = validated
        .valid_subscription_receipts
        .iter()
        .map(|entry| entry.transaction_id.as_str())
        .collect();
    assert_eq!(ids, vec!["active"]);
    assert_eq!(
        validated.valid_subscription_receipts[0].expires_date,
        Some(NOW + Duration::seconds(10))
    );
}

#[tokio::test]
async fn test_ios6_expired_status_only_rejects_subscriptions() {
    let body = receipt_response(21006, "com.app", vec![in_app("p1", "1", None, None)]);
    let transport = ScriptedTransport::new(Reply::Json(body), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.app");

    let err = service
        .validate_subscription(SubscriptionValidationRequest::new(NOW))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReceiptError::SubscriptionExpired(ReceiptStatus::SubscriptionExpired)
    ));
    assert_eq!(err.status().map(|s| s.code()), Some(21006));

    let response = service
        .validate_purchase(PurchaseValidationRequest::new("p1"))
        .await
        .unwrap();
    assert_eq!(response.status, ReceiptStatus::SubscriptionExpired);
}

#[tokio::test]
async fn test_cancelled_purchase_is_rejected() {
    let body = receipt_response(
        0,
        "com.app",
        vec![in_app("p1", "1", Some(NOW + Duration::days(30)), Some(NOW))],
    );
    let transport = ScriptedTransport::new(Reply::Json(body), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.app");

    let err = service
        .validate_purchase(PurchaseValidationRequest::new("p1"))
        .await
        .unwrap_err();
    assert!(matches!(err, ReceiptError::PurchaseCancelled(ReceiptStatus::Valid)));

    let validated = service
        .validate_subscription(SubscriptionValidationRequest::new(NOW))
        .await
        .unwrap();
    assert!(validated.valid_subscription_receipts.is_empty());
}

#[tokio::test]
async fn test_rejected_status_is_invalid_status_code() {
    let transport = ScriptedTransport::new(Reply::Json(status_only(21004)), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.app");

    let err = service
        .validate_purchase(PurchaseValidationRequest::new("p1"))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ReceiptError::InvalidStatusCode(ReceiptStatus::SecretNotMatching)
    ));
}

#[tokio::test]
async fn test_no_receipt_on_device() {
    let transport = ScriptedTransport::new(Reply::Json(status_only(0)), Reply::HttpStatus(500));
    let source = FakeReceiptSource::empty();
    let service = service(source.clone(), &transport, "com.app");

    let err = service
        .validate_subscription(SubscriptionValidationRequest::new(NOW).refresh_if_needed(true))
        .await
        .unwrap_err();

    assert!(matches!(err, ReceiptError::NoReceiptFoundInBundle));
    assert_eq!(source.refresh_flags(), vec![true]);
    assert_eq!(transport.sessions_opened(), 0);
}

#[tokio::test]
async fn test_supplied_receipt_skips_source() {
    let body = receipt_response(0, "com.app", vec![in_app("p1", "1", None, None)]);
    let transport = ScriptedTransport::new(Reply::Json(body), Reply::HttpStatus(500));
    let source = FakeReceiptSource::empty();
    let service = service(source.clone(), &transport, "com.app");

    let request = PurchaseValidationRequest::new("p1")
        .with_receipt(ReceiptLocation::Bytes(b"uploaded".to_vec()));
    service.validate_purchase(request).await.unwrap();

    assert!(source.refresh_flags().is_empty());
    assert_eq!(transport.calls()[0].json()["receipt-data"], "dXBsb2FkZWQ=");
}

#[tokio::test]
async fn test_request_flags_reach_the_wire() {
    let transport = ScriptedTransport::new(
        Reply::Json(receipt_response(0, "com.app", vec![])),
        Reply::HttpStatus(500),
    );
    let source = FakeReceiptSource::with_receipt(RECEIPT);
    let service = service(source.clone(), &transport, "com.app")
        .with_shared_secret(Some("configured-secret".to_string()));

    service
        .validate_subscription(
            SubscriptionValidationRequest::new(NOW)
                .with_shared_secret("request-secret")
                .exclude_old_transactions(true),
        )
        .await
        .unwrap();
    service
        .validate_subscription(SubscriptionValidationRequest::new(NOW))
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls[0].json()["password"], "request-secret");
    assert_eq!(calls[0].json()["exclude-old-transactions"], true);
    assert_eq!(calls[1].json()["password"], "configured-secret");
    assert_eq!(calls[1].json()["exclude-old-transactions"], false);
    assert_eq!(source.refresh_flags(), vec![false, false]);
}

#[tokio::test]
async fn test_callback_form_runs_pipeline_once() {
    let body = receipt_response(0, "com.app", vec![in_app("p1", "1", None, None)]);
    let transport = ScriptedTransport::new(Reply::Json(body), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.app");

    let (tx, rx) = tokio::sync::oneshot::channel();
    service
        .validate_purchase_with(PurchaseValidationRequest::new("p1"), move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();

    assert!(rx.await.unwrap().is_ok());
    assert_eq!(transport.calls().len(), 1);

    let (tx, rx) = tokio::sync::oneshot::channel();
    service
        .validate_subscription_with(SubscriptionValidationRequest::new(NOW), move |result| {
            let _ = tx.send(result);
        })
        .await
        .unwrap();

    assert!(rx.await.unwrap().unwrap().valid_subscription_receipts.is_empty());
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn test_stream_form_yields_single_result() {
    let body = receipt_response(0, "com.app", vec![in_app("p1", "1", None, None)]);
    let transport = ScriptedTransport::new(Reply::Json(body), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.app");

    let stream = service.purchase_stream(PurchaseValidationRequest::new("p1"));
    // Lazy until polled
    assert_eq!(transport.calls().len(), 0);

    let results: Vec<_> = stream.collect().await;
    assert_eq!(results.len(), 1);
    assert!(results[0].is_ok());
    assert_eq!(transport.calls().len(), 1);

    let results: Vec<_> = service
        .subscription_stream(SubscriptionValidationRequest::new(NOW))
        .collect()
        .await;
    assert_eq!(results.len(), 1);
    assert_eq!(transport.calls().len(), 2);
}

#[tokio::test]
async fn test_concurrent_validations_are_independent() {
    let body = receipt_response(0, "com.app", vec![in_app("p1", "1", None, None)]);
    let transport = ScriptedTransport::new(Reply::Json(body), Reply::HttpStatus(500));
    let service = service(FakeReceiptSource::with_receipt(RECEIPT), &transport, "com.app");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .validate_purchase(PurchaseValidationRequest::new("p1"))
                    .await
            })
        })
        .collect();

    let results = futures::future::join_all(handles).await;
    assert!(results.into_iter().all(|r| r.unwrap().is_ok()));
    assert_eq!(transport.sessions_opened(), 8);
    assert_eq!(transport.live_sessions(), 0);
}
