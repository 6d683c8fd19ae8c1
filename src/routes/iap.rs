use axum::{extract::State, Json};
use base64::{engine::general_purpose::STANDARD, Engine};
use time::OffsetDateTime;
use tracing::instrument;
use validator::Validate;

use crate::{
    app_state::AppState,
    error::{ApiError, Result},
    models::{
        common::ApiResponse,
        iap::{
            PurchaseValidationRequest, PurchaseVerifyData, PurchaseVerifyRequest, ReceiptLocation,
            SubscriptionValidationRequest, SubscriptionVerifyData, SubscriptionVerifyRequest,
            TransactionSummary,
        },
    },
};

fn decode_receipt(receipt: &str) -> Result<ReceiptLocation> {
    let bytes = STANDARD
        .decode(receipt.trim())
        .map_err(|e| ApiError::BadRequest(format!("Receipt is not valid base64: {}", e)))?;
    Ok(ReceiptLocation::Bytes(bytes))
}

/// POST /api/v1/receipts/purchase
#[instrument(skip(state, request))]
pub async fn verify_purchase(
    State(state): State<AppState>,
    Json(request): Json<PurchaseVerifyRequest>,
) -> Result<Json<ApiResponse<PurchaseVerifyData>>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let mut validation = PurchaseValidationRequest::new(&request.product_id)
        .with_receipt(decode_receipt(&request.receipt)?);
    validation.shared_secret = request.shared_secret;

    let response = state.iap_service.validate_purchase(validation).await?;

    let transaction = response
        .receipt
        .as_ref()
        .and_then(|receipt| {
            receipt
                .in_app
                .iter()
                .find(|entry| entry.product_id == request.product_id)
        })
        .map(TransactionSummary::from)
        .ok_or_else(|| ApiError::Internal(anyhow::anyhow!("Validated purchase has no entry")))?;

    Ok(Json(ApiResponse::ok(PurchaseVerifyData {
        status: response.status.code(),
        environment: response.environment.clone(),
        bundle_id: state.iap_service.validator().bundle_id().to_string(),
        transaction,
    })))
}

/// POST /api/v1/receipts/subscriptions
#[instrument(skip(state, request))]
pub async fn verify_subscriptions(
    State(state): State<AppState>,
    Json(request): Json<SubscriptionVerifyRequest>,
) -> Result<Json<ApiResponse<SubscriptionVerifyData>>> {
    request
        .validate()
        .map_err(|e| ApiError::BadRequest(format!("Validation error: {}", e)))?;

    let now = request.now.unwrap_or_else(OffsetDateTime::now_utc);
    let mut validation = SubscriptionValidationRequest::new(now)
        .exclude_old_transactions(request.exclude_old_transactions)
        .with_receipt(decode_receipt(&request.receipt)?);
    validation.shared_secret = request.shared_secret;

    let validated = state.iap_service.validate_subscription(validation).await?;

    let will_renew_to = validated
        .current()
        .and_then(|current| {
            validated
                .receipt_response
                .pending_renewal_for(&current.product_id)
        })
        .and_then(|pending| pending.auto_renew_product_id.clone());

    Ok(Json(ApiResponse::ok(SubscriptionVerifyData {
        status: validated.receipt_response.status.code(),
        environment: validated.receipt_response.environment.clone(),
        entitled: validated.is_entitled(),
        active_subscriptions: validated
            .valid_subscription_receipts
            .iter()
            .map(TransactionSummary::from)
            .collect(),
        will_renew_to,
    })))
}
