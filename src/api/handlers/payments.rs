use crate::application::payment as service;
use crate::domain::{
    commands::{FailPayment, ProcessCashPayment, ProcessVnpayPayment},
    value_objects::PaymentId,
};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::{
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    types::{
        CreatePaymentRequest, FailPaymentRequest, PaymentLogQuery, PaymentLogResponse,
        PaymentQuery, PaymentResponse, VnpayRequest,
    },
};

// ============================================================================
// Command handlers
// ============================================================================

/// POST /payments - 支払いを作成する（PENDING）
pub async fn create_payment(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreatePaymentRequest>,
) -> Result<(StatusCode, Json<PaymentResponse>), ApiError> {
    let payment = service::create_payment(&state.payments, req.to_command(Utc::now())).await?;
    Ok((StatusCode::CREATED, Json(payment.into())))
}

/// POST /payments/:id/vnpay - VNPAYの決済結果を反映する
///
/// 署名の検証は行わない。
pub async fn process_vnpay(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<VnpayRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let cmd = ProcessVnpayPayment {
        payment_id: PaymentId::from_uuid(id),
        payload: req.payload_text(),
        transaction_id: req.transaction_id,
        processed_at: Utc::now(),
    };

    let payment = service::process_vnpay(&state.payments, cmd).await?;
    Ok(Json(payment.into()))
}

/// POST /payments/:id/cash - 窓口での現金支払いを反映する
pub async fn process_cash(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let cmd = ProcessCashPayment {
        payment_id: PaymentId::from_uuid(id),
        processed_at: Utc::now(),
    };

    let payment = service::process_cash(&state.payments, cmd).await?;
    Ok(Json(payment.into()))
}

/// POST /payments/:id/fail - 支払いを失敗にする（状態を問わない）
pub async fn fail_payment(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(req): ApiJson<FailPaymentRequest>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let cmd = FailPayment {
        payment_id: PaymentId::from_uuid(id),
        reason: req.reason,
        failed_at: Utc::now(),
    };

    let payment = service::fail_payment(&state.payments, cmd).await?;
    Ok(Json(payment.into()))
}

// ============================================================================
// Query handlers
// ============================================================================

/// GET /payments?userId&status&referenceId
pub async fn find_payments(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PaymentQuery>,
) -> Result<Json<Vec<PaymentResponse>>, ApiError> {
    let payments = service::find_payments(&state.payments, query.into()).await?;
    Ok(Json(payments.into_iter().map(Into::into).collect()))
}

/// GET /payments/:id
pub async fn get_payment(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<PaymentResponse>, ApiError> {
    let payment = service::get_payment(&state.payments, PaymentId::from_uuid(id)).await?;
    Ok(Json(payment.into()))
}

/// GET /payments/:id/logs - 支払いのログを追記順に返す
pub async fn payment_logs(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<Vec<PaymentLogResponse>>, ApiError> {
    let logs = service::payment_logs(&state.payments, PaymentId::from_uuid(id)).await?;
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}

/// GET /payment-logs?gateway
pub async fn list_payment_logs(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<PaymentLogQuery>,
) -> Result<Json<Vec<PaymentLogResponse>>, ApiError> {
    let logs = match query.gateway {
        Some(gateway) => service::payment_logs_by_gateway(&state.payments, gateway).await?,
        None => service::all_payment_logs(&state.payments).await?,
    };
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}
