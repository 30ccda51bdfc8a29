use crate::application::notification as service;
use crate::domain::value_objects::{NotificationId, UserId};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::{
    error::ApiError,
    extract::{ApiJson, ApiPath, ApiQuery},
    types::{
        CreateNotificationRequest, NotificationQuery, NotificationResponse, PaymentSuccessQuery,
        RetriedResponse, SentResponse,
    },
};

/// POST /api/notifications - 通知を作成する（PENDING）
pub async fn create_notification(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<CreateNotificationRequest>,
) -> Result<(StatusCode, Json<NotificationResponse>), ApiError> {
    let draft = req.to_draft().map_err(ApiError::BadRequest)?;

    let notification = service::create_notification(&state.notifications, draft, Utc::now()).await?;

    Ok((StatusCode::CREATED, Json(notification.into())))
}

/// GET /api/notifications?userId&status&type
pub async fn find_notifications(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<NotificationQuery>,
) -> Result<Json<Vec<NotificationResponse>>, ApiError> {
    let notifications = service::find_notifications(&state.notifications, query.into()).await?;
    Ok(Json(notifications.into_iter().map(Into::into).collect()))
}

/// GET /api/notifications/:id
pub async fn get_notification(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification =
        service::get_notification(&state.notifications, NotificationId::from_uuid(id)).await?;
    Ok(Json(notification.into()))
}

/// POST /api/notifications/:id/send
///
/// 配信に失敗した場合もFAILEDの通知を200で返す。
pub async fn send_notification(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification =
        service::send_notification(&state.notifications, NotificationId::from_uuid(id), Utc::now())
            .await?;
    Ok(Json(notification.into()))
}

/// POST /api/notifications/:id/cancel
pub async fn cancel_notification(
    State(state): State<Arc<AppState>>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = service::cancel_notification(
        &state.notifications,
        NotificationId::from_uuid(id),
        Utc::now(),
    )
    .await?;
    Ok(Json(notification.into()))
}

/// POST /api/notifications/retry-failed
pub async fn retry_failed(
    State(state): State<Arc<AppState>>,
) -> Result<Json<RetriedResponse>, ApiError> {
    let retried = service::retry_failed(&state.notifications, Utc::now()).await?;
    Ok(Json(RetriedResponse { retried }))
}

/// POST /api/notifications/send-pending
pub async fn send_pending(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SentResponse>, ApiError> {
    let sent = service::send_pending(&state.notifications, Utc::now()).await?;
    Ok(Json(SentResponse { sent }))
}

/// POST /api/notifications/fine-payment-success/:user_id
pub async fn fine_payment_success(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PaymentSuccessQuery>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = service::notify_fine_payment_success(
        &state.notifications,
        UserId::from_uuid(user_id),
        query.into(),
        Utc::now(),
    )
    .await?;
    Ok(Json(notification.into()))
}

/// POST /api/notifications/borrow-payment-success/:user_id
pub async fn borrow_payment_success(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<PaymentSuccessQuery>,
) -> Result<Json<NotificationResponse>, ApiError> {
    let notification = service::notify_borrow_payment_success(
        &state.notifications,
        UserId::from_uuid(user_id),
        query.into(),
        Utc::now(),
    )
    .await?;
    Ok(Json(notification.into()))
}
