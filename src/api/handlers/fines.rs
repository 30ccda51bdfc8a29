use crate::application::loan as service;
use crate::domain::{
    Fine,
    commands::PayFine,
    value_objects::{FineId, UserId},
};
use axum::{Json, extract::State};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::{
    error::ApiError,
    extract::ApiPath,
    types::{FineResponse, UnpaidTotalResponse},
};

fn to_responses(fines: &[Fine]) -> Vec<FineResponse> {
    fines.iter().map(FineResponse::from).collect()
}

/// PUT /fines/:id/pay - 罰金を支払い済みにする
pub async fn pay_fine(
    State(state): State<Arc<AppState>>,
    ApiPath(fine_id): ApiPath<Uuid>,
) -> Result<Json<FineResponse>, ApiError> {
    let cmd = PayFine {
        fine_id: FineId::from_uuid(fine_id),
        paid_at: Utc::now(),
    };

    let fine = service::pay_fine(&state.loans, cmd).await?;
    Ok(Json(FineResponse::from(&fine)))
}

/// GET /fines
pub async fn list_fines(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<FineResponse>>, ApiError> {
    let fines = service::list_fines(&state.loans).await?;
    Ok(Json(to_responses(&fines)))
}

/// GET /fines/user/:user_id
pub async fn fines_by_user(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Vec<FineResponse>>, ApiError> {
    let fines = service::fines_by_user(&state.loans, UserId::from_uuid(user_id)).await?;
    Ok(Json(to_responses(&fines)))
}

/// GET /fines/user/:user_id/unpaid
pub async fn unpaid_fines_by_user(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Vec<FineResponse>>, ApiError> {
    let fines = service::unpaid_fines_by_user(&state.loans, UserId::from_uuid(user_id)).await?;
    Ok(Json(to_responses(&fines)))
}

/// GET /fines/user/:user_id/unpaid/total
pub async fn unpaid_fine_total(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<UnpaidTotalResponse>, ApiError> {
    let total = service::unpaid_fine_total(&state.loans, UserId::from_uuid(user_id)).await?;
    Ok(Json(UnpaidTotalResponse { user_id, total }))
}
