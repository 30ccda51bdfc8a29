use crate::application::loan as service;
use crate::domain::{
    commands::{ReportLost, ReturnBook},
    value_objects::{BookId, LoanId, UserId},
};
use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use super::AppState;
use crate::api::{
    error::ApiError,
    extract::{ApiJson, ApiPath},
    types::{
        BorrowRequest, CountResponse, EnqueuedResponse, FineResponse, LoanClosedResponse,
        LoanResponse, LoanSummaryResponse,
    },
};

fn to_responses(loans: &[crate::domain::Loan]) -> Vec<LoanResponse> {
    loans.iter().map(LoanResponse::from).collect()
}

// ============================================================================
// Command handlers
// ============================================================================

/// POST /borrows - 書籍を貸し出す
///
/// 強制されるビジネスルール:
/// - 利用者と書籍が外部サービスに存在すること
/// - 同じ書籍を貸出中でないこと
/// - 貸出中の冊数が上限（5冊）未満であること
pub async fn borrow_book(
    State(state): State<Arc<AppState>>,
    ApiJson(req): ApiJson<BorrowRequest>,
) -> Result<(StatusCode, Json<LoanResponse>), ApiError> {
    let cmd = req.to_command(Utc::now()).map_err(ApiError::BadRequest)?;

    let loan = service::borrow_book(&state.loans, cmd).await?;

    Ok((StatusCode::CREATED, Json(LoanResponse::from(&loan))))
}

/// PUT /borrows/:id/return - 書籍を返却する
///
/// 延滞している場合は延滞罰金も返す。
pub async fn return_book(
    State(state): State<Arc<AppState>>,
    ApiPath(loan_id): ApiPath<Uuid>,
) -> Result<Json<LoanClosedResponse>, ApiError> {
    let cmd = ReturnBook {
        loan_id: LoanId::from_uuid(loan_id),
        returned_at: Utc::now(),
    };

    let (loan, fine) = service::return_book(&state.loans, cmd).await?;

    Ok(Json(LoanClosedResponse {
        loan: LoanResponse::from(&loan),
        fine: fine.as_ref().map(FineResponse::from),
    }))
}

/// PUT /borrows/:id/lost - 紛失を報告する
pub async fn report_lost(
    State(state): State<Arc<AppState>>,
    ApiPath(loan_id): ApiPath<Uuid>,
) -> Result<Json<LoanClosedResponse>, ApiError> {
    let cmd = ReportLost {
        loan_id: LoanId::from_uuid(loan_id),
        reported_at: Utc::now(),
    };

    let (loan, fine) = service::report_lost(&state.loans, cmd).await?;

    Ok(Json(LoanClosedResponse {
        loan: LoanResponse::from(&loan),
        fine: Some(FineResponse::from(&fine)),
    }))
}

/// DELETE /borrows/:id - 貸出を削除する（管理者操作）
pub async fn delete_loan(
    State(state): State<Arc<AppState>>,
    ApiPath(loan_id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    service::delete_loan(&state.loans, LoanId::from_uuid(loan_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /borrows/overdue-reminders - 延滞中の貸出に督促通知を登録する
pub async fn send_overdue_reminders(
    State(state): State<Arc<AppState>>,
) -> Result<Json<EnqueuedResponse>, ApiError> {
    let enqueued = service::send_overdue_reminders(&state.loans, Utc::now()).await?;
    Ok(Json(EnqueuedResponse { enqueued }))
}

// ============================================================================
// Query handlers
// ============================================================================

/// GET /borrows
pub async fn list_loans(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let loans = service::list_loans(&state.loans).await?;
    Ok(Json(to_responses(&loans)))
}

/// GET /borrows/:id
pub async fn get_loan(
    State(state): State<Arc<AppState>>,
    ApiPath(loan_id): ApiPath<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = service::get_loan(&state.loans, LoanId::from_uuid(loan_id)).await?;
    Ok(Json(LoanResponse::from(&loan)))
}

/// GET /borrows/book/:book_id
pub async fn loans_by_book(
    State(state): State<Arc<AppState>>,
    ApiPath(book_id): ApiPath<Uuid>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let loans = service::loans_by_book(&state.loans, BookId::from_uuid(book_id)).await?;
    Ok(Json(to_responses(&loans)))
}

/// GET /borrows/user/:user_id - 罰金と書名つきの貸出一覧
pub async fn loan_summaries_by_user(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Vec<LoanSummaryResponse>>, ApiError> {
    let summaries =
        service::user_loan_summaries(&state.loans, UserId::from_uuid(user_id), Utc::now())
            .await?;
    Ok(Json(
        summaries.into_iter().map(LoanSummaryResponse::from).collect(),
    ))
}

/// GET /borrows/user/:user_id/active
pub async fn active_loans_by_user(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let loans = service::active_loans_by_user(&state.loans, UserId::from_uuid(user_id)).await?;
    Ok(Json(to_responses(&loans)))
}

/// GET /borrows/user/:user_id/active/count
pub async fn active_loan_count(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = service::active_loan_count(&state.loans, UserId::from_uuid(user_id)).await?;
    Ok(Json(CountResponse { count }))
}
