use crate::application::{
    loan::LoanApplicationError, notification::NotificationApplicationError,
    payment::PaymentApplicationError,
};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::ErrorResponse;

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub enum ApiError {
    Loan(LoanApplicationError),
    Notification(NotificationApplicationError),
    Payment(PaymentApplicationError),
    /// リクエストの形式が不正（JSON・日付・パスパラメータなど）
    BadRequest(String),
}

impl From<LoanApplicationError> for ApiError {
    fn from(err: LoanApplicationError) -> Self {
        ApiError::Loan(err)
    }
}

impl From<NotificationApplicationError> for ApiError {
    fn from(err: NotificationApplicationError) -> Self {
        ApiError::Notification(err)
    }
}

impl From<PaymentApplicationError> for ApiError {
    fn from(err: PaymentApplicationError) -> Self {
        ApiError::Payment(err)
    }
}

type Mapped = (StatusCode, &'static str, String);

fn loan_error(err: LoanApplicationError) -> Mapped {
    match err {
        // 404 Not Found - リクエストされたリソースが存在しない
        LoanApplicationError::LoanNotFound => {
            (StatusCode::NOT_FOUND, "LOAN_NOT_FOUND", err.to_string())
        }
        LoanApplicationError::FineNotFound => {
            (StatusCode::NOT_FOUND, "FINE_NOT_FOUND", err.to_string())
        }
        LoanApplicationError::UserNotFound => {
            (StatusCode::NOT_FOUND, "USER_NOT_FOUND", err.to_string())
        }
        LoanApplicationError::BookNotFound => {
            (StatusCode::NOT_FOUND, "BOOK_NOT_FOUND", err.to_string())
        }

        // 409 Conflict - 現在の状態では実行できない
        LoanApplicationError::AlreadyBorrowed => {
            (StatusCode::CONFLICT, "ALREADY_BORROWED", err.to_string())
        }
        LoanApplicationError::LoanLimitExceeded => {
            (StatusCode::CONFLICT, "LOAN_LIMIT_EXCEEDED", err.to_string())
        }
        LoanApplicationError::InvalidLoanState(msg) => {
            (StatusCode::CONFLICT, "INVALID_LOAN_STATE", msg)
        }
        LoanApplicationError::FineAlreadyPaid => {
            (StatusCode::CONFLICT, "FINE_ALREADY_PAID", err.to_string())
        }

        // 400 Bad Request - 入力値の誤り
        LoanApplicationError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),

        // 503 Service Unavailable - 外部サービスに問い合わせできない
        LoanApplicationError::AccountServiceUnavailable(ref reason) => {
            tracing::warn!("Account service unavailable: {}", reason);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "ACCOUNT_SERVICE_UNAVAILABLE",
                "Account service unavailable".to_string(),
            )
        }
        LoanApplicationError::CatalogServiceUnavailable(ref reason) => {
            tracing::warn!("Catalog service unavailable: {}", reason);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                "CATALOG_SERVICE_UNAVAILABLE",
                "Catalog service unavailable".to_string(),
            )
        }

        // 500 Internal Server Error - システム障害
        // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
        LoanApplicationError::LoanRepositoryError(ref e) => {
            tracing::error!("Loan repository error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "LOAN_REPOSITORY_ERROR",
                "Failed to access loan storage".to_string(),
            )
        }
        LoanApplicationError::FineRepositoryError(ref e) => {
            tracing::error!("Fine repository error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "FINE_REPOSITORY_ERROR",
                "Failed to access fine storage".to_string(),
            )
        }
    }
}

fn notification_error(err: NotificationApplicationError) -> Mapped {
    match err {
        NotificationApplicationError::NotificationNotFound => (
            StatusCode::NOT_FOUND,
            "NOTIFICATION_NOT_FOUND",
            err.to_string(),
        ),
        NotificationApplicationError::InvalidNotificationState(msg) => {
            (StatusCode::CONFLICT, "INVALID_NOTIFICATION_STATE", msg)
        }
        NotificationApplicationError::NotificationRepositoryError(ref e) => {
            tracing::error!("Notification repository error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "NOTIFICATION_REPOSITORY_ERROR",
                "Failed to access notification storage".to_string(),
            )
        }
    }
}

fn payment_error(err: PaymentApplicationError) -> Mapped {
    match err {
        PaymentApplicationError::PaymentNotFound => {
            (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND", err.to_string())
        }
        PaymentApplicationError::InvalidPaymentState(msg) => {
            (StatusCode::CONFLICT, "INVALID_PAYMENT_STATE", msg)
        }
        PaymentApplicationError::Validation(msg) => {
            (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg)
        }
        PaymentApplicationError::PaymentRepositoryError(ref e) => {
            tracing::error!("Payment repository error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PAYMENT_REPOSITORY_ERROR",
                "Failed to access payment storage".to_string(),
            )
        }
        PaymentApplicationError::PaymentLogStoreError(ref e) => {
            tracing::error!("Payment log store error: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PAYMENT_LOG_STORE_ERROR",
                "Failed to access payment log".to_string(),
            )
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::Loan(err) => loan_error(err),
            ApiError::Notification(err) => notification_error(err),
            ApiError::Payment(err) => payment_error(err),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
        };

        let body = Json(ErrorResponse::new(error_type, message));
        (status, body).into_response()
    }
}
