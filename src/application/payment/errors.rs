use thiserror::Error;

/// 支払いアプリケーション層のエラー
#[derive(Debug, Error)]
pub enum PaymentApplicationError {
    /// 支払いが見つからない
    #[error("Payment not found")]
    PaymentNotFound,

    /// 支払いの状態が不正（例: PENDINGを期待したがSUCCESSだった）
    #[error("Invalid payment state: {0}")]
    InvalidPaymentState(String),

    /// 入力値が不正
    #[error("Validation failed: {0}")]
    Validation(String),

    /// PaymentRepositoryのエラー
    #[error("Payment repository error")]
    PaymentRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// PaymentLogStoreのエラー
    #[error("Payment log store error")]
    PaymentLogStoreError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T> = std::result::Result<T, PaymentApplicationError>;
