use thiserror::Error;

/// 貸出台帳アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum LoanApplicationError {
    /// 利用者が存在しない
    #[error("User not found")]
    UserNotFound,

    /// 書籍が存在しない
    #[error("Book not found")]
    BookNotFound,

    /// アカウントサービスに問い合わせできない
    #[error("Account service unavailable: {0}")]
    AccountServiceUnavailable(String),

    /// カタログサービスに問い合わせできない
    #[error("Catalog service unavailable: {0}")]
    CatalogServiceUnavailable(String),

    /// 同じ書籍を既に貸出中
    #[error("User already has this book borrowed")]
    AlreadyBorrowed,

    /// 貸出上限（5冊）を超えている
    #[error("Loan limit exceeded (max 5 books)")]
    LoanLimitExceeded,

    /// 貸出が見つからない
    #[error("Loan not found")]
    LoanNotFound,

    /// 罰金が見つからない
    #[error("Fine not found")]
    FineNotFound,

    /// 貸出の状態が不正（例: BORROWEDを期待したがRETURNEDだった）
    #[error("Invalid loan state: {0}")]
    InvalidLoanState(String),

    /// 罰金は支払い済み
    #[error("Fine already paid")]
    FineAlreadyPaid,

    /// 入力値が不正
    #[error("Validation failed: {0}")]
    Validation(String),

    /// LoanRepositoryのエラー
    #[error("Loan repository error")]
    LoanRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// FineRepositoryのエラー
    #[error("Fine repository error")]
    FineRepositoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, LoanApplicationError>;
