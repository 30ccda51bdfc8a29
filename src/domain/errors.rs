use super::{LoanStatus, NotificationStatus, PaymentStatus};

/// 貸出のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BorrowBookError {
    /// 返却期限が貸出日時以前
    DueDateNotAfterBorrowDate,
}

/// 返却のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReturnBookError {
    /// 貸出中ではない（返却済み・紛失済み）
    NotBorrowed(LoanStatus),
}

/// 紛失報告のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportLostError {
    /// 貸出中ではない（返却済み・紛失済み）
    NotBorrowed(LoanStatus),
}

/// 罰金支払いのエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayFineError {
    /// 既に支払い済み
    AlreadyPaid,
}

/// 通知の状態遷移エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationTransitionError {
    /// 送信・キャンセルはPENDINGからのみ可能
    NotPending(NotificationStatus),
}

/// 支払いのエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// 金額が0以下
    NonPositiveAmount,
    /// 処理はPENDINGからのみ可能
    NotPending(PaymentStatus),
}

/// 永続化された貸出の不変条件違反
///
/// `returned_at` は status ≠ BORROWED のときに限り設定される。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoanInvariantError {
    #[error("borrowed loan must not have a return date")]
    UnexpectedReturnDate,
    #[error("closed loan ({0}) requires a return date")]
    MissingReturnDate(LoanStatus),
}
