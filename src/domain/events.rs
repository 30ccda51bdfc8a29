use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BookId, FineId, LoanId, UserId};

/// イベント：書籍が貸し出された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookBorrowed {
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
}

/// イベント：書籍が返却された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookReturned {
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub returned_at: DateTime<Utc>,
    pub was_late: bool,
    pub days_late: i64,
    /// 延滞罰金が発生した場合のみ
    pub fine_id: Option<FineId>,
}

/// イベント：書籍の紛失が報告された
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookLost {
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub reported_at: DateTime<Utc>,
    pub fine_id: FineId,
    pub fine_amount: Decimal,
}

/// イベント：貸出が延滞している（リマインダー用）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanOverdue {
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub due_date: DateTime<Utc>,
    pub days_overdue: i64,
    pub detected_at: DateTime<Utc>,
}

/// イベント：罰金が支払われた
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinePaid {
    pub fine_id: FineId,
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub paid_at: DateTime<Utc>,
}

/// ドメインイベント統合型
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DomainEvent {
    BookBorrowed(BookBorrowed),
    BookReturned(BookReturned),
    BookLost(BookLost),
    LoanOverdue(LoanOverdue),
    FinePaid(FinePaid),
}

impl DomainEvent {
    /// イベント種別名（ログ出力用）
    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::BookBorrowed(_) => "BookBorrowed",
            DomainEvent::BookReturned(_) => "BookReturned",
            DomainEvent::BookLost(_) => "BookLost",
            DomainEvent::LoanOverdue(_) => "LoanOverdue",
            DomainEvent::FinePaid(_) => "FinePaid",
        }
    }

    /// イベントの対象利用者
    pub fn user_id(&self) -> UserId {
        match self {
            DomainEvent::BookBorrowed(e) => e.user_id,
            DomainEvent::BookReturned(e) => e.user_id,
            DomainEvent::BookLost(e) => e.user_id,
            DomainEvent::LoanOverdue(e) => e.user_id,
            DomainEvent::FinePaid(e) => e.user_id,
        }
    }
}
