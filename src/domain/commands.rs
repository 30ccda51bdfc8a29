use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BookId, FineId, LoanId, PaymentId, PaymentMethod, PaymentType, UserId};

/// コマンド：書籍を貸し出す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowBook {
    pub user_id: UserId,
    pub book_id: BookId,
    pub borrowed_at: DateTime<Utc>,
    /// 省略時は貸出期間から算出する
    pub due_date: Option<DateTime<Utc>>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnBook {
    pub loan_id: LoanId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：紛失を報告する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLost {
    pub loan_id: LoanId,
    pub reported_at: DateTime<Utc>,
}

/// コマンド：罰金を支払う
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayFine {
    pub fine_id: FineId,
    pub paid_at: DateTime<Utc>,
}

/// コマンド：支払いを作成する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePayment {
    pub user_id: UserId,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    pub reference_id: Option<uuid::Uuid>,
    pub created_at: DateTime<Utc>,
}

/// コマンド：VNPAYの決済結果を反映する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessVnpayPayment {
    pub payment_id: PaymentId,
    pub transaction_id: String,
    pub payload: String,
    pub processed_at: DateTime<Utc>,
}

/// コマンド：現金での支払いを反映する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessCashPayment {
    pub payment_id: PaymentId,
    pub processed_at: DateTime<Utc>,
}

/// コマンド：支払いを失敗にする
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailPayment {
    pub payment_id: PaymentId,
    pub reason: String,
    pub failed_at: DateTime<Utc>,
}
