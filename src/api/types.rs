use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::application::{loan::LoanSummary, notification::PaymentSuccess};
use crate::domain::{
    Fine, Gateway, Loan, Notification, NotificationDraft, NotificationStatus, NotificationType,
    Payment, PaymentLogEntry, PaymentMethod, PaymentStatus, PaymentType, commands::*,
    value_objects::*,
};
use crate::ports::{NotificationFilter, PaymentFilter};

/// 日付文字列を解釈する
///
/// RFC 3339の日時を優先し、次に `YYYY-MM-DD` をUTCの0時として扱う。
pub fn parse_date_time(field: &str, value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|midnight| midnight.and_utc())
        .ok_or_else(|| format!("{} must be an RFC 3339 instant or YYYY-MM-DD: {}", field, value))
}

// ============================================================================
// Borrow ledger
// ============================================================================

/// 貸出リクエスト（POST /borrows）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub borrow_date: Option<String>,
    pub due_date: Option<String>,
}

impl BorrowRequest {
    /// コマンドに変換する（貸出日の省略時は `now`）
    pub fn to_command(&self, now: DateTime<Utc>) -> Result<BorrowBook, String> {
        let due_date = self
            .due_date
            .as_deref()
            .ok_or_else(|| "dueDate is required".to_string())?;

        let borrowed_at = match self.borrow_date.as_deref() {
            Some(value) => parse_date_time("borrowDate", value)?,
            None => now,
        };

        Ok(BorrowBook {
            user_id: UserId::from_uuid(self.user_id),
            book_id: BookId::from_uuid(self.book_id),
            borrowed_at,
            due_date: Some(parse_date_time("dueDate", due_date)?),
        })
    }
}

/// 貸出レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub borrow_date: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
    pub status: &'static str,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Loan> for LoanResponse {
    fn from(loan: &Loan) -> Self {
        let core = loan.core();
        Self {
            id: core.loan_id.value(),
            user_id: core.user_id.value(),
            book_id: core.book_id.value(),
            borrow_date: core.borrowed_at,
            due_date: core.due_date,
            return_date: loan.returned_at(),
            status: loan.status().as_str(),
            created_at: core.created_at,
            updated_at: core.updated_at,
        }
    }
}

/// 罰金レスポンス
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FineResponse {
    pub id: Uuid,
    pub loan_id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    pub reason: &'static str,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&Fine> for FineResponse {
    fn from(fine: &Fine) -> Self {
        Self {
            id: fine.fine_id.value(),
            loan_id: fine.loan_id.value(),
            user_id: fine.user_id.value(),
            amount: fine.amount,
            reason: fine.reason.as_str(),
            paid: fine.paid,
            created_at: fine.created_at,
        }
    }
}

/// 返却・紛失のレスポンス（貸出と発行された罰金）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanClosedResponse {
    #[serde(flatten)]
    pub loan: LoanResponse,
    pub fine: Option<FineResponse>,
}

/// 利用者の貸出一覧の1行（GET /borrows/user/:user_id）
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanSummaryResponse {
    #[serde(flatten)]
    pub loan: LoanResponse,
    pub book_title: Option<String>,
    /// found / missing / unavailable
    pub title_lookup: &'static str,
    pub fines: Vec<FineResponse>,
    pub fine_total: Decimal,
    pub accrued_fine: Option<Decimal>,
}

impl From<LoanSummary> for LoanSummaryResponse {
    fn from(summary: LoanSummary) -> Self {
        let title_lookup = summary.book_title.outcome();
        Self {
            loan: LoanResponse::from(&summary.loan),
            book_title: summary.book_title.found().flatten(),
            title_lookup,
            fines: summary.fines.iter().map(FineResponse::from).collect(),
            fine_total: summary.recorded_fine_total,
            accrued_fine: summary.accrued_fine,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CountResponse {
    pub count: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnpaidTotalResponse {
    pub user_id: Uuid,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct EnqueuedResponse {
    pub enqueued: usize,
}

// ============================================================================
// Notifications
// ============================================================================

/// 通知作成リクエスト（POST /api/notifications）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNotificationRequest {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub template: String,
    #[serde(default)]
    pub payload: Value,
}

impl CreateNotificationRequest {
    pub fn to_draft(self) -> Result<NotificationDraft, String> {
        if self.template.trim().is_empty() {
            return Err("template must not be empty".to_string());
        }
        Ok(NotificationDraft {
            user_id: UserId::from_uuid(self.user_id),
            notification_type: self.notification_type,
            template: self.template,
            payload: match self.payload {
                Value::Null => Value::Object(Default::default()),
                payload => payload,
            },
        })
    }
}

/// 通知一覧のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<NotificationStatus>,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
}

impl From<NotificationQuery> for NotificationFilter {
    fn from(query: NotificationQuery) -> Self {
        NotificationFilter {
            user_id: query.user_id.map(UserId::from_uuid),
            status: query.status,
            notification_type: query.notification_type,
        }
    }
}

/// 支払い完了通知のクエリパラメータ
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSuccessQuery {
    pub amount: String,
    pub payment_method: String,
    pub transaction_id: String,
}

impl From<PaymentSuccessQuery> for PaymentSuccess {
    fn from(query: PaymentSuccessQuery) -> Self {
        PaymentSuccess {
            amount: query.amount,
            payment_method: query.payment_method,
            transaction_id: query.transaction_id,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub template: String,
    pub payload: Value,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(notification: Notification) -> Self {
        Self {
            id: notification.notification_id.value(),
            user_id: notification.user_id.value(),
            notification_type: notification.notification_type,
            template: notification.template,
            payload: notification.payload,
            status: notification.status,
            created_at: notification.created_at,
            updated_at: notification.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RetriedResponse {
    pub retried: u64,
}

#[derive(Debug, Serialize)]
pub struct SentResponse {
    pub sent: usize,
}

// ============================================================================
// Payments
// ============================================================================

/// 支払い作成リクエスト（POST /payments）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    pub user_id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    pub reference_id: Option<Uuid>,
}

impl CreatePaymentRequest {
    pub fn to_command(&self, now: DateTime<Utc>) -> CreatePayment {
        CreatePayment {
            user_id: UserId::from_uuid(self.user_id),
            amount: self.amount,
            payment_type: self.payment_type,
            method: self.method,
            reference_id: self.reference_id,
            created_at: now,
        }
    }
}

/// VNPAY決済結果（POST /payments/:id/vnpay）
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VnpayRequest {
    pub transaction_id: String,
    /// ゲートウェイからの生データ（文字列でなければJSONのまま保存する）
    #[serde(default)]
    pub payload: Value,
}

impl VnpayRequest {
    pub fn payload_text(&self) -> String {
        match &self.payload {
            Value::Null => String::new(),
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct FailPaymentRequest {
    pub reason: String,
}

/// 支払い一覧のクエリパラメータ
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentQuery {
    pub user_id: Option<Uuid>,
    pub status: Option<PaymentStatus>,
    pub reference_id: Option<Uuid>,
}

impl From<PaymentQuery> for PaymentFilter {
    fn from(query: PaymentQuery) -> Self {
        PaymentFilter {
            user_id: query.user_id.map(UserId::from_uuid),
            status: query.status,
            reference_id: query.reference_id,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentLogQuery {
    pub gateway: Option<Gateway>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.payment_id.value(),
            user_id: payment.user_id.value(),
            amount: payment.amount,
            payment_type: payment.payment_type,
            method: payment.method,
            status: payment.status,
            reference_id: payment.reference_id,
            created_at: payment.created_at,
            updated_at: payment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentLogResponse {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub gateway: Gateway,
    pub transaction_id: Option<String>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl From<PaymentLogEntry> for PaymentLogResponse {
    fn from(entry: PaymentLogEntry) -> Self {
        Self {
            id: entry.log_id.value(),
            payment_id: entry.payment_id.value(),
            gateway: entry.gateway,
            transaction_id: entry.transaction_id,
            payload: entry.payload,
            created_at: entry.created_at,
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_date_time_accepts_rfc3339_with_offset() {
        let parsed = parse_date_time("dueDate", "2024-03-01T09:00:00+07:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 1, 2, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_time_treats_plain_date_as_midnight_utc() {
        let parsed = parse_date_time("dueDate", "2024-03-15").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_date_time_rejects_other_formats() {
        let err = parse_date_time("dueDate", "15/03/2024").unwrap_err();
        assert!(err.starts_with("dueDate must be"));
    }

    #[test]
    fn test_borrow_request_requires_due_date() {
        let req = BorrowRequest {
            user_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            borrow_date: None,
            due_date: None,
        };
        assert_eq!(req.to_command(Utc::now()).unwrap_err(), "dueDate is required");
    }

    #[test]
    fn test_borrow_request_defaults_borrow_date_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 3, 1, 8, 30, 0).unwrap();
        let req = BorrowRequest {
            user_id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            borrow_date: None,
            due_date: Some("2024-03-15".to_string()),
        };

        let cmd = req.to_command(now).unwrap();
        assert_eq!(cmd.borrowed_at, now);
        assert_eq!(
            cmd.due_date,
            Some(Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_vnpay_payload_keeps_strings_and_serializes_objects() {
        let text: VnpayRequest =
            serde_json::from_str(r#"{"transactionId":"T1","payload":"raw"}"#).unwrap();
        assert_eq!(text.payload_text(), "raw");

        let object: VnpayRequest = serde_json::from_str(
            r#"{"transactionId":"T1","payload":{"vnp_ResponseCode":"00"}}"#,
        )
        .unwrap();
        assert_eq!(object.payload_text(), r#"{"vnp_ResponseCode":"00"}"#);
    }
}
