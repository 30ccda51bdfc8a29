use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::{BookId, FineId, NotificationId, NotificationTransitionError, UserId};

/// 通知の種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    Email,
    Sms,
}

impl NotificationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::Email => "EMAIL",
            NotificationType::Sms => "SMS",
        }
    }
}

impl std::str::FromStr for NotificationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMAIL" => Ok(NotificationType::Email),
            "SMS" => Ok(NotificationType::Sms),
            _ => Err(format!("Invalid notification type: {}", s)),
        }
    }
}

/// 通知のステータス
///
/// PENDING → {SENT, FAILED, CANCELLED}。FAILEDは再試行でPENDINGに戻る。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Failed,
    Cancelled,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "PENDING",
            NotificationStatus::Sent => "SENT",
            NotificationStatus::Failed => "FAILED",
            NotificationStatus::Cancelled => "CANCELLED",
        }
    }
}

impl std::fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NotificationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(NotificationStatus::Pending),
            "SENT" => Ok(NotificationStatus::Sent),
            "FAILED" => Ok(NotificationStatus::Failed),
            "CANCELLED" => Ok(NotificationStatus::Cancelled),
            _ => Err(format!("Invalid notification status: {}", s)),
        }
    }
}

/// 既知の通知テンプレート
///
/// 通知自体はテンプレート名を文字列で保持するため、
/// ここにない名前でも作成・送信できる（汎用の件名と本文になる）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationTemplate {
    BookBorrowed,
    BookOverdue,
    BookReturned,
    BookLost,
    FinePayment,
    BorrowPaymentSuccess,
    FinePaymentSuccess,
}

impl NotificationTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTemplate::BookBorrowed => "BOOK_BORROWED",
            NotificationTemplate::BookOverdue => "BOOK_OVERDUE",
            NotificationTemplate::BookReturned => "BOOK_RETURNED",
            NotificationTemplate::BookLost => "BOOK_LOST",
            NotificationTemplate::FinePayment => "FINE_PAYMENT",
            NotificationTemplate::BorrowPaymentSuccess => "BORROW_PAYMENT_SUCCESS",
            NotificationTemplate::FinePaymentSuccess => "FINE_PAYMENT_SUCCESS",
        }
    }

    /// テンプレート名から既知のテンプレートを探す
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            "BOOK_BORROWED" => Some(NotificationTemplate::BookBorrowed),
            "BOOK_OVERDUE" => Some(NotificationTemplate::BookOverdue),
            "BOOK_RETURNED" => Some(NotificationTemplate::BookReturned),
            "BOOK_LOST" => Some(NotificationTemplate::BookLost),
            "FINE_PAYMENT" => Some(NotificationTemplate::FinePayment),
            "BORROW_PAYMENT_SUCCESS" => Some(NotificationTemplate::BorrowPaymentSuccess),
            "FINE_PAYMENT_SUCCESS" => Some(NotificationTemplate::FinePaymentSuccess),
            _ => None,
        }
    }

    fn subject(&self) -> &'static str {
        match self {
            NotificationTemplate::BookBorrowed => "Book Borrowed Successfully",
            NotificationTemplate::BookOverdue => "Book Overdue Notice",
            NotificationTemplate::BookReturned => "Book Returned Successfully",
            NotificationTemplate::BookLost => "Lost Book Report",
            NotificationTemplate::FinePayment => "Fine Payment Confirmation",
            NotificationTemplate::BorrowPaymentSuccess => "Borrow Payment Successful",
            NotificationTemplate::FinePaymentSuccess => "Fine Payment Successful",
        }
    }

    fn body(&self, details: &str) -> String {
        match self {
            NotificationTemplate::BookBorrowed => format!(
                "Dear User,\n\nYou have successfully borrowed a book.\n\nDetails: {}\n\nPlease return by the due date.",
                details
            ),
            NotificationTemplate::BookOverdue => format!(
                "Dear User,\n\nYour borrowed book is overdue.\n\nDetails: {}\n\nPlease return the book as soon as possible.",
                details
            ),
            NotificationTemplate::BookReturned => format!(
                "Dear User,\n\nYou have successfully returned a book.\n\nDetails: {}",
                details
            ),
            NotificationTemplate::BookLost => format!(
                "Dear User,\n\nA borrowed book has been reported lost and a replacement fine was issued.\n\nDetails: {}",
                details
            ),
            NotificationTemplate::FinePayment => format!(
                "Dear User,\n\nA fine payment has been recorded.\n\nDetails: {}",
                details
            ),
            NotificationTemplate::BorrowPaymentSuccess => format!(
                "Dear User,\n\nYour borrow payment has been processed successfully.\n\nDetails: {}\n\nThank you for using our library system.",
                details
            ),
            NotificationTemplate::FinePaymentSuccess => format!(
                "Dear User,\n\nYour fine payment has been processed successfully.\n\nDetails: {}\n\nYour account has been unlocked. Thank you for using our library system.",
                details
            ),
        }
    }
}

/// メールの件名を組み立てる
pub fn render_subject(template: &str) -> &'static str {
    NotificationTemplate::lookup(template)
        .map(|t| t.subject())
        .unwrap_or("Library Notification")
}

/// メールの本文を組み立てる
pub fn render_body(template: &str, payload: &Value) -> String {
    let details = payload.to_string();
    match NotificationTemplate::lookup(template) {
        Some(t) => t.body(&details),
        None => format!("Library notification: {}", details),
    }
}

/// 通知
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub notification_id: NotificationId,
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub template: String,
    pub payload: Value,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 作成前の通知内容
///
/// 各テンプレートの組み立てをまとめる。
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationDraft {
    pub user_id: UserId,
    pub notification_type: NotificationType,
    pub template: String,
    pub payload: Value,
}

impl NotificationDraft {
    fn new(
        user_id: UserId,
        notification_type: NotificationType,
        template: NotificationTemplate,
        payload: Value,
    ) -> Self {
        Self {
            user_id,
            notification_type,
            template: template.as_str().to_string(),
            payload,
        }
    }

    /// 書名はカタログで見つかった場合のみ。見つからなければ `bookTitle` は null になる。
    pub fn book_borrowed(
        user_id: UserId,
        book_id: BookId,
        book_title: Option<&str>,
        due_date: DateTime<Utc>,
    ) -> Self {
        Self::new(
            user_id,
            NotificationType::Email,
            NotificationTemplate::BookBorrowed,
            json!({ "bookId": book_id, "bookTitle": book_title, "dueDate": due_date }),
        )
    }

    pub fn book_overdue(
        user_id: UserId,
        book_id: BookId,
        book_title: Option<&str>,
        days_overdue: i64,
    ) -> Self {
        Self::new(
            user_id,
            NotificationType::Email,
            NotificationTemplate::BookOverdue,
            json!({ "bookId": book_id, "bookTitle": book_title, "daysOverdue": days_overdue }),
        )
    }

    pub fn book_returned(user_id: UserId, book_id: BookId, book_title: Option<&str>) -> Self {
        Self::new(
            user_id,
            NotificationType::Email,
            NotificationTemplate::BookReturned,
            json!({ "bookId": book_id, "bookTitle": book_title }),
        )
    }

    pub fn book_lost(
        user_id: UserId,
        book_id: BookId,
        book_title: Option<&str>,
        fine_amount: Decimal,
    ) -> Self {
        Self::new(
            user_id,
            NotificationType::Email,
            NotificationTemplate::BookLost,
            json!({ "bookId": book_id, "bookTitle": book_title, "fineAmount": fine_amount }),
        )
    }

    /// 罰金の支払い記録（SMS）
    pub fn fine_payment(user_id: UserId, fine_id: FineId, amount: Decimal) -> Self {
        Self::new(
            user_id,
            NotificationType::Sms,
            NotificationTemplate::FinePayment,
            json!({ "fineId": fine_id, "amount": amount }),
        )
    }

    pub fn borrow_payment_success(
        user_id: UserId,
        amount: &str,
        payment_method: &str,
        transaction_id: &str,
    ) -> Self {
        Self::new(
            user_id,
            NotificationType::Email,
            NotificationTemplate::BorrowPaymentSuccess,
            json!({
                "amount": amount,
                "paymentMethod": payment_method,
                "transactionId": transaction_id,
            }),
        )
    }

    pub fn fine_payment_success(
        user_id: UserId,
        amount: &str,
        payment_method: &str,
        transaction_id: &str,
    ) -> Self {
        Self::new(
            user_id,
            NotificationType::Email,
            NotificationTemplate::FinePaymentSuccess,
            json!({
                "amount": amount,
                "paymentMethod": payment_method,
                "transactionId": transaction_id,
            }),
        )
    }
}

/// 純粋関数：通知を作成する（常にPENDING）
pub fn create_notification(draft: NotificationDraft, created_at: DateTime<Utc>) -> Notification {
    Notification {
        notification_id: NotificationId::new(),
        user_id: draft.user_id,
        notification_type: draft.notification_type,
        template: draft.template,
        payload: draft.payload,
        status: NotificationStatus::Pending,
        created_at,
        updated_at: created_at,
    }
}

/// 純粋関数：配信結果を反映する
///
/// PENDINGのみ。成功ならSENT、失敗ならFAILED。
pub fn record_dispatch(
    notification: Notification,
    delivered: bool,
    at: DateTime<Utc>,
) -> Result<Notification, NotificationTransitionError> {
    if notification.status != NotificationStatus::Pending {
        return Err(NotificationTransitionError::NotPending(notification.status));
    }

    let status = if delivered {
        NotificationStatus::Sent
    } else {
        NotificationStatus::Failed
    };

    Ok(Notification {
        status,
        updated_at: at,
        ..notification
    })
}

/// 純粋関数：通知をキャンセルする（PENDINGのみ）
pub fn cancel_notification(
    notification: Notification,
    at: DateTime<Utc>,
) -> Result<Notification, NotificationTransitionError> {
    if notification.status != NotificationStatus::Pending {
        return Err(NotificationTransitionError::NotPending(notification.status));
    }

    Ok(Notification {
        status: NotificationStatus::Cancelled,
        updated_at: at,
        ..notification
    })
}
