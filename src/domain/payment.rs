use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{PaymentError, PaymentId, PaymentLogId, UserId};

/// 支払いの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    /// 貸出料
    Borrow,
    /// 罰金
    Fine,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Borrow => "BORROW",
            PaymentType::Fine => "FINE",
        }
    }
}

impl std::str::FromStr for PaymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BORROW" => Ok(PaymentType::Borrow),
            "FINE" => Ok(PaymentType::Fine),
            _ => Err(format!("Invalid payment type: {}", s)),
        }
    }
}

/// 支払い方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Vnpay,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Vnpay => "VNPAY",
            PaymentMethod::Cash => "CASH",
        }
    }

    /// この支払い方法を処理するゲートウェイ
    pub fn gateway(&self) -> Gateway {
        match self {
            PaymentMethod::Vnpay => Gateway::Vnpay,
            PaymentMethod::Cash => Gateway::Cash,
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VNPAY" => Ok(PaymentMethod::Vnpay),
            "CASH" => Ok(PaymentMethod::Cash),
            _ => Err(format!("Invalid payment method: {}", s)),
        }
    }
}

/// 支払いステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Success,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Success => "SUCCESS",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentStatus::Pending),
            "SUCCESS" => Ok(PaymentStatus::Success),
            "FAILED" => Ok(PaymentStatus::Failed),
            _ => Err(format!("Invalid payment status: {}", s)),
        }
    }
}

/// 決済ゲートウェイ（外部決済事業者または窓口現金）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Gateway {
    Vnpay,
    Cash,
}

impl Gateway {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gateway::Vnpay => "VNPAY",
            Gateway::Cash => "CASH",
        }
    }
}

impl std::str::FromStr for Gateway {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VNPAY" => Ok(Gateway::Vnpay),
            "CASH" => Ok(Gateway::Cash),
            _ => Err(format!("Invalid gateway: {}", s)),
        }
    }
}

/// 支払い
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub payment_type: PaymentType,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// 支払い対象（罰金IDなど）への参照
    pub reference_id: Option<uuid::Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 支払いログ（追記専用の監査証跡）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentLogEntry {
    pub log_id: PaymentLogId,
    pub payment_id: PaymentId,
    pub gateway: Gateway,
    pub transaction_id: Option<String>,
    pub payload: String,
    pub created_at: DateTime<Utc>,
}

impl PaymentLogEntry {
    fn new(
        payment_id: PaymentId,
        gateway: Gateway,
        transaction_id: Option<String>,
        payload: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            log_id: PaymentLogId::new(),
            payment_id,
            gateway,
            transaction_id,
            payload: payload.into(),
            created_at,
        }
    }
}

/// 純粋関数：支払いを作成する
///
/// ビジネスルール：
/// - 金額は正であること
/// - 状態はPENDING
/// - 作成ログを1件記録する
pub fn create_payment(
    user_id: UserId,
    amount: Decimal,
    payment_type: PaymentType,
    method: PaymentMethod,
    reference_id: Option<uuid::Uuid>,
    created_at: DateTime<Utc>,
) -> Result<(Payment, PaymentLogEntry), PaymentError> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::NonPositiveAmount);
    }

    let payment = Payment {
        payment_id: PaymentId::new(),
        user_id,
        amount,
        payment_type,
        method,
        status: PaymentStatus::Pending,
        reference_id,
        created_at,
        updated_at: created_at,
    };

    let log = PaymentLogEntry::new(
        payment.payment_id,
        method.gateway(),
        None,
        "Payment created",
        created_at,
    );

    Ok((payment, log))
}

fn ensure_pending(payment: &Payment) -> Result<(), PaymentError> {
    if payment.status != PaymentStatus::Pending {
        return Err(PaymentError::NotPending(payment.status));
    }
    Ok(())
}

/// 純粋関数：VNPAYでの支払い完了を記録する
///
/// 署名やコールバックの検証は行わない。呼ばれた時点で成功とする。
pub fn process_vnpay(
    payment: Payment,
    transaction_id: String,
    payload: String,
    processed_at: DateTime<Utc>,
) -> Result<(Payment, PaymentLogEntry), PaymentError> {
    ensure_pending(&payment)?;

    let log = PaymentLogEntry::new(
        payment.payment_id,
        Gateway::Vnpay,
        Some(transaction_id),
        payload,
        processed_at,
    );

    Ok((
        Payment {
            status: PaymentStatus::Success,
            updated_at: processed_at,
            ..payment
        },
        log,
    ))
}

/// 純粋関数：現金での支払い完了を記録する
///
/// 取引IDは `CASH-{支払いID}`。
pub fn process_cash(
    payment: Payment,
    processed_at: DateTime<Utc>,
) -> Result<(Payment, PaymentLogEntry), PaymentError> {
    ensure_pending(&payment)?;

    let log = PaymentLogEntry::new(
        payment.payment_id,
        Gateway::Cash,
        Some(format!("CASH-{}", payment.payment_id)),
        "Cash payment processed",
        processed_at,
    );

    Ok((
        Payment {
            status: PaymentStatus::Success,
            updated_at: processed_at,
            ..payment
        },
        log,
    ))
}

/// 純粋関数：支払いを失敗にする
///
/// 現在の状態に関係なくFAILEDにする。
pub fn fail_payment(
    payment: Payment,
    reason: &str,
    failed_at: DateTime<Utc>,
) -> (Payment, PaymentLogEntry) {
    let log = PaymentLogEntry::new(
        payment.payment_id,
        payment.method.gateway(),
        None,
        format!("Payment failed: {}", reason),
        failed_at,
    );

    (
        Payment {
            status: PaymentStatus::Failed,
            updated_at: failed_at,
            ..payment
        },
        log,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending(method: PaymentMethod) -> Payment {
        create_payment(
            UserId::new(),
            Decimal::from(30_000),
            PaymentType::Fine,
            method,
            None,
            Utc::now(),
        )
        .unwrap()
        .0
    }

    #[test]
    fn test_create_payment_logs_creation_for_method_gateway() {
        let (payment, log) = create_payment(
            UserId::new(),
            Decimal::from(30_000),
            PaymentType::Borrow,
            PaymentMethod::Vnpay,
            None,
            Utc::now(),
        )
        .unwrap();

        assert_eq!(payment.status, PaymentStatus::Pending);
        assert_eq!(log.payment_id, payment.payment_id);
        assert_eq!(log.gateway, Gateway::Vnpay);
        assert_eq!(log.transaction_id, None);
        assert_eq!(log.payload, "Payment created");
    }

    #[test]
    fn test_create_payment_rejects_non_positive_amount() {
        let result = create_payment(
            UserId::new(),
            Decimal::ZERO,
            PaymentType::Fine,
            PaymentMethod::Cash,
            None,
            Utc::now(),
        );
        assert_eq!(result.unwrap_err(), PaymentError::NonPositiveAmount);
    }

    #[test]
    fn test_process_vnpay_records_transaction() {
        let payment = pending(PaymentMethod::Vnpay);

        let (payment, log) = process_vnpay(
            payment,
            "TXN-1".to_string(),
            "{\"vnp_ResponseCode\":\"00\"}".to_string(),
            Utc::now(),
        )
        .unwrap();

        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(log.gateway, Gateway::Vnpay);
        assert_eq!(log.transaction_id.as_deref(), Some("TXN-1"));
    }

    #[test]
    fn test_process_cash_uses_cash_transaction_id() {
        let payment = pending(PaymentMethod::Cash);
        let payment_id = payment.payment_id;

        let (payment, log) = process_cash(payment, Utc::now()).unwrap();

        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(log.transaction_id, Some(format!("CASH-{}", payment_id)));
    }

    #[test]
    fn test_processing_requires_pending() {
        let (done, _) = process_cash(pending(PaymentMethod::Cash), Utc::now()).unwrap();

        let result = process_cash(done.clone(), Utc::now());
        assert_eq!(
            result.unwrap_err(),
            PaymentError::NotPending(PaymentStatus::Success)
        );

        let result = process_vnpay(done, "T".into(), String::new(), Utc::now());
        assert!(result.is_err());
    }

    #[test]
    fn test_fail_payment_from_any_status() {
        let (done, _) = process_cash(pending(PaymentMethod::Cash), Utc::now()).unwrap();

        let (failed, log) = fail_payment(done, "chargeback", Utc::now());

        assert_eq!(failed.status, PaymentStatus::Failed);
        assert_eq!(log.payload, "Payment failed: chargeback");
        assert_eq!(log.gateway, Gateway::Cash);
    }
}
