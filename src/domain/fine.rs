use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{FineId, FinePaid, LoanId, PayFineError, UserId};

/// 罰金の理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FineReason {
    /// 延滞返却
    Late,
    /// 紛失
    Lost,
    /// 破損
    Damage,
}

impl FineReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FineReason::Late => "LATE",
            FineReason::Lost => "LOST",
            FineReason::Damage => "DAMAGE",
        }
    }
}

impl std::str::FromStr for FineReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LATE" => Ok(FineReason::Late),
            "LOST" => Ok(FineReason::Lost),
            "DAMAGE" => Ok(FineReason::Damage),
            _ => Err(format!("Invalid fine reason: {}", s)),
        }
    }
}

/// 罰金 - 貸出に紐づく金銭的ペナルティ
///
/// 貸出がLATE_RETURNEDまたはLOSTに遷移したときに台帳が作成する。
/// 作成後に変化するのは `paid` のみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fine {
    pub fine_id: FineId,
    pub loan_id: LoanId,
    pub user_id: UserId,
    pub amount: Decimal,
    pub reason: FineReason,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

/// 罰金の算定ポリシー
///
/// 延滞罰金は「延滞日数 × 日額」の一本に統一している。
/// 紛失時は固定の弁償額。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinePolicy {
    /// 延滞1日あたりの罰金額
    pub daily_rate: Decimal,
    /// 紛失時の弁償額
    pub lost_replacement: Decimal,
}

impl FinePolicy {
    /// 延滞罰金額を計算する
    ///
    /// 延滞日数が0以下、または金額が0以下なら罰金なし（`None`）。
    pub fn late_fine_amount(&self, days_late: i64) -> Option<Decimal> {
        if days_late <= 0 {
            return None;
        }
        let amount = self.daily_rate * Decimal::from(days_late);
        (amount > Decimal::ZERO).then_some(amount)
    }
}

impl Default for FinePolicy {
    fn default() -> Self {
        Self {
            daily_rate: Decimal::from(10_000),
            lost_replacement: Decimal::from(200_000),
        }
    }
}

/// 純粋関数：罰金を発行する
pub fn issue_fine(
    loan_id: LoanId,
    user_id: UserId,
    amount: Decimal,
    reason: FineReason,
    issued_at: DateTime<Utc>,
) -> Fine {
    Fine {
        fine_id: FineId::new(),
        loan_id,
        user_id,
        amount,
        reason,
        paid: false,
        created_at: issued_at,
    }
}

/// 純粋関数：罰金を支払う
///
/// 支払い済みの罰金は再度支払えない。
pub fn pay_fine(fine: Fine, paid_at: DateTime<Utc>) -> Result<(Fine, FinePaid), PayFineError> {
    if fine.paid {
        return Err(PayFineError::AlreadyPaid);
    }

    let event = FinePaid {
        fine_id: fine.fine_id,
        loan_id: fine.loan_id,
        user_id: fine.user_id,
        amount: fine.amount,
        paid_at,
    };

    Ok((Fine { paid: true, ..fine }, event))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> FinePolicy {
        FinePolicy {
            daily_rate: Decimal::new(50, 2),
            lost_replacement: Decimal::from(20),
        }
    }

    #[test]
    fn test_late_fine_amount_is_days_times_rate() {
        assert_eq!(policy().late_fine_amount(3), Some(Decimal::new(150, 2)));
    }

    #[test]
    fn test_no_late_fine_when_not_late() {
        assert_eq!(policy().late_fine_amount(0), None);
        assert_eq!(policy().late_fine_amount(-2), None);
    }

    #[test]
    fn test_zero_daily_rate_issues_no_late_fine() {
        let policy = FinePolicy {
            daily_rate: Decimal::ZERO,
            ..policy()
        };
        assert_eq!(policy.late_fine_amount(4), None);
    }

    #[test]
    fn test_pay_fine_marks_paid() {
        let fine = issue_fine(
            LoanId::new(),
            UserId::new(),
            Decimal::from(20),
            FineReason::Lost,
            Utc::now(),
        );

        let (paid, event) = pay_fine(fine.clone(), Utc::now()).unwrap();

        assert!(paid.paid);
        assert_eq!(paid.fine_id, fine.fine_id);
        assert_eq!(event.amount, fine.amount);
    }

    #[test]
    fn test_pay_fine_rejects_second_payment() {
        let fine = issue_fine(
            LoanId::new(),
            UserId::new(),
            Decimal::from(20),
            FineReason::Lost,
            Utc::now(),
        );
        let (paid, _) = pay_fine(fine, Utc::now()).unwrap();

        let result = pay_fine(paid, Utc::now());
        assert_eq!(result.unwrap_err(), PayFineError::AlreadyPaid);
    }

    #[test]
    fn test_fine_reason_round_trips_through_str() {
        for reason in [FineReason::Late, FineReason::Lost, FineReason::Damage] {
            assert_eq!(reason.as_str().parse::<FineReason>().unwrap(), reason);
        }
        assert!("UNKNOWN".parse::<FineReason>().is_err());
    }
}
