use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    BookBorrowed, BookId, BookLost, BookReturned, BorrowBookError, Fine, FinePolicy, FineReason,
    LoanId, LoanInvariantError, LoanOverdue, ReportLostError, ReturnBookError, UserId,
    fine::issue_fine,
};

/// 貸出期間（日数）
pub const LOAN_PERIOD_DAYS: i64 = 14;

/// 利用者1人あたりの最大貸出冊数
pub const MAX_ACTIVE_LOANS: usize = 5;

/// 貸出ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LoanStatus {
    /// 貸出中
    Borrowed,
    /// 期限内に返却済み
    Returned,
    /// 期限超過で返却済み
    LateReturned,
    /// 紛失
    Lost,
}

impl LoanStatus {
    /// 文字列表現を取得する
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "BORROWED",
            LoanStatus::Returned => "RETURNED",
            LoanStatus::LateReturned => "LATE_RETURNED",
            LoanStatus::Lost => "LOST",
        }
    }

    pub fn is_borrowed(&self) -> bool {
        matches!(self, LoanStatus::Borrowed)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BORROWED" => Ok(LoanStatus::Borrowed),
            "RETURNED" => Ok(LoanStatus::Returned),
            "LATE_RETURNED" => Ok(LoanStatus::LateReturned),
            "LOST" => Ok(LoanStatus::Lost),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// 貸出の運用ポリシー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LendingPolicy {
    /// 返却期限を指定しない貸出の貸出期間（日数）
    pub loan_period_days: i64,
    pub fine: FinePolicy,
}

impl Default for LendingPolicy {
    fn default() -> Self {
        Self {
            loan_period_days: LOAN_PERIOD_DAYS,
            fine: FinePolicy::default(),
        }
    }
}

// ============================================================================
// 型安全な状態パターン
// ============================================================================

/// Loan集約の共通フィールド
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanCore {
    // 識別子
    pub loan_id: LoanId,

    // 他コンテキストへの参照（IDのみ）
    pub user_id: UserId,
    pub book_id: BookId,

    // 貸出管理の責務
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,

    // 監査情報
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 貸出中状態
///
/// returned_atを持たない（型で保証）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowedLoan {
    #[serde(flatten)]
    pub core: LoanCore,
}

impl std::ops::Deref for BorrowedLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// 終了状態（返却済み・延滞返却済み・紛失）
///
/// returned_atが必須（型で保証）。操作不可。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosedLoan {
    #[serde(flatten)]
    pub core: LoanCore,
    pub returned_at: DateTime<Utc>,
}

impl std::ops::Deref for ClosedLoan {
    type Target = LoanCore;

    fn deref(&self) -> &Self::Target {
        &self.core
    }
}

/// Loan集約
///
/// BORROWED → {RETURNED, LATE_RETURNED, LOST}。終了状態からの遷移はない。
/// 「returned_atが設定されている ⇔ BORROWEDではない」を型で表現する。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Loan {
    Borrowed(BorrowedLoan),
    Returned(ClosedLoan),
    LateReturned(ClosedLoan),
    Lost(ClosedLoan),
}

impl Loan {
    pub fn core(&self) -> &LoanCore {
        match self {
            Loan::Borrowed(l) => &l.core,
            Loan::Returned(l) | Loan::LateReturned(l) | Loan::Lost(l) => &l.core,
        }
    }

    pub fn loan_id(&self) -> LoanId {
        self.core().loan_id
    }

    pub fn status(&self) -> LoanStatus {
        match self {
            Loan::Borrowed(_) => LoanStatus::Borrowed,
            Loan::Returned(_) => LoanStatus::Returned,
            Loan::LateReturned(_) => LoanStatus::LateReturned,
            Loan::Lost(_) => LoanStatus::Lost,
        }
    }

    pub fn returned_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Loan::Borrowed(_) => None,
            Loan::Returned(l) | Loan::LateReturned(l) | Loan::Lost(l) => Some(l.returned_at),
        }
    }

    /// 永続化された行データから集約を復元する
    ///
    /// statusとreturned_atの組み合わせが不変条件に反する場合はエラー。
    pub fn from_parts(
        core: LoanCore,
        status: LoanStatus,
        returned_at: Option<DateTime<Utc>>,
    ) -> Result<Self, LoanInvariantError> {
        match (status, returned_at) {
            (LoanStatus::Borrowed, None) => Ok(Loan::Borrowed(BorrowedLoan { core })),
            (LoanStatus::Borrowed, Some(_)) => Err(LoanInvariantError::UnexpectedReturnDate),
            (status, None) => Err(LoanInvariantError::MissingReturnDate(status)),
            (LoanStatus::Returned, Some(returned_at)) => {
                Ok(Loan::Returned(ClosedLoan { core, returned_at }))
            }
            (LoanStatus::LateReturned, Some(returned_at)) => {
                Ok(Loan::LateReturned(ClosedLoan { core, returned_at }))
            }
            (LoanStatus::Lost, Some(returned_at)) => Ok(Loan::Lost(ClosedLoan { core, returned_at })),
        }
    }
}

/// 純粋関数：期限からの経過日数
///
/// 日時の差を日単位に切り捨てる（ゼロ方向）。期限前なら負の値。
pub fn days_past_due(due_date: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (at - due_date).num_days()
}

/// 純粋関数：書籍を貸し出す
///
/// ビジネスルール：
/// - 返却期限の指定がなければ貸出日時 + 貸出期間
/// - 返却期限は貸出日時より後であること
/// - 状態はBORROWED
///
/// 重複貸出・上限チェックは保存時の条件付き挿入で行う（アプリケーション層）。
pub fn borrow_book(
    user_id: UserId,
    book_id: BookId,
    borrowed_at: DateTime<Utc>,
    due_date: Option<DateTime<Utc>>,
    policy: &LendingPolicy,
) -> Result<(BorrowedLoan, BookBorrowed), BorrowBookError> {
    let due_date =
        due_date.unwrap_or_else(|| borrowed_at + Duration::days(policy.loan_period_days));

    if due_date <= borrowed_at {
        return Err(BorrowBookError::DueDateNotAfterBorrowDate);
    }

    let loan = BorrowedLoan {
        core: LoanCore {
            loan_id: LoanId::new(),
            user_id,
            book_id,
            borrowed_at,
            due_date,
            created_at: borrowed_at,
            updated_at: borrowed_at,
        },
    };

    let event = BookBorrowed {
        loan_id: loan.loan_id,
        user_id,
        book_id,
        borrowed_at,
        due_date,
    };

    Ok((loan, event))
}

/// 純粋関数：書籍を返却する
///
/// ビジネスルール：
/// - BORROWEDのみ返却可能
/// - 返却日時 > 返却期限 ならLATE_RETURNED、それ以外はRETURNED
/// - 延滞日数（切り捨て）が1日以上なら延滞罰金を発行する
///
/// 副作用なし。新しいLoan、イベント、発行された罰金を返す。
pub fn return_book(
    loan: Loan,
    returned_at: DateTime<Utc>,
    policy: &FinePolicy,
) -> Result<(Loan, BookReturned, Option<Fine>), ReturnBookError> {
    let borrowed = match loan {
        Loan::Borrowed(borrowed) => borrowed,
        other => return Err(ReturnBookError::NotBorrowed(other.status())),
    };

    let was_late = returned_at > borrowed.due_date;
    let days_late = days_past_due(borrowed.due_date, returned_at).max(0);

    let fine = if was_late {
        policy.late_fine_amount(days_late).map(|amount| {
            issue_fine(
                borrowed.loan_id,
                borrowed.user_id,
                amount,
                FineReason::Late,
                returned_at,
            )
        })
    } else {
        None
    };

    let event = BookReturned {
        loan_id: borrowed.loan_id,
        user_id: borrowed.user_id,
        book_id: borrowed.book_id,
        returned_at,
        was_late,
        days_late,
        fine_id: fine.as_ref().map(|f| f.fine_id),
    };

    let closed = ClosedLoan {
        core: LoanCore {
            updated_at: returned_at,
            ..borrowed.core
        },
        returned_at,
    };

    let loan = if was_late {
        Loan::LateReturned(closed)
    } else {
        Loan::Returned(closed)
    };

    Ok((loan, event, fine))
}

/// 純粋関数：紛失を報告する
///
/// ビジネスルール：
/// - BORROWEDのみ報告可能
/// - 状態はLOST、returned_atは報告日時
/// - 固定の弁償額で紛失罰金を必ず1件発行する
pub fn report_lost(
    loan: Loan,
    reported_at: DateTime<Utc>,
    policy: &FinePolicy,
) -> Result<(Loan, BookLost, Fine), ReportLostError> {
    let borrowed = match loan {
        Loan::Borrowed(borrowed) => borrowed,
        other => return Err(ReportLostError::NotBorrowed(other.status())),
    };

    let fine = issue_fine(
        borrowed.loan_id,
        borrowed.user_id,
        policy.lost_replacement,
        FineReason::Lost,
        reported_at,
    );

    let event = BookLost {
        loan_id: borrowed.loan_id,
        user_id: borrowed.user_id,
        book_id: borrowed.book_id,
        reported_at,
        fine_id: fine.fine_id,
        fine_amount: fine.amount,
    };

    let loan = Loan::Lost(ClosedLoan {
        core: LoanCore {
            updated_at: reported_at,
            ..borrowed.core
        },
        returned_at: reported_at,
    });

    Ok((loan, event, fine))
}

/// 純粋関数：いま返却した場合に発生する延滞罰金
///
/// 貸出中かつ延滞している場合のみ金額を返す。
pub fn accrued_fine(loan: &Loan, now: DateTime<Utc>, policy: &FinePolicy) -> Option<Decimal> {
    match loan {
        Loan::Borrowed(b) if now > b.due_date => {
            policy.late_fine_amount(days_past_due(b.due_date, now))
        }
        _ => None,
    }
}

/// 純粋関数：延滞リマインダーのイベントを生成する
///
/// 延滞していない場合は `None`。
pub fn detect_overdue(loan: &BorrowedLoan, now: DateTime<Utc>) -> Option<LoanOverdue> {
    if now <= loan.due_date {
        return None;
    }

    Some(LoanOverdue {
        loan_id: loan.loan_id,
        user_id: loan.user_id,
        book_id: loan.book_id,
        due_date: loan.due_date,
        days_overdue: days_past_due(loan.due_date, now),
        detected_at: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn borrowed_at_day_zero() -> (BorrowedLoan, DateTime<Utc>) {
        let borrowed_at = Utc::now();
        let (loan, _) = borrow_book(
            UserId::new(),
            BookId::new(),
            borrowed_at,
            None,
            &LendingPolicy::default(),
        )
        .unwrap();
        (loan, borrowed_at)
    }

    // borrow_book() のテスト
    #[test]
    fn test_borrow_book_defaults_to_fourteen_day_period() {
        let user_id = UserId::new();
        let book_id = BookId::new();
        let borrowed_at = Utc::now();

        let (loan, event) =
            borrow_book(user_id, book_id, borrowed_at, None, &LendingPolicy::default()).unwrap();

        assert_eq!(loan.due_date, borrowed_at + Duration::days(14));
        assert_eq!(loan.user_id, user_id);
        assert_eq!(loan.book_id, book_id);

        assert_eq!(event.loan_id, loan.loan_id);
        assert_eq!(event.due_date, loan.due_date);
    }

    #[test]
    fn test_borrow_book_uses_explicit_due_date() {
        let borrowed_at = Utc::now();
        let due_date = borrowed_at + Duration::days(3);

        let (loan, _) = borrow_book(
            UserId::new(),
            BookId::new(),
            borrowed_at,
            Some(due_date),
            &LendingPolicy::default(),
        )
        .unwrap();

        assert_eq!(loan.due_date, due_date);
    }

    #[test]
    fn test_borrow_book_rejects_due_date_before_borrow_date() {
        let borrowed_at = Utc::now();

        let result = borrow_book(
            UserId::new(),
            BookId::new(),
            borrowed_at,
            Some(borrowed_at - Duration::days(1)),
            &LendingPolicy::default(),
        );

        assert_eq!(
            result.unwrap_err(),
            BorrowBookError::DueDateNotAfterBorrowDate
        );
    }

    // return_book() のテスト
    #[test]
    fn test_return_on_time_has_no_fine() {
        let (loan, borrowed_at) = borrowed_at_day_zero();
        let returned_at = borrowed_at + Duration::days(7);

        let (loan, event, fine) =
            return_book(Loan::Borrowed(loan), returned_at, &FinePolicy::default()).unwrap();

        assert_eq!(loan.status(), LoanStatus::Returned);
        assert_eq!(loan.returned_at(), Some(returned_at));
        assert!(!event.was_late);
        assert!(fine.is_none());
    }

    #[test]
    fn test_return_exactly_at_due_date_is_not_late() {
        let (loan, _) = borrowed_at_day_zero();
        let due_date = loan.due_date;

        let (loan, _, fine) =
            return_book(Loan::Borrowed(loan), due_date, &FinePolicy::default()).unwrap();

        assert_eq!(loan.status(), LoanStatus::Returned);
        assert!(fine.is_none());
    }

    #[test]
    fn test_return_two_days_late_charges_two_days() {
        // 0日目に貸出、14日間、16日目に返却 → 2日延滞
        let (loan, borrowed_at) = borrowed_at_day_zero();
        let returned_at = borrowed_at + Duration::days(16);
        let policy = FinePolicy::default();

        let (loan, event, fine) = return_book(Loan::Borrowed(loan), returned_at, &policy).unwrap();

        assert_eq!(loan.status(), LoanStatus::LateReturned);
        assert_eq!(event.days_late, 2);
        let fine = fine.expect("late fine");
        assert_eq!(fine.amount, policy.daily_rate * Decimal::from(2));
        assert_eq!(fine.reason, FineReason::Late);
        assert!(!fine.paid);
        assert_eq!(event.fine_id, Some(fine.fine_id));
    }

    #[test]
    fn test_return_late_within_same_day_has_status_but_no_fine() {
        let (loan, _) = borrowed_at_day_zero();
        let returned_at = loan.due_date + Duration::hours(5);

        let (loan, event, fine) =
            return_book(Loan::Borrowed(loan), returned_at, &FinePolicy::default()).unwrap();

        assert_eq!(loan.status(), LoanStatus::LateReturned);
        assert!(event.was_late);
        assert_eq!(event.days_late, 0);
        assert!(fine.is_none());
    }

    #[test]
    fn test_return_partial_days_are_truncated() {
        let (loan, _) = borrowed_at_day_zero();
        let returned_at = loan.due_date + Duration::days(3) + Duration::hours(23);
        let policy = FinePolicy::default();

        let (_, _, fine) = return_book(Loan::Borrowed(loan), returned_at, &policy).unwrap();

        assert_eq!(fine.unwrap().amount, policy.daily_rate * Decimal::from(3));
    }

    #[test]
    fn test_return_fails_when_already_returned() {
        let (loan, borrowed_at) = borrowed_at_day_zero();
        let (returned, _, _) = return_book(
            Loan::Borrowed(loan),
            borrowed_at + Duration::days(1),
            &FinePolicy::default(),
        )
        .unwrap();

        let result = return_book(
            returned,
            borrowed_at + Duration::days(2),
            &FinePolicy::default(),
        );

        assert_eq!(
            result.unwrap_err(),
            ReturnBookError::NotBorrowed(LoanStatus::Returned)
        );
    }

    // report_lost() のテスト
    #[test]
    fn test_report_lost_creates_replacement_fine() {
        let (loan, borrowed_at) = borrowed_at_day_zero();
        let reported_at = borrowed_at + Duration::days(30);
        let policy = FinePolicy::default();

        let (loan, event, fine) = report_lost(Loan::Borrowed(loan), reported_at, &policy).unwrap();

        assert_eq!(loan.status(), LoanStatus::Lost);
        assert_eq!(loan.returned_at(), Some(reported_at));
        assert_eq!(fine.reason, FineReason::Lost);
        assert_eq!(fine.amount, policy.lost_replacement);
        assert_eq!(event.fine_id, fine.fine_id);
    }

    #[test]
    fn test_report_lost_fails_when_lost() {
        let (loan, borrowed_at) = borrowed_at_day_zero();
        let (lost, _, _) =
            report_lost(Loan::Borrowed(loan), borrowed_at, &FinePolicy::default()).unwrap();

        let result = report_lost(lost, borrowed_at, &FinePolicy::default());

        assert_eq!(
            result.unwrap_err(),
            ReportLostError::NotBorrowed(LoanStatus::Lost)
        );
    }

    // 不変条件のテスト
    #[test]
    fn test_from_parts_enforces_return_date_invariant() {
        let (loan, borrowed_at) = borrowed_at_day_zero();
        let core = loan.core.clone();

        assert!(Loan::from_parts(core.clone(), LoanStatus::Borrowed, None).is_ok());
        assert_eq!(
            Loan::from_parts(core.clone(), LoanStatus::Borrowed, Some(borrowed_at)).unwrap_err(),
            LoanInvariantError::UnexpectedReturnDate
        );
        assert_eq!(
            Loan::from_parts(core.clone(), LoanStatus::Lost, None).unwrap_err(),
            LoanInvariantError::MissingReturnDate(LoanStatus::Lost)
        );

        let restored =
            Loan::from_parts(core, LoanStatus::LateReturned, Some(borrowed_at)).unwrap();
        assert_eq!(restored.status(), LoanStatus::LateReturned);
        assert_eq!(restored.returned_at(), Some(borrowed_at));
    }

    #[test]
    fn test_status_and_return_date_agree_for_every_transition() {
        let policy = FinePolicy::default();
        let (a, t) = borrowed_at_day_zero();
        let (b, _) = borrowed_at_day_zero();
        let (c, _) = borrowed_at_day_zero();

        let loans = vec![
            Loan::Borrowed(a.clone()),
            return_book(Loan::Borrowed(a), t + Duration::days(1), &policy).unwrap().0,
            return_book(Loan::Borrowed(b), t + Duration::days(20), &policy).unwrap().0,
            report_lost(Loan::Borrowed(c), t + Duration::days(2), &policy).unwrap().0,
        ];

        for loan in loans {
            assert_eq!(loan.status().is_borrowed(), loan.returned_at().is_none());
        }
    }

    // 延滞判定のテスト
    #[test]
    fn test_accrued_fine_only_after_due_date() {
        let (loan, _) = borrowed_at_day_zero();
        let policy = FinePolicy::default();
        let loan = Loan::Borrowed(loan);
        let due_date = loan.core().due_date;

        assert_eq!(accrued_fine(&loan, due_date, &policy), None);

        let later = due_date + Duration::days(4);
        assert_eq!(
            accrued_fine(&loan, later, &policy),
            Some(policy.daily_rate * Decimal::from(4))
        );
    }

    #[test]
    fn test_detect_overdue_reports_days() {
        let (loan, _) = borrowed_at_day_zero();
        let now = loan.due_date + Duration::days(5) + Duration::hours(1);

        let event = detect_overdue(&loan, now).unwrap();
        assert_eq!(event.days_overdue, 5);
        assert_eq!(event.loan_id, loan.loan_id);

        assert!(detect_overdue(&loan, loan.due_date).is_none());
    }

    #[test]
    fn test_loan_status_parse() {
        assert_eq!("LATE_RETURNED".parse::<LoanStatus>().unwrap(), LoanStatus::LateReturned);
        assert!("late".parse::<LoanStatus>().is_err());
    }
}
