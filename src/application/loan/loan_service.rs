use crate::domain::{
    self, DomainEvent, Fine, LendingPolicy, Loan, commands::*, loan::MAX_ACTIVE_LOANS,
    value_objects::*,
};
use crate::ports::*;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;

use super::errors::{LoanApplicationError, Result};

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 振る舞い（メソッド）は持たず、純粋な関数に依存関係を渡す。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub loan_repository: Arc<dyn LoanRepository>,
    pub fine_repository: Arc<dyn FineRepository>,
    pub account_service: Arc<dyn AccountService>,
    pub catalog_service: Arc<dyn CatalogService>,
    pub loan_notifier: Arc<dyn LoanNotifier>,
    pub policy: LendingPolicy,
}

/// 利用者向けの貸出一覧の1行
#[derive(Debug, Clone, PartialEq)]
pub struct LoanSummary {
    pub loan: Loan,
    /// この貸出に発行された罰金
    pub fines: Vec<Fine>,
    /// 発行済み罰金の合計（支払い済みを含む）
    pub recorded_fine_total: Decimal,
    /// 貸出中かつ延滞している場合、いま返却したときに発生する罰金
    pub accrued_fine: Option<Decimal>,
    /// カタログでの書名の問い合わせ結果
    pub book_title: Lookup<Option<String>>,
}

/// リポジトリから貸出集約を読み込むヘルパー関数
///
/// return_book, report_lostで共通利用される。
///
/// # エラー
/// - LoanRepositoryError: 読み込み失敗（不変条件に反する行を含む）
/// - LoanNotFound: 貸出が存在しない
pub(super) async fn load_loan(
    loan_repository: &Arc<dyn LoanRepository>,
    loan_id: LoanId,
) -> Result<Loan> {
    loan_repository
        .get_by_id(loan_id)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?
        .ok_or(LoanApplicationError::LoanNotFound)
}

/// 台帳イベントを通知ポートへ渡す
///
/// 通知の失敗はログに残すだけで、呼び出し元の操作は成功させる。
pub(super) async fn publish(notifier: &Arc<dyn LoanNotifier>, event: DomainEvent) -> bool {
    match notifier.publish(&event).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(
                event_type = event.event_type(),
                user_id = %event.user_id(),
                error = %e,
                "Failed to enqueue loan notification"
            );
            false
        }
    }
}

/// 書籍を貸し出す
///
/// ビジネスルール：
/// - 利用者がアカウントサービスに存在すること
/// - 書籍がカタログに存在すること
/// - 同じ書籍を貸出中でないこと
/// - 利用者の貸出中の冊数が5冊未満であること
///
/// 最後の2つは `insert_if_allowed` が挿入と同時に判定する。
/// 外部サービスに問い合わせできない場合は、存在しない場合と区別してエラーにする。
///
/// # 戻り値
/// 作成された貸出
pub async fn borrow_book(deps: &ServiceDependencies, cmd: BorrowBook) -> Result<Loan> {
    // 1. 利用者の存在確認
    match deps.account_service.find_user(cmd.user_id).await {
        Lookup::Found(()) => {}
        Lookup::Missing => return Err(LoanApplicationError::UserNotFound),
        Lookup::Unavailable(reason) => {
            return Err(LoanApplicationError::AccountServiceUnavailable(reason));
        }
    }

    // 2. 書籍の存在確認
    match deps.catalog_service.get_book(cmd.book_id).await {
        Lookup::Found(_) => {}
        Lookup::Missing => return Err(LoanApplicationError::BookNotFound),
        Lookup::Unavailable(reason) => {
            return Err(LoanApplicationError::CatalogServiceUnavailable(reason));
        }
    }

    // 3. ドメイン層の純粋関数を呼び出し
    let (loan, event) = domain::loan::borrow_book(
        cmd.user_id,
        cmd.book_id,
        cmd.borrowed_at,
        cmd.due_date,
        &deps.policy,
    )
    .map_err(|e| match e {
        domain::BorrowBookError::DueDateNotAfterBorrowDate => {
            LoanApplicationError::Validation("dueDate must be after borrowDate".to_string())
        }
    })?;

    // 4. 条件付き挿入（重複・上限チェック込み）
    let slot = deps
        .loan_repository
        .insert_if_allowed(&loan, MAX_ACTIVE_LOANS)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;

    match slot {
        BorrowSlot::Inserted => {}
        BorrowSlot::AlreadyBorrowed => return Err(LoanApplicationError::AlreadyBorrowed),
        BorrowSlot::LimitReached => return Err(LoanApplicationError::LoanLimitExceeded),
    }

    tracing::info!(
        loan_id = %loan.loan_id,
        user_id = %loan.user_id,
        book_id = %loan.book_id,
        due_date = %loan.due_date,
        "Book borrowed"
    );

    // 5. 通知
    publish(&deps.loan_notifier, DomainEvent::BookBorrowed(event)).await;

    Ok(Loan::Borrowed(loan))
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 貸出がBORROWED状態であること
/// - 期限超過ならLATE_RETURNED、延滞日数が1日以上なら延滞罰金を発行する
///
/// 貸出の更新と罰金の作成は1回の保存で行う。
///
/// # 戻り値
/// 返却後の貸出と、発行された罰金
pub async fn return_book(
    deps: &ServiceDependencies,
    cmd: ReturnBook,
) -> Result<(Loan, Option<Fine>)> {
    // 1. 貸出を読み込む
    let loan = load_loan(&deps.loan_repository, cmd.loan_id).await?;

    // 2. ドメイン層の純粋関数を呼び出し
    let (loan, event, fine) = domain::loan::return_book(loan, cmd.returned_at, &deps.policy.fine)
        .map_err(|e| match e {
            domain::ReturnBookError::NotBorrowed(status) => LoanApplicationError::InvalidLoanState(
                format!("Cannot return loan in status {}", status),
            ),
        })?;

    // 3. BORROWEDのままの場合のみ保存
    close_loan(deps, &loan, fine.as_ref()).await?;

    tracing::info!(
        loan_id = %cmd.loan_id,
        status = %loan.status(),
        days_late = event.days_late,
        fine_id = ?event.fine_id,
        "Book returned"
    );

    // 4. 通知
    publish(&deps.loan_notifier, DomainEvent::BookReturned(event)).await;

    Ok((loan, fine))
}

/// 紛失を報告する
///
/// ビジネスルール：
/// - 貸出が存在すること
/// - 貸出がBORROWED状態であること
/// - 固定の弁償額で紛失罰金を必ず1件発行する
pub async fn report_lost(deps: &ServiceDependencies, cmd: ReportLost) -> Result<(Loan, Fine)> {
    let loan = load_loan(&deps.loan_repository, cmd.loan_id).await?;

    let (loan, event, fine) = domain::loan::report_lost(loan, cmd.reported_at, &deps.policy.fine)
        .map_err(|e| match e {
            domain::ReportLostError::NotBorrowed(status) => LoanApplicationError::InvalidLoanState(
                format!("Cannot report lost loan in status {}", status),
            ),
        })?;

    close_loan(deps, &loan, Some(&fine)).await?;

    tracing::info!(
        loan_id = %cmd.loan_id,
        fine_id = %fine.fine_id,
        amount = %fine.amount,
        "Book reported lost"
    );

    publish(&deps.loan_notifier, DomainEvent::BookLost(event)).await;

    Ok((loan, fine))
}

async fn close_loan(deps: &ServiceDependencies, loan: &Loan, fine: Option<&Fine>) -> Result<()> {
    let closed = deps
        .loan_repository
        .close(loan, fine)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;

    if !closed {
        // 読み込み後に別のリクエストが先に終了させた
        return Err(LoanApplicationError::InvalidLoanState(
            "Loan is no longer BORROWED".to_string(),
        ));
    }
    Ok(())
}

/// 貸出を削除する（管理者操作）
///
/// 関連する罰金も削除される。
pub async fn delete_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<()> {
    let deleted = deps
        .loan_repository
        .delete(loan_id)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)?;

    if !deleted {
        return Err(LoanApplicationError::LoanNotFound);
    }

    tracing::info!(loan_id = %loan_id, "Loan deleted");
    Ok(())
}

pub async fn get_loan(deps: &ServiceDependencies, loan_id: LoanId) -> Result<Loan> {
    load_loan(&deps.loan_repository, loan_id).await
}

pub async fn list_loans(deps: &ServiceDependencies) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_all()
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)
}

pub async fn loans_by_book(deps: &ServiceDependencies, book_id: BookId) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_by_book_id(book_id)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)
}

pub async fn loans_by_user(deps: &ServiceDependencies, user_id: UserId) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_by_user_id(user_id)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)
}

pub async fn active_loans_by_user(
    deps: &ServiceDependencies,
    user_id: UserId,
) -> Result<Vec<Loan>> {
    deps.loan_repository
        .find_active_by_user_id(user_id)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)
}

pub async fn active_loan_count(deps: &ServiceDependencies, user_id: UserId) -> Result<u64> {
    deps.loan_repository
        .count_active_by_user_id(user_id)
        .await
        .map_err(LoanApplicationError::LoanRepositoryError)
}

/// 利用者の貸出一覧（罰金と書名つき）
///
/// 書名はカタログに書籍ごとに1回だけ問い合わせる。
/// 問い合わせに失敗しても一覧は返し、結果を `book_title` に残す。
pub async fn user_loan_summaries(
    deps: &ServiceDependencies,
    user_id: UserId,
    now: DateTime<Utc>,
) -> Result<Vec<LoanSummary>> {
    let loans = loans_by_user(deps, user_id).await?;

    let mut fines_by_loan: HashMap<LoanId, Vec<Fine>> = HashMap::new();
    for fine in deps
        .fine_repository
        .find_by_user_id(user_id)
        .await
        .map_err(LoanApplicationError::FineRepositoryError)?
    {
        fines_by_loan.entry(fine.loan_id).or_default().push(fine);
    }

    let mut titles: HashMap<BookId, Lookup<Option<String>>> = HashMap::new();
    let mut summaries = Vec::with_capacity(loans.len());

    for loan in loans {
        let book_id = loan.core().book_id;
        let book_title = match titles.get(&book_id) {
            Some(title) => title.clone(),
            None => {
                let title = deps
                    .catalog_service
                    .get_book(book_id)
                    .await
                    .map(|book| book.title);
                if let Lookup::Unavailable(reason) = &title {
                    tracing::warn!(book_id = %book_id, reason = %reason, "Book title lookup failed");
                }
                titles.insert(book_id, title.clone());
                title
            }
        };

        let fines = fines_by_loan.remove(&loan.loan_id()).unwrap_or_default();
        let recorded_fine_total = fines.iter().map(|f| f.amount).sum();
        let accrued_fine = domain::loan::accrued_fine(&loan, now, &deps.policy.fine);

        summaries.push(LoanSummary {
            loan,
            fines,
            recorded_fine_total,
            accrued_fine,
            book_title,
        });
    }

    Ok(summaries)
}
