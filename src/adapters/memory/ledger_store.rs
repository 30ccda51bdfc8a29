use crate::domain::{
    fine::Fine,
    loan::{BorrowedLoan, Loan},
    value_objects::{BookId, FineId, LoanId, UserId},
};
use crate::ports::{
    fine_repository::FineRepository,
    loan_repository::{BorrowSlot, LoanRepository, Result},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{Mutex, MutexGuard};

use super::poisoned;

#[derive(Default)]
struct LedgerState {
    loans: Vec<Loan>,
    fines: Vec<Fine>,
}

/// In-memory loan and fine store
///
/// Implements both `LoanRepository` and `FineRepository` over one lock so
/// closing a loan and recording its fine happen together.
#[derive(Default)]
pub struct LedgerStore {
    state: Mutex<LedgerState>,
}

impl LedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, LedgerState>> {
        self.state.lock().map_err(|_| poisoned("ledger store"))
    }

    fn loans_where(&self, predicate: impl Fn(&Loan) -> bool) -> Result<Vec<Loan>> {
        let state = self.lock()?;
        let mut loans: Vec<Loan> = state.loans.iter().filter(|l| predicate(*l)).cloned().collect();
        loans.sort_by(|a, b| b.core().borrowed_at.cmp(&a.core().borrowed_at));
        Ok(loans)
    }

    fn fines_where(&self, predicate: impl Fn(&Fine) -> bool) -> Result<Vec<Fine>> {
        let state = self.lock()?;
        Ok(state.fines.iter().filter(|f| predicate(*f)).cloned().collect())
    }
}

#[async_trait]
impl LoanRepository for LedgerStore {
    async fn insert_if_allowed(&self, loan: &BorrowedLoan, max_active: usize) -> Result<BorrowSlot> {
        let mut state = self.lock()?;

        let active: Vec<&Loan> = state
            .loans
            .iter()
            .filter(|l| l.status().is_borrowed() && l.core().user_id == loan.user_id)
            .collect();

        if active.iter().any(|l| l.core().book_id == loan.book_id) {
            return Ok(BorrowSlot::AlreadyBorrowed);
        }
        if active.len() >= max_active {
            return Ok(BorrowSlot::LimitReached);
        }

        state.loans.push(Loan::Borrowed(loan.clone()));
        Ok(BorrowSlot::Inserted)
    }

    async fn close(&self, loan: &Loan, fine: Option<&Fine>) -> Result<bool> {
        if loan.status().is_borrowed() {
            return Err("cannot close a loan that is still BORROWED".into());
        }

        let mut state = self.lock()?;

        let Some(stored) = state
            .loans
            .iter_mut()
            .find(|l| l.loan_id() == loan.loan_id())
        else {
            return Ok(false);
        };

        if !stored.status().is_borrowed() {
            return Ok(false);
        }

        *stored = loan.clone();
        if let Some(fine) = fine {
            state.fines.push(fine.clone());
        }
        Ok(true)
    }

    async fn get_by_id(&self, loan_id: LoanId) -> Result<Option<Loan>> {
        let state = self.lock()?;
        Ok(state.loans.iter().find(|l| l.loan_id() == loan_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Loan>> {
        self.loans_where(|_| true)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Loan>> {
        self.loans_where(|l| l.core().user_id == user_id)
    }

    async fn find_by_book_id(&self, book_id: BookId) -> Result<Vec<Loan>> {
        self.loans_where(|l| l.core().book_id == book_id)
    }

    async fn find_active_by_user_id(&self, user_id: UserId) -> Result<Vec<Loan>> {
        self.loans_where(|l| l.status().is_borrowed() && l.core().user_id == user_id)
    }

    async fn count_active_by_user_id(&self, user_id: UserId) -> Result<u64> {
        Ok(self.find_active_by_user_id(user_id).await?.len() as u64)
    }

    async fn find_overdue(&self, cutoff: DateTime<Utc>) -> Result<Vec<Loan>> {
        let mut loans = self.loans_where(|l| l.status().is_borrowed() && l.core().due_date < cutoff)?;
        loans.sort_by_key(|l| l.core().due_date);
        Ok(loans)
    }

    async fn delete(&self, loan_id: LoanId) -> Result<bool> {
        let mut state = self.lock()?;
        let before = state.loans.len();
        state.loans.retain(|l| l.loan_id() != loan_id);
        if state.loans.len() == before {
            return Ok(false);
        }
        state.fines.retain(|f| f.loan_id != loan_id);
        Ok(true)
    }
}

#[async_trait]
impl FineRepository for LedgerStore {
    async fn get_by_id(&self, fine_id: FineId) -> Result<Option<Fine>> {
        let state = self.lock()?;
        Ok(state.fines.iter().find(|f| f.fine_id == fine_id).cloned())
    }

    async fn find_all(&self) -> Result<Vec<Fine>> {
        self.fines_where(|_| true)
    }

    async fn find_by_user_id(&self, user_id: UserId) -> Result<Vec<Fine>> {
        self.fines_where(|f| f.user_id == user_id)
    }

    async fn find_unpaid_by_user_id(&self, user_id: UserId) -> Result<Vec<Fine>> {
        self.fines_where(|f| f.user_id == user_id && !f.paid)
    }

    async fn mark_paid(&self, fine_id: FineId) -> Result<bool> {
        let mut state = self.lock()?;
        match state.fines.iter_mut().find(|f| f.fine_id == fine_id) {
            Some(fine) if !fine.paid => {
                fine.paid = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
