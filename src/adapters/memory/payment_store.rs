use crate::domain::{
    payment::{Gateway, Payment, PaymentLogEntry, PaymentStatus},
    value_objects::PaymentId,
};
use crate::ports::{
    payment_log_store::PaymentLogStore,
    payment_repository::{PaymentFilter, PaymentRepository, Result},
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use std::sync::{
    Mutex, MutexGuard,
    atomic::{AtomicBool, Ordering},
};

use super::poisoned;

#[derive(Default)]
struct PaymentState {
    payments: Vec<Payment>,
    /// 追記順
    logs: Vec<PaymentLogEntry>,
}

/// In-memory payment store and append-only payment log
///
/// A payment change and its log entry are applied under one lock, and only
/// after every check has passed.
#[derive(Default)]
pub struct PaymentStore {
    state: Mutex<PaymentState>,
    log_writes_failing: AtomicBool,
}

impl PaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every log write fail, as a full disk or lost connection would
    pub fn set_log_writes_failing(&self, failing: bool) {
        self.log_writes_failing.store(failing, Ordering::SeqCst);
    }

    fn check_log_write(&self, payment_id: PaymentId, entry: &PaymentLogEntry) -> Result<()> {
        if self.log_writes_failing.load(Ordering::SeqCst) {
            return Err("payment log is unavailable".into());
        }
        if entry.payment_id != payment_id {
            return Err(format!(
                "log entry {} belongs to payment {}, not {}",
                entry.log_id, entry.payment_id, payment_id
            )
            .into());
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, PaymentState>> {
        self.state.lock().map_err(|_| poisoned("payment store"))
    }

    fn logs_where(&self, predicate: impl Fn(&PaymentLogEntry) -> bool) -> Result<Vec<PaymentLogEntry>> {
        Ok(self
            .lock()?
            .logs
            .iter()
            .filter(|e| predicate(*e))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PaymentRepository for PaymentStore {
    async fn insert_with_log(&self, payment: &Payment, entry: &PaymentLogEntry) -> Result<()> {
        let mut state = self.lock()?;
        self.check_log_write(payment.payment_id, entry)?;

        state.payments.push(payment.clone());
        state.logs.push(entry.clone());
        Ok(())
    }

    async fn get_by_id(&self, payment_id: PaymentId) -> Result<Option<Payment>> {
        Ok(self
            .lock()?
            .payments
            .iter()
            .find(|p| p.payment_id == payment_id)
            .cloned())
    }

    async fn find(&self, filter: PaymentFilter) -> Result<Vec<Payment>> {
        Ok(self
            .lock()?
            .payments
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect())
    }

    async fn transition(
        &self,
        payment: &Payment,
        expected: Option<PaymentStatus>,
        entry: &PaymentLogEntry,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        let Some(index) = state
            .payments
            .iter()
            .position(|p| p.payment_id == payment.payment_id)
        else {
            return Ok(false);
        };
        if !expected.is_none_or(|s| state.payments[index].status == s) {
            return Ok(false);
        }
        self.check_log_write(payment.payment_id, entry)?;

        let stored = &mut state.payments[index];
        stored.status = payment.status;
        stored.updated_at = payment.updated_at;
        state.logs.push(entry.clone());
        Ok(true)
    }
}

#[async_trait]
impl PaymentLogStore for PaymentStore {
    async fn load(&self, payment_id: PaymentId) -> Result<Vec<PaymentLogEntry>> {
        self.logs_where(|e| e.payment_id == payment_id)
    }

    async fn find_by_gateway(&self, gateway: Gateway) -> Result<Vec<PaymentLogEntry>> {
        self.logs_where(|e| e.gateway == gateway)
    }

    /// Snapshot taken when the stream is created
    fn stream_all(&self) -> BoxStream<'_, Result<PaymentLogEntry>> {
        match self.logs_where(|_| true) {
            Ok(entries) => stream::iter(entries.into_iter().map(Ok)).boxed(),
            Err(e) => stream::once(async move { Err(e) }).boxed(),
        }
    }
}
