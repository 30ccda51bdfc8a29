//! In-memory store implementations
//!
//! Each store keeps its state behind a single `Mutex`, so a conditional
//! write (borrow slot, status compare-and-swap) is atomic with its check.

pub mod ledger_store;
pub mod notification_repository;
pub mod payment_store;

pub use ledger_store::LedgerStore;
pub use notification_repository::NotificationRepository;
pub use payment_store::PaymentStore;

fn poisoned(store: &str) -> Box<dyn std::error::Error + Send + Sync> {
    format!("{} lock poisoned", store).into()
}
