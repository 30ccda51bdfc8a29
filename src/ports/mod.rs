pub mod account_service;
pub mod catalog_service;
pub mod fine_repository;
pub mod loan_notifier;
pub mod loan_repository;
pub mod lookup;
pub mod mail_transport;
pub mod notification_repository;
pub mod payment_log_store;
pub mod payment_repository;

pub use account_service::AccountService;
pub use catalog_service::{CatalogBook, CatalogService};
pub use fine_repository::FineRepository;
pub use loan_notifier::LoanNotifier;
pub use loan_repository::{BorrowSlot, LoanRepository};
pub use lookup::Lookup;
pub use mail_transport::{MailMessage, MailTransport};
pub use notification_repository::{NotificationFilter, NotificationRepository};
pub use payment_log_store::PaymentLogStore;
pub use payment_repository::{PaymentFilter, PaymentRepository};
