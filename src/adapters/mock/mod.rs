pub mod account_service;
pub mod catalog_service;
pub mod loan_notifier;
pub mod mail_transport;

pub use account_service::AccountService;
pub use catalog_service::CatalogService;
pub use loan_notifier::LoanNotifier;
pub use mail_transport::MailTransport;
