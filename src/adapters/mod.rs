pub mod http;
pub mod log_mail_transport;
pub mod memory;
pub mod mock;
pub mod notification_outbox;
pub mod postgres;

pub use log_mail_transport::LogMailTransport;
pub use notification_outbox::NotificationOutbox;
