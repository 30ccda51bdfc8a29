mod dispatch_service;
mod errors;

pub use dispatch_service::{
    PaymentSuccess, ServiceDependencies, SweepReport, cancel_notification, create_notification,
    find_notifications, get_notification, notify_borrow_payment_success,
    notify_fine_payment_success, retry_failed, run_sweep, send_notification, send_pending,
};
pub use errors::{NotificationApplicationError, Result};
