mod errors;
mod payment_service;

pub use errors::{PaymentApplicationError, Result};
pub use payment_service::{
    ServiceDependencies, all_payment_logs, create_payment, fail_payment, find_payments,
    get_payment, payment_logs, payment_logs_by_gateway, process_cash, process_vnpay,
};
