pub mod loan;
pub mod notification;
pub mod payment;
