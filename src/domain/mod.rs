pub mod commands;
pub mod errors;
pub mod events;
pub mod fine;
pub mod loan;
pub mod notification;
pub mod payment;
pub mod value_objects;

pub use errors::*;
pub use events::*;
pub use fine::{Fine, FinePolicy, FineReason};
pub use loan::{LendingPolicy, Loan, LoanStatus};
pub use notification::{
    Notification, NotificationDraft, NotificationStatus, NotificationTemplate, NotificationType,
};
pub use payment::{Gateway, Payment, PaymentLogEntry, PaymentMethod, PaymentStatus, PaymentType};
pub use value_objects::*;
