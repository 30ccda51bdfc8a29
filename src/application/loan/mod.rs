mod errors;
mod fine_service;
mod loan_service;
mod overdue_detection;

pub use errors::{LoanApplicationError, Result};
pub use fine_service::{
    fines_by_user, list_fines, pay_fine, unpaid_fine_total, unpaid_fines_by_user,
};
pub use loan_service::{
    LoanSummary, ServiceDependencies, active_loan_count, active_loans_by_user, borrow_book,
    delete_loan, get_loan, list_loans, loans_by_book, loans_by_user, report_lost, return_book,
    user_loan_summaries,
};
pub use overdue_detection::send_overdue_reminders;
