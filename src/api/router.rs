use axum::{
    Router,
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::*;

/// Creates the API router for the three contexts
///
/// Borrow ledger: `/borrows`, `/fines`
/// Notification dispatcher: `/api/notifications`
/// Payment ledger: `/payments`, `/payment-logs`
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check endpoint
        .route("/health", get(health_check))
        // Borrow ledger
        .route("/borrows", post(borrow_book).get(list_loans))
        .route("/borrows/overdue-reminders", post(send_overdue_reminders))
        .route("/borrows/:id", get(get_loan).delete(delete_loan))
        .route("/borrows/:id/return", put(return_book))
        .route("/borrows/:id/lost", put(report_lost))
        .route("/borrows/book/:book_id", get(loans_by_book))
        .route("/borrows/user/:user_id", get(loan_summaries_by_user))
        .route("/borrows/user/:user_id/active", get(active_loans_by_user))
        .route("/borrows/user/:user_id/active/count", get(active_loan_count))
        .route("/fines", get(list_fines))
        .route("/fines/:id/pay", put(pay_fine))
        .route("/fines/user/:user_id", get(fines_by_user))
        .route("/fines/user/:user_id/unpaid", get(unpaid_fines_by_user))
        .route("/fines/user/:user_id/unpaid/total", get(unpaid_fine_total))
        // Notification dispatcher
        .route(
            "/api/notifications",
            post(create_notification).get(find_notifications),
        )
        .route("/api/notifications/retry-failed", post(retry_failed))
        .route("/api/notifications/send-pending", post(send_pending))
        .route(
            "/api/notifications/fine-payment-success/:user_id",
            post(fine_payment_success),
        )
        .route(
            "/api/notifications/borrow-payment-success/:user_id",
            post(borrow_payment_success),
        )
        .route("/api/notifications/:id", get(get_notification))
        .route("/api/notifications/:id/send", post(send_notification))
        .route("/api/notifications/:id/cancel", post(cancel_notification))
        // Payment ledger
        .route("/payments", post(create_payment).get(find_payments))
        .route("/payments/:id", get(get_payment))
        .route("/payments/:id/vnpay", post(process_vnpay))
        .route("/payments/:id/cash", post(process_cash))
        .route("/payments/:id/fail", post(fail_payment))
        .route("/payments/:id/logs", get(payment_logs))
        .route("/payment-logs", get(list_payment_logs))
        // Add tracing middleware
        .layer(TraceLayer::new_for_http())
        // Add application state
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
