use library_ledger::{
    adapters::{
        LogMailTransport, NotificationOutbox,
        http::{AccountClient, CatalogClient, build_client},
        postgres::{
            PostgresFineRepository, PostgresLoanRepository, PostgresNotificationRepository,
            PostgresPaymentLogStore, PostgresPaymentRepository,
        },
    },
    api::{handlers::AppState, router::create_router},
    application::{loan, notification, payment},
    config::Config,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "library_ledger=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    // Initialize adapters
    let http_client = build_client(config.http_timeout).expect("Failed to build HTTP client");
    let account_service = Arc::new(AccountClient::new(
        http_client.clone(),
        config.account_service_url.clone(),
    ));
    let catalog_service = Arc::new(CatalogClient::new(
        http_client,
        config.catalog_service_url.clone(),
    ));
    let notification_repository = Arc::new(PostgresNotificationRepository::new(pool.clone()));
    let loan_notifier = Arc::new(NotificationOutbox::new(
        notification_repository.clone(),
        catalog_service.clone(),
    ));

    // Create service dependencies
    let loans = loan::ServiceDependencies {
        loan_repository: Arc::new(PostgresLoanRepository::new(pool.clone())),
        fine_repository: Arc::new(PostgresFineRepository::new(pool.clone())),
        account_service: account_service.clone(),
        catalog_service,
        loan_notifier,
        policy: config.lending_policy,
    };
    let notifications = notification::ServiceDependencies {
        notification_repository,
        account_service,
        mail_transport: Arc::new(LogMailTransport::new()),
        mail_from: config.mail_from.clone(),
    };
    let payments = payment::ServiceDependencies {
        payment_repository: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        payment_log_store: Arc::new(PostgresPaymentLogStore::new(pool)),
    };

    if let Some(period) = config.notification_sweep_interval {
        spawn_notification_sweep(notifications.clone(), period);
    }

    // Create application state
    let app_state = Arc::new(AppState {
        loans,
        notifications,
        payments,
    });

    // Create router
    let app = create_router(app_state);

    // Server configuration
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

/// Retry FAILED notifications and send PENDING ones on a fixed interval
fn spawn_notification_sweep(deps: notification::ServiceDependencies, period: Duration) {
    tracing::info!(period_secs = period.as_secs(), "Notification sweep enabled");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match notification::run_sweep(&deps, Utc::now()).await {
                Ok(report) => tracing::debug!(
                    retried = report.retried,
                    sent = report.sent,
                    "Notification sweep finished"
                ),
                Err(e) => tracing::error!(error = %e, "Notification sweep failed"),
            }
        }
    });
}
