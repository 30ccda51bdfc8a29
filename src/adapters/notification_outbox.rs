use crate::domain::{
    BookId, DomainEvent, NotificationDraft, events::*, notification::create_notification,
};
use crate::ports::{
    catalog_service::CatalogService,
    loan_notifier::{LoanNotifier, Result},
    lookup::Lookup,
    notification_repository::NotificationRepository,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

/// 貸出台帳のイベントをPENDINGの通知として登録するLoanNotifier
///
/// 配信は通知ディスパッチャー（send / send-pending / 定期スイープ）が行う。
pub struct NotificationOutbox {
    notification_repository: Arc<dyn NotificationRepository>,
    catalog_service: Arc<dyn CatalogService>,
}

impl NotificationOutbox {
    pub fn new(
        notification_repository: Arc<dyn NotificationRepository>,
        catalog_service: Arc<dyn CatalogService>,
    ) -> Self {
        Self {
            notification_repository,
            catalog_service,
        }
    }

    /// 書名を取得する
    ///
    /// 見つからない・問い合わせできない場合は `None`。通知自体は登録する。
    async fn book_title(&self, book_id: BookId) -> Option<String> {
        match self.catalog_service.get_book(book_id).await {
            Lookup::Found(book) => book.title,
            Lookup::Missing => None,
            Lookup::Unavailable(reason) => {
                tracing::warn!(book_id = %book_id, reason = %reason, "Book title lookup failed");
                None
            }
        }
    }

    async fn draft_for(&self, event: &DomainEvent) -> NotificationDraft {
        match event {
            DomainEvent::BookBorrowed(BookBorrowed {
                user_id,
                book_id,
                due_date,
                ..
            }) => {
                let title = self.book_title(*book_id).await;
                NotificationDraft::book_borrowed(*user_id, *book_id, title.as_deref(), *due_date)
            }
            DomainEvent::BookReturned(BookReturned {
                user_id, book_id, ..
            }) => {
                let title = self.book_title(*book_id).await;
                NotificationDraft::book_returned(*user_id, *book_id, title.as_deref())
            }
            DomainEvent::BookLost(BookLost {
                user_id,
                book_id,
                fine_amount,
                ..
            }) => {
                let title = self.book_title(*book_id).await;
                NotificationDraft::book_lost(*user_id, *book_id, title.as_deref(), *fine_amount)
            }
            DomainEvent::LoanOverdue(LoanOverdue {
                user_id,
                book_id,
                days_overdue,
                ..
            }) => {
                let title = self.book_title(*book_id).await;
                NotificationDraft::book_overdue(*user_id, *book_id, title.as_deref(), *days_overdue)
            }
            DomainEvent::FinePaid(FinePaid {
                user_id,
                fine_id,
                amount,
                ..
            }) => NotificationDraft::fine_payment(*user_id, *fine_id, *amount),
        }
    }
}

#[async_trait]
impl LoanNotifier for NotificationOutbox {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        let draft = self.draft_for(event).await;
        let notification = create_notification(draft, Utc::now());

        self.notification_repository.insert(&notification).await?;

        tracing::debug!(
            event_type = event.event_type(),
            notification_id = %notification.notification_id,
            template = %notification.template,
            "Loan notification enqueued"
        );
        Ok(())
    }
}
