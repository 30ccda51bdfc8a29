use crate::domain::events::DomainEvent;
use async_trait::async_trait;

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出通知ポート
///
/// 貸出台帳のイベントを利用者への通知に変換する。
/// 台帳側は失敗をログに残すだけで、貸出操作そのものは失敗させない。
#[async_trait]
pub trait LoanNotifier: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<()>;
}
