use crate::domain::{
    payment::{Payment, PaymentLogEntry, PaymentStatus},
    value_objects::{PaymentId, UserId},
};
use async_trait::async_trait;

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 支払いの検索条件（指定された項目すべてに一致するもの）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaymentFilter {
    pub user_id: Option<UserId>,
    pub status: Option<PaymentStatus>,
    pub reference_id: Option<uuid::Uuid>,
}

impl PaymentFilter {
    pub fn matches(&self, payment: &Payment) -> bool {
        self.user_id.is_none_or(|id| payment.user_id == id)
            && self.status.is_none_or(|s| payment.status == s)
            && self
                .reference_id
                .is_none_or(|r| payment.reference_id == Some(r))
    }
}

/// 支払いリポジトリポート
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    /// 支払いと作成ログを1回の保存で追加する
    async fn insert_with_log(&self, payment: &Payment, entry: &PaymentLogEntry) -> Result<()>;

    async fn get_by_id(&self, payment_id: PaymentId) -> Result<Option<Payment>>;

    /// 条件に一致する支払いを作成順に返す
    async fn find(&self, filter: PaymentFilter) -> Result<Vec<Payment>>;

    /// 支払いの状態を保存し、ログを1件追記する
    ///
    /// `expected` が指定されていれば、保存済みの状態が一致する場合のみ更新する。
    /// 状態の更新とログの追記はどちらも行われるか、どちらも行われないかのいずれか。
    /// 更新しなかった場合は `false`。
    async fn transition(
        &self,
        payment: &Payment,
        expected: Option<PaymentStatus>,
        entry: &PaymentLogEntry,
    ) -> Result<bool>;
}
