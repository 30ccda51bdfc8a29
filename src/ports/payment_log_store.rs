use crate::domain::{
    payment::{Gateway, PaymentLogEntry},
    value_objects::PaymentId,
};
use async_trait::async_trait;
use futures::stream::BoxStream;

#[allow(dead_code)]
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 支払いログストアポート
///
/// 支払いの監査証跡（追記専用ログ）を読み出す。
/// 追記は `PaymentRepository` が状態の変更と同時に行う。
/// 追記されたエントリは変更・削除不可。
#[async_trait]
pub trait PaymentLogStore: Send + Sync {
    /// 支払いのすべてのログを追記順に読み込む
    async fn load(&self, payment_id: PaymentId) -> Result<Vec<PaymentLogEntry>>;

    /// ゲートウェイ別のログを追記順に取得する
    async fn find_by_gateway(&self, gateway: Gateway) -> Result<Vec<PaymentLogEntry>>;

    /// すべての支払いのログをストリーム配信する
    ///
    /// ログは挿入順に配信される。
    fn stream_all(&self) -> BoxStream<'_, Result<PaymentLogEntry>>;
}
