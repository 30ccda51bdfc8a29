use crate::domain::value_objects::BookId;
use async_trait::async_trait;

use super::lookup::Lookup;

/// カタログから取得した書籍の概要
///
/// カタログの応答はそのまま扱わず、必要なフィールドだけを取り出す。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogBook {
    pub book_id: BookId,
    /// 応答に `title` が含まれていなかった場合は `None`
    pub title: Option<String>,
}

/// カタログサービスポート
///
/// 貸出台帳とカタログの境界を維持する。台帳はBookIDのみを知る。
#[async_trait]
pub trait CatalogService: Send + Sync {
    /// 書籍を取得する
    ///
    /// 貸出前の存在確認と、貸出一覧・通知での書名表示に使用される。
    async fn get_book(&self, book_id: BookId) -> Lookup<CatalogBook>;
}
