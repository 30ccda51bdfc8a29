use crate::domain::value_objects::UserId;
use async_trait::async_trait;

use super::lookup::Lookup;

/// アカウントサービスポート
///
/// 貸出台帳と通知はUserIDのみを知り、利用者の詳細は知らない。
#[async_trait]
pub trait AccountService: Send + Sync {
    /// 利用者が存在するか確認する
    ///
    /// 貸出作成前の利用者バリデーションに使用される。
    async fn find_user(&self, user_id: UserId) -> Lookup<()>;

    /// 利用者のメールアドレスを取得する
    ///
    /// EMAIL通知の配信先として使用される。
    async fn get_email(&self, user_id: UserId) -> Lookup<String>;
}
