use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// UUIDをラップしたID値オブジェクトを定義する
///
/// コンテキストごとにIDの型を分けることで、
/// 貸出IDと罰金IDの取り違えなどをコンパイル時に防ぐ。
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn value(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

define_id!(
    /// 貸出ID - 貸出台帳の集約ID
    LoanId
);
define_id!(
    /// 罰金ID
    FineId
);
define_id!(
    /// 利用者ID - アカウントサービスへの参照
    UserId
);
define_id!(
    /// 書籍ID - カタログサービスへの参照
    BookId
);
define_id!(
    /// 通知ID
    NotificationId
);
define_id!(
    /// 支払いID
    PaymentId
);
define_id!(
    /// 支払いログID
    PaymentLogId
);
