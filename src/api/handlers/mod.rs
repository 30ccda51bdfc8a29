mod borrows;
mod fines;
mod notifications;
mod payments;

pub use borrows::*;
pub use fines::*;
pub use notifications::*;
pub use payments::*;

use crate::application::{loan, notification, payment};

/// ハンドラー間で共有されるアプリケーション状態
///
/// コンテキストごとの依存関係をまとめて持つ。
#[derive(Clone)]
pub struct AppState {
    pub loans: loan::ServiceDependencies,
    pub notifications: notification::ServiceDependencies,
    pub payments: payment::ServiceDependencies,
}
