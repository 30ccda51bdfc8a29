use crate::domain::events::DomainEvent;
use crate::ports::loan_notifier::{LoanNotifier as LoanNotifierTrait, Result};
use async_trait::async_trait;
use std::sync::Mutex;

/// LoanNotifierのモック実装
///
/// 受け取ったイベントを記録する。失敗させることもできる。
pub struct LoanNotifier {
    published: Mutex<Vec<DomainEvent>>,
    failing: Mutex<bool>,
}

impl LoanNotifier {
    pub fn new() -> Self {
        Self {
            published: Mutex::new(Vec::new()),
            failing: Mutex::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock().unwrap() = failing;
    }

    /// 記録されたイベント
    pub fn published(&self) -> Vec<DomainEvent> {
        self.published.lock().unwrap().clone()
    }
}

impl Default for LoanNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LoanNotifierTrait for LoanNotifier {
    async fn publish(&self, event: &DomainEvent) -> Result<()> {
        if *self.failing.lock().unwrap() {
            return Err("mock loan notifier is failing".into());
        }
        self.published.lock().unwrap().push(event.clone());
        Ok(())
    }
}
