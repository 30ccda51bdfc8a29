use crate::domain::value_objects::BookId;
use crate::ports::{
    catalog_service::{CatalogBook, CatalogService as CatalogServiceTrait},
    lookup::Lookup,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// CatalogServiceのモック実装
///
/// 書籍IDと書名を保存することで状態を持ったテストをサポート。
/// 問い合わせ不能な状態も再現できる。
pub struct CatalogService {
    books: Mutex<HashMap<BookId, Option<String>>>,
    unavailable: Mutex<bool>,
}

impl CatalogService {
    pub fn new() -> Self {
        Self {
            books: Mutex::new(HashMap::new()),
            unavailable: Mutex::new(false),
        }
    }

    /// テスト用に書籍を登録
    pub fn add_book(&self, book_id: BookId, title: impl Into<String>) {
        self.books
            .lock()
            .unwrap()
            .insert(book_id, Some(title.into()));
    }

    /// 書名を返さない書籍を登録
    pub fn add_untitled_book(&self, book_id: BookId) {
        self.books.lock().unwrap().insert(book_id, None);
    }

    /// カタログサービスの停止を再現
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }
}

impl Default for CatalogService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogServiceTrait for CatalogService {
    async fn get_book(&self, book_id: BookId) -> Lookup<CatalogBook> {
        if *self.unavailable.lock().unwrap() {
            return Lookup::Unavailable("mock catalog service is down".to_string());
        }
        match self.books.lock().unwrap().get(&book_id) {
            Some(title) => Lookup::Found(CatalogBook {
                book_id,
                title: title.clone(),
            }),
            None => Lookup::Missing,
        }
    }
}
