use crate::domain::value_objects::BookId;
use crate::ports::{
    catalog_service::{CatalogBook, CatalogService},
    lookup::Lookup,
};
use async_trait::async_trait;
use reqwest::Client;

use super::get;

/// HTTP client for the catalog service (`GET {base}/books/{id}`)
pub struct CatalogClient {
    client: Client,
    base_url: String,
}

impl CatalogClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Pull `title` out of the book JSON if it is there
pub(crate) fn extract_title(body: &serde_json::Value) -> Option<String> {
    body.get("title")?.as_str().map(str::to_string)
}

#[async_trait]
impl CatalogService for CatalogClient {
    async fn get_book(&self, book_id: BookId) -> Lookup<CatalogBook> {
        let url = format!("{}/books/{}", self.base_url, book_id);
        let response = match get(&self.client, &url).await {
            Lookup::Found(response) => response,
            Lookup::Missing => return Lookup::Missing,
            Lookup::Unavailable(reason) => return Lookup::Unavailable(reason),
        };

        // 2xx means the book exists even if the body is not what we expect
        let title = match response.json::<serde_json::Value>().await {
            Ok(body) => extract_title(&body),
            Err(e) => {
                tracing::debug!(book_id = %book_id, error = %e, "Catalog returned a non-JSON body");
                None
            }
        };

        Lookup::Found(CatalogBook { book_id, title })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_title() {
        assert_eq!(
            extract_title(&json!({ "id": 1, "title": "Dune" })).as_deref(),
            Some("Dune")
        );
        assert_eq!(extract_title(&json!({ "title": 7 })), None);
        assert_eq!(extract_title(&json!([])), None);
    }
}
