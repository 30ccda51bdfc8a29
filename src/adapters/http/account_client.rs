use crate::domain::value_objects::UserId;
use crate::ports::{account_service::AccountService, lookup::Lookup};
use async_trait::async_trait;
use reqwest::Client;

use super::get;

/// HTTP client for the account service
///
/// `GET {base}/users/{id}/profile` and `GET {base}/users/{id}/email`.
pub struct AccountClient {
    client: Client,
    base_url: String,
}

impl AccountClient {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

/// Extract an email address from the `/email` response body
///
/// Accepts plain text, a JSON string, or a JSON object with an `email` field.
pub(crate) fn parse_email_body(body: &str) -> Option<String> {
    let body = body.trim();
    let email = match serde_json::from_str::<serde_json::Value>(body) {
        Ok(serde_json::Value::String(s)) => s,
        Ok(serde_json::Value::Object(map)) => map.get("email")?.as_str()?.to_string(),
        Ok(_) => return None,
        Err(_) => body.to_string(),
    };

    let email = email.trim().to_string();
    (!email.is_empty()).then_some(email)
}

#[async_trait]
impl AccountService for AccountClient {
    async fn find_user(&self, user_id: UserId) -> Lookup<()> {
        let url = format!("{}/users/{}/profile", self.base_url, user_id);
        get(&self.client, &url).await.map(|_| ())
    }

    async fn get_email(&self, user_id: UserId) -> Lookup<String> {
        let url = format!("{}/users/{}/email", self.base_url, user_id);
        let response = match get(&self.client, &url).await {
            Lookup::Found(response) => response,
            Lookup::Missing => return Lookup::Missing,
            Lookup::Unavailable(reason) => return Lookup::Unavailable(reason),
        };

        match response.text().await {
            Ok(body) => match parse_email_body(&body) {
                Some(email) => Lookup::Found(email),
                None => Lookup::Missing,
            },
            Err(e) => Lookup::Unavailable(format!("{}: {}", url, e)),
        }
    }
}
