//! HTTP clients for the external account and catalog services
//!
//! Each lookup is a single request. A 404 answer is `Missing`; transport
//! errors, timeouts and any other non-success status are `Unavailable`.

pub mod account_client;
pub mod catalog_client;

pub use account_client::AccountClient;
pub use catalog_client::CatalogClient;

use crate::ports::lookup::Lookup;
use reqwest::{Client, Response, StatusCode};
use std::time::Duration;

/// Build the shared HTTP client with a per-request timeout
pub fn build_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).build()
}

/// Send a GET request and classify the response status
async fn get(client: &Client, url: &str) -> Lookup<Response> {
    match client.get(url).send().await {
        Ok(response) if response.status() == StatusCode::NOT_FOUND => Lookup::Missing,
        Ok(response) if response.status().is_success() => Lookup::Found(response),
        Ok(response) => Lookup::Unavailable(format!("{} returned {}", url, response.status())),
        Err(e) => Lookup::Unavailable(format!("{}: {}", url, e)),
    }
}
