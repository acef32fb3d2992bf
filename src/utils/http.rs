// src/utils/http.rs

//! HTTP client utilities.

use reqwest::Client;

use crate::error::Result;
use crate::models::BrowserConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &BrowserConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.navigation_timeout())
        .build()?;
    Ok(client)
}
