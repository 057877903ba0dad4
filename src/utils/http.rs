// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::UpstreamConfig;

/// Query string as ordered key/value pairs.
pub type Query = Vec<(String, String)>;

/// Source of JSON documents from the remote registration API.
#[async_trait]
pub trait Upstream: Send + Sync {
    /// GET `url` with `query` and decode the body as JSON.
    ///
    /// Non-2xx answers are errors.
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &UpstreamConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// [`Upstream`] backed by `reqwest`.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl Upstream for HttpUpstream {
    async fn get_json(&self, url: &str, query: &[(String, String)]) -> Result<Value> {
        let response = self.client.get(url).query(query).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::upstream(status.as_u16(), body));
        }
        Ok(response.json::<Value>().await?)
    }
}

/// Build a query from borrowed pairs.
pub fn query<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Query
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}
