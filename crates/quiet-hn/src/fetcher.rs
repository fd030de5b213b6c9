use crate::error::RemoteError;
use crate::item::Item;
use bytes::Bytes;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

/// The two calls the dispatcher needs from the remote API.
///
/// Implementations are plain transports: no retries, no caching.
pub trait Fetcher: Send + Sync + 'static {
    /// Ids of the current top items, best first.
    fn top_ids(&self) -> impl Future<Output = Result<Vec<u64>, RemoteError>> + Send;

    /// One item by id.
    fn item(&self, id: u64) -> impl Future<Output = Result<Item, RemoteError>> + Send;
}

/// [`Fetcher`] over the Hacker News Firebase API.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .pool_max_idle_per_host(32)
            .timeout(timeout)
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, RemoteError> {
        let body = self.get_body(&url).await?;
        serde_json::from_slice(&body).map_err(|source| RemoteError::Decode { url, source })
    }

    async fn get_body(&self, url: &str) -> Result<Bytes, RemoteError> {
        let transport = |source: reqwest::Error| RemoteError::Transport {
            url: url.to_string(),
            source,
        };

        let resp = self.client.get(url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RemoteError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        resp.bytes().await.map_err(transport)
    }
}

impl Fetcher for HttpFetcher {
    async fn top_ids(&self) -> Result<Vec<u64>, RemoteError> {
        self.get_json(format!("{}/topstories.json", self.base_url)).await
    }

    async fn item(&self, id: u64) -> Result<Item, RemoteError> {
        self.get_json(format!("{}/item/{}.json", self.base_url, id)).await
    }
}
