//! Entropy from an external QRNG-style JSON feed.

use async_trait::async_trait;
use augur_core::entropy::EntropySource;
use augur_core::error::ReadingError;
use reqwest::Client;
use serde::Deserialize;
use tracing::instrument;

#[derive(Debug, Deserialize)]
struct FeedResponse {
    success: bool,
    #[serde(default)]
    data: Vec<u32>,
}

/// Requests `?length=n&type=uint16` and expects `{success, data[]}`.
#[derive(Debug, Clone)]
pub struct HttpEntropySource {
    client: Client,
    url: String,
}

impl HttpEntropySource {
    /// Creates a source reading from `url`.
    #[must_use]
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }
}

fn unavailable(e: impl std::fmt::Display) -> ReadingError {
    ReadingError::EntropyUnavailable(e.to_string())
}

fn take_values(response: FeedResponse, count: usize) -> Result<Vec<u32>, ReadingError> {
    if !response.success {
        return Err(unavailable("feed reported failure"));
    }
    if response.data.len() < count {
        return Err(unavailable(format!(
            "feed returned {} of {count} values",
            response.data.len()
        )));
    }
    let mut values = response.data;
    values.truncate(count);
    Ok(values)
}

#[async_trait]
impl EntropySource for HttpEntropySource {
    #[instrument(skip(self))]
    async fn request(&self, count: usize) -> Result<Vec<u32>, ReadingError> {
        if count == 0 {
            return Ok(Vec::new());
        }
        let response = self
            .client
            .get(&self.url)
            .query(&[("length", count.to_string().as_str()), ("type", "uint16")])
            .send()
            .await
            .map_err(unavailable)?
            .error_for_status()
            .map_err(unavailable)?;
        let body: FeedResponse = response.json().await.map_err(unavailable)?;
        take_values(body, count)
    }
}
