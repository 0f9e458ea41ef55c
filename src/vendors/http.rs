// src/vendors/http.rs

//! HTTP client for vendor downloads
//!
//! Wraps reqwest with a small fixed retry policy: transport errors, 5xx and
//! 429 are retried up to three times with a linearly growing delay; any
//! other non-200 answer fails immediately.

use crate::error::{Error, Result};
use reqwest::{Client, Response, StatusCode};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Default timeout for establishing a connection
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts after the first request
const MAX_RETRIES: u32 = 3;

/// Base retry delay; attempt `n` waits `n * RETRY_DELAY`
const RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP client wrapper with retry support
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpClient {
    /// Create a new client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!("firmirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Download(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: MAX_RETRIES,
            retry_delay: RETRY_DELAY,
        })
    }

    /// Shorten the retry delay (tests)
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    fn is_retryable(status: StatusCode) -> bool {
        status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
    }

    /// GET `url`, retrying transient failures, and return the 200 response
    async fn get(&self, url: &str) -> Result<Response> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let retry_in = self.retry_delay * attempt;

            match self.client.get(url).send().await {
                Ok(response) if response.status() == StatusCode::OK => return Ok(response),
                Ok(response) => {
                    let status = response.status();
                    if !Self::is_retryable(status) || attempt > self.max_retries {
                        return Err(Error::Download(format!("HTTP {status} from {url}")));
                    }
                    warn!("HTTP {} from {}, retrying in {:?}", status, url, retry_in);
                }
                Err(e) => {
                    if attempt > self.max_retries {
                        return Err(Error::Download(format!(
                            "Failed to download {url} after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("Download of {} failed ({}), retrying in {:?}", url, e, retry_in);
                }
            }

            tokio::time::sleep(retry_in).await;
        }
    }

    /// Download a resource into memory
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!("Fetching {}", url);
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Download(format!("Failed to read response from {url}: {e}")))?;
        Ok(bytes.to_vec())
    }

    /// Stream a resource into `dest`
    ///
    /// A partial file is removed on failure so a later retrieval does not
    /// mistake it for a finished download.
    pub async fn download_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        debug!("Downloading {} to {}", url, dest.display());
        let result = self.stream_to_file(url, dest).await;
        if result.is_err() {
            let _ = tokio::fs::remove_file(dest).await;
        }
        result
    }

    async fn stream_to_file(&self, url: &str, dest: &Path) -> Result<u64> {
        let mut response = self.get(url).await?;
        let mut file = tokio::fs::File::create(dest).await?;

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::Download(format!("Failed to read response from {url}: {e}")))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        Ok(written)
    }
}
