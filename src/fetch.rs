//! Network fetch capability used for version pages and driver downloads

use std::time::Duration;

#[cfg(test)]
use mockall::automock;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
}

/// Trait for fetching a URL's body
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns the full response body
    ///
    /// # Arguments
    /// * `url` - Absolute URL to GET
    /// * `timeout` - Upper bound for the whole request, body included
    ///
    /// # Returns
    /// * `Ok(Vec<u8>)` - Body of a 2xx response
    /// * `Err(FetchError)` - On transport failure, timeout or non-2xx status
    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError>;
}

/// Fetcher backed by a shared reqwest client
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(USER_AGENT)
                .build()
                .expect("Failed to create HTTP client"),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Fetcher for HttpFetcher {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchError> {
        debug!("GET {} (timeout {:?})", url, timeout);

        let map_err = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                    timeout,
                }
            } else {
                FetchError::Network(e)
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_err)?;

        let status = response.status();
        if !status.is_success() {
            warn!("{} returned status {}", url, status);
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(map_err)?;
        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn get_returns_body_of_successful_response() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/guide/ena.html")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<p>Version 2.6.0</p>")
            .create_async()
            .await;

        let fetcher = HttpFetcher::new();
        let body = fetcher
            .get(&format!("{}/guide/ena.html", server.url()), TIMEOUT)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(body, b"<p>Version 2.6.0</p>");
    }

    #[tokio::test]
    async fn get_returns_status_error_for_not_found() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/missing.zip")
            .with_status(404)
            .create_async()
            .await;

        let fetcher = HttpFetcher::new();
        let result = fetcher
            .get(&format!("{}/missing.zip", server.url()), TIMEOUT)
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(FetchError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn get_returns_network_error_for_unreachable_host() {
        let fetcher = HttpFetcher::new();
        let result = fetcher
            .get("http://127.0.0.1:1/unreachable", Duration::from_secs(2))
            .await;

        assert!(result.is_err());
        assert!(!matches!(result, Err(FetchError::Status { .. })));
    }
}
