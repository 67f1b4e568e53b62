//! HTTP client for talking to a running Cartkeep server.

use std::time::Duration;

use anyhow::Result;
use cartkeep_server::HealthResponse;
use reqwest::Url;

/// Request timeout for CLI calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// HTTP client for the Cartkeep server.
pub struct Client {
    base_url: Url,
    http: reqwest::Client,
}

impl Client {
    /// Create a new client for the given server URL.
    pub fn new(base_url: &str) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { base_url, http })
    }

    /// Check server health.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = self.base_url.join("/health")?;

        let response = self.http.get(url).send().await?;

        if !response.status().is_success() {
            anyhow::bail!("Server returned error: {}", response.status());
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_url() {
        assert!(Client::new("not a url").is_err());
        assert!(Client::new("http://localhost:8080").is_ok());
    }
}
