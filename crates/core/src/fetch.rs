//! HTTP fetching for link pages and their images.
//!
//! Pages are fetched as text for Open Graph scraping; images are fetched as
//! raw bytes and decoded by the edition renderer.

use std::time::Duration;

use reqwest::{Client, Response};
use tracing::{debug, warn};
use url::Url;

use crate::{PortadaError, Result};

/// HTTP client configuration for fetching web pages and images.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
    /// Skip TLS certificate verification.
    pub accept_invalid_certs: bool,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: 15,
            user_agent: "Mozilla/5.0 (compatible; Portada/0.3)".to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl FetchConfig {
    fn client(&self) -> Result<Client> {
        if self.accept_invalid_certs {
            warn!("TLS certificate verification disabled");
        }
        Client::builder()
            .timeout(Duration::from_secs(self.timeout))
            .danger_accept_invalid_certs(self.accept_invalid_certs)
            .build()
            .map_err(PortadaError::HttpError)
    }

    fn map_send_error(&self, e: reqwest::Error) -> PortadaError {
        if e.is_timeout() { PortadaError::Timeout { timeout: self.timeout } } else { PortadaError::HttpError(e) }
    }
}

/// Validates `url` as an absolute http(s) URL.
pub fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim()).map_err(|e| PortadaError::InvalidUrl(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(PortadaError::InvalidUrl(format!("unsupported scheme `{}` (expected http or https)", other))),
    }
}

async fn get(url: &str, config: &FetchConfig, accept: &str) -> Result<Response> {
    let parsed = parse_url(url)?;
    debug!(url = %parsed, "fetching");

    let response = config
        .client()?
        .get(parsed)
        .header("User-Agent", &config.user_agent)
        .header("Accept", accept)
        .header("Accept-Language", "es-ES,es;q=0.9,en;q=0.8")
        .send()
        .await
        .map_err(|e| config.map_send_error(e))?;

    Ok(response.error_for_status()?)
}

/// Fetches HTML content from a URL.
///
/// Follows redirects, respects the configured timeout and turns non-success
/// status codes into [`PortadaError::HttpError`].
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let response = get(url, config, "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8").await?;
    Ok(response.text().await?)
}

/// Fetches a URL as raw bytes, typically an image.
pub async fn fetch_bytes(url: &str, config: &FetchConfig) -> Result<Vec<u8>> {
    let response = get(url, config, "image/avif,image/webp,image/*,*/*;q=0.8").await?;
    Ok(response.bytes().await?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.timeout, 15);
        assert!(config.user_agent.contains("Portada"));
        assert!(!config.accept_invalid_certs);
    }

    #[test]
    fn test_fetch_url_invalid() {
        let config = FetchConfig::default();
        let result = std::thread::spawn(move || {
            tokio::runtime::Runtime::new()
                .unwrap()
                .block_on(fetch_url("not-a-url", &config))
        })
        .join()
        .unwrap();

        assert!(matches!(result, Err(PortadaError::InvalidUrl(_))));
    }

    #[test]
    fn test_parse_url_schemes() {
        assert!(parse_url("http://example.com").is_ok());
        assert!(parse_url("  https://example.com/nota  ").is_ok());
        assert!(matches!(parse_url("example.com"), Err(PortadaError::InvalidUrl(_))));
        assert!(matches!(parse_url("ftp://example.com/file"), Err(PortadaError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn test_fetch_bytes_invalid() {
        let result = fetch_bytes("file:///etc/passwd", &FetchConfig::default()).await;
        assert!(matches!(result, Err(PortadaError::InvalidUrl(_))));
    }
}
