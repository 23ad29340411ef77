//! PDF download: one bounded GET per row, bytes kept in memory.
//!
//! The bytes are handed to the extractor by value and dropped as soon as
//! the row's extraction finishes, so a long sweep never holds more than one
//! document at a time.

use crate::error::{EnrichError, RowError};
use futures::future::BoxFuture;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// The collaborator that turns a URL into PDF bytes.
pub trait PdfFetcher: Send + Sync {
    /// Download `url`, giving up after `timeout`.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, RowError>>;
}

/// Check if the input string looks like a URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// reqwest-backed fetcher.
#[derive(Clone)]
pub struct HttpPdfFetcher {
    client: Client,
}

impl HttpPdfFetcher {
    /// Build a client that sends `user_agent` with every request.
    pub fn new(user_agent: &str) -> Result<Self, EnrichError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| EnrichError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn download(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, RowError> {
        if !is_url(url) {
            return Err(RowError::DownloadFailed {
                url: url.to_string(),
                reason: "not an HTTP/HTTPS URL".into(),
            });
        }

        info!("Downloading PDF from: {}", url);

        let map_send_err = |e: reqwest::Error| {
            if e.is_timeout() {
                RowError::DownloadTimeout {
                    url: url.to_string(),
                    secs: timeout.as_secs(),
                }
            } else {
                RowError::DownloadFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            }
        };

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_send_err)?;

        if !response.status().is_success() {
            return Err(RowError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(map_send_err)?;
        check_pdf_magic(url, &bytes)?;

        debug!("Downloaded {} bytes from {}", bytes.len(), url);
        Ok(bytes.to_vec())
    }
}

impl PdfFetcher for HttpPdfFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<Vec<u8>, RowError>> {
        Box::pin(self.download(url, timeout))
    }
}

/// Reject bodies that are obviously not a PDF (HTML error pages, redirects
/// to landing pages) before pdfium sees them.
fn check_pdf_magic(url: &str, bytes: &[u8]) -> Result<(), RowError> {
    if bytes.len() >= 4 && &bytes[..4] != b"%PDF" {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&bytes[..4]);
        return Err(RowError::NotAPdf {
            url: url.to_string(),
            magic,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_url() {
        assert!(is_url("https://example.com/ir2024.pdf"));
        assert!(is_url("http://example.com/ir2024.pdf"));
        assert!(!is_url("/tmp/ir2024.pdf"));
        assert!(!is_url(""));
    }

    #[test]
    fn html_body_is_not_a_pdf() {
        let err = check_pdf_magic("https://x", b"<!DOCTYPE html>").unwrap_err();
        assert!(matches!(err, RowError::NotAPdf { magic, .. } if &magic == b"<!DO"));
        assert!(check_pdf_magic("https://x", b"%PDF-1.7\n").is_ok());
    }

    #[tokio::test]
    async fn non_http_url_fails_without_network() {
        let fetcher = HttpPdfFetcher::new("Mozilla/5.0").unwrap();
        let err = fetcher
            .fetch("ftp://example.com/a.pdf", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, RowError::DownloadFailed { .. }));
    }
}
