//! reqwest adapter downloading exam guidelines.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use reqwest::{Client, Url};
use tracing::debug;

use crate::domain::ports::{DocumentFetchError, DocumentFetcher, FetchedDocument};

/// Largest body accepted from a source.
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;
/// Some prefectural sites refuse clients that do not look like browsers.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Whether a download should be treated as PDF.
///
/// The content type wins; a `.pdf` path is enough when the server sends a
/// generic type.
pub fn is_pdf(url: &Url, content_type: Option<&str>) -> bool {
    let mime = content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase());
    match mime.as_deref() {
        Some("application/pdf") => true,
        Some("text/html" | "application/xhtml+xml") => false,
        _ => url.path().to_ascii_lowercase().ends_with(".pdf"),
    }
}

/// Fetcher backed by a shared reqwest client.
pub struct HttpDocumentFetcher {
    client: Client,
    limit_bytes: usize,
}

impl HttpDocumentFetcher {
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, DocumentFetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|err| DocumentFetchError::transport(err.to_string()))?;
        Ok(Self {
            client,
            limit_bytes: MAX_DOCUMENT_BYTES,
        })
    }
}

#[async_trait]
impl DocumentFetcher for HttpDocumentFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, DocumentFetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| DocumentFetchError::transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(DocumentFetchError::status(status.as_u16()));
        }
        let too_large = DocumentFetchError::too_large(self.limit_bytes);
        if response
            .content_length()
            .is_some_and(|length| length > self.limit_bytes as u64)
        {
            return Err(too_large);
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value: &HeaderValue| value.to_str().ok())
            .map(str::to_owned);

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|err| DocumentFetchError::transport(err.to_string()))?
        {
            if body.len() + chunk.len() > self.limit_bytes {
                return Err(too_large);
            }
            body.extend_from_slice(&chunk);
        }
        debug!(
            host = url.host_str().unwrap_or_default(),
            bytes = body.len(),
            "document downloaded"
        );

        if is_pdf(url, content_type.as_deref()) {
            Ok(FetchedDocument::Pdf(body))
        } else {
            Ok(FetchedDocument::Html(
                String::from_utf8_lossy(&body).into_owned(),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::declared("https://a.jp/download?id=3", Some("application/pdf"), true)]
    #[case::declared_with_params("https://a.jp/x", Some("Application/PDF; qs=1"), true)]
    #[case::html_wins("https://a.jp/guide.pdf", Some("text/html; charset=utf-8"), false)]
    #[case::extension("https://a.jp/YOUKOU.PDF", Some("application/octet-stream"), true)]
    #[case::no_type("https://a.jp/page", None, false)]
    fn classifies_documents(
        #[case] url: &str,
        #[case] content_type: Option<&str>,
        #[case] expected: bool,
    ) {
        let url = Url::parse(url).expect("url");
        assert_eq!(is_pdf(&url, content_type), expected);
    }
}
