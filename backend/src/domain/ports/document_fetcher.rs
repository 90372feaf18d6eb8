//! Port for downloading published documents (exam guidelines and the like).

use async_trait::async_trait;
use url::Url;

use super::define_port_error;

define_port_error! {
    /// Errors raised by document fetchers.
    pub enum DocumentFetchError {
        /// The source could not be reached.
        Transport { message: String } => "document fetch failed: {message}",
        /// The source answered with a non-success status.
        Status { status: u16 } => "document source answered with status {status}",
        /// The body exceeds the accepted size.
        TooLarge { limit_bytes: usize } => "document exceeds {limit_bytes} bytes",
        /// No fetcher is configured.
        Unavailable => "document fetching is not available",
    }
}

/// A downloaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedDocument {
    /// Raw PDF bytes.
    Pdf(Vec<u8>),
    /// An HTML page decoded as UTF-8.
    Html(String),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentFetcher: Send + Sync {
    /// Download `url` and classify it as PDF or HTML.
    async fn fetch(&self, url: &Url) -> Result<FetchedDocument, DocumentFetchError>;
}

/// Stand-in used when outbound fetching is disabled.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineDocumentFetcher;

#[async_trait]
impl DocumentFetcher for OfflineDocumentFetcher {
    async fn fetch(&self, _url: &Url) -> Result<FetchedDocument, DocumentFetchError> {
        Err(DocumentFetchError::unavailable())
    }
}
