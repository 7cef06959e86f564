use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use reqwest::Client;
use url::Url;

use crate::error::DocumentLoadError;
use crate::io::{FileRangeReader, HttpRangeReader, RangeReader};

/// Where a document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// `http://` or `https://` URL, read with range requests
    Http(Url),

    /// Local file, from a `file://` URL or a bare path
    File(PathBuf),
}

impl Locator {
    /// Parse a locator string.
    ///
    /// # Errors
    ///
    /// `DocumentLoadError::UnsupportedLocator` for empty input, unknown
    /// schemes and `file://` URLs that do not map to a local path.
    pub fn parse(locator: &str) -> Result<Self, DocumentLoadError> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(DocumentLoadError::UnsupportedLocator(
                "empty locator".to_string(),
            ));
        }

        match Url::parse(trimmed) {
            Ok(url) => match url.scheme() {
                "http" | "https" => Ok(Locator::Http(url)),
                "file" => url
                    .to_file_path()
                    .map(Locator::File)
                    .map_err(|_| DocumentLoadError::UnsupportedLocator(trimmed.to_string())),
                // Windows drive letters parse as one-letter schemes
                scheme if scheme.len() == 1 => Ok(Locator::File(PathBuf::from(trimmed))),
                _ => Err(DocumentLoadError::UnsupportedLocator(trimmed.to_string())),
            },
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                Ok(Locator::File(PathBuf::from(trimmed)))
            }
            Err(_) => Err(DocumentLoadError::UnsupportedLocator(trimmed.to_string())),
        }
    }

    /// Open a range reader for the document.
    pub async fn open_reader(
        &self,
        client: &Client,
    ) -> Result<Arc<dyn RangeReader>, DocumentLoadError> {
        match self {
            Locator::Http(url) => {
                let reader = HttpRangeReader::new(client.clone(), url.as_str()).await?;
                Ok(Arc::new(reader))
            }
            Locator::File(path) => {
                let reader = FileRangeReader::open(path).await?;
                Ok(Arc::new(reader))
            }
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Http(url) => write!(f, "{}", url),
            Locator::File(path) => write!(f, "{}", path.display()),
        }
    }
}
