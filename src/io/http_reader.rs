use async_trait::async_trait;
use bytes::Bytes;
use http::header::{ACCEPT_RANGES, CONTENT_LENGTH, CONTENT_RANGE, RANGE};
use http::StatusCode;
use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::debug;

use super::range_reader::{check_range, RangeReader};
use crate::error::IoError;

/// HTTP-backed implementation of RangeReader.
///
/// Reads byte ranges from a document URL using `Range: bytes=a-b` requests.
/// The document size is fetched once on creation via HEAD, or via a
/// `Range: bytes=0-0` GET when HEAD is rejected. Servers that do not
/// advertise `Accept-Ranges: bytes` (or omit `Content-Length`) are read
/// with a single full GET on first access, and later reads slice that body.
pub struct HttpRangeReader {
    client: Client,
    url: String,
    size: u64,
    supports_ranges: bool,
    full_body: OnceCell<Bytes>,
}

impl HttpRangeReader {
    /// Create a new HttpRangeReader for the given URL.
    ///
    /// This performs a HEAD request to determine the document size and
    /// whether the server honours range requests. A HEAD answered with
    /// anything but success or 404 falls back to a one-byte ranged GET.
    pub async fn new(client: Client, url: impl Into<String>) -> Result<Self, IoError> {
        let url = url.into();

        let head = client
            .head(&url)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = head.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IoError::NotFound(url));
        }

        // HEAD is refused by some servers and by signed URLs scoped to GET
        if !status.is_success() {
            debug!(url = %url, status = status.as_u16(), "HEAD rejected, probing with a ranged GET");
            return Self::from_range_probe(client, url).await;
        }

        let size = head
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok());

        let accepts_bytes = head
            .headers()
            .get(ACCEPT_RANGES)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(',').any(|unit| unit.trim().eq_ignore_ascii_case("bytes")))
            .unwrap_or(false);

        let reader = Self {
            client,
            url,
            size: size.unwrap_or(0),
            supports_ranges: accepts_bytes && size.is_some(),
            full_body: OnceCell::new(),
        };

        if reader.supports_ranges {
            debug!(url = %reader.url, size = reader.size, "server supports range requests");
            Ok(reader)
        } else {
            debug!(url = %reader.url, "server does not support range requests, reading full body");
            reader.into_full_body_reader().await
        }
    }

    /// Whether reads are served by range requests.
    pub fn supports_ranges(&self) -> bool {
        self.supports_ranges
    }

    /// Get the document URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn from_range_probe(client: Client, url: String) -> Result<Self, IoError> {
        let resp = client
            .get(&url)
            .header(RANGE, "bytes=0-0")
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let mut reader = Self {
            client,
            url,
            size: 0,
            supports_ranges: false,
            full_body: OnceCell::new(),
        };

        match resp.status() {
            StatusCode::PARTIAL_CONTENT => {
                let total = resp
                    .headers()
                    .get(CONTENT_RANGE)
                    .and_then(|v| v.to_str().ok())
                    .and_then(content_range_total);

                match total {
                    Some(size) => {
                        debug!(url = %reader.url, size, "server supports range requests");
                        reader.size = size;
                        reader.supports_ranges = true;
                        Ok(reader)
                    }
                    None => reader.into_full_body_reader().await,
                }
            }
            StatusCode::OK => {
                // Range ignored: the response already carries the whole document
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| IoError::Connection(e.to_string()))?;
                reader.size = body.len() as u64;
                let _ = reader.full_body.set(body);
                Ok(reader)
            }
            StatusCode::NOT_FOUND => Err(IoError::NotFound(reader.url)),
            status => Err(IoError::Http {
                status: status.as_u16(),
                url: reader.url,
            }),
        }
    }

    async fn into_full_body_reader(mut self) -> Result<Self, IoError> {
        let body = self.fetch_full_body().await?;
        self.size = body.len() as u64;
        self.supports_ranges = false;
        // Freshly created, so the cell is empty
        let _ = self.full_body.set(body);
        Ok(self)
    }

    async fn fetch_full_body(&self) -> Result<Bytes, IoError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(IoError::NotFound(self.url.clone()));
        }
        if !status.is_success() {
            return Err(IoError::Http {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        resp.bytes()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))
    }

    async fn full_body(&self) -> Result<&Bytes, IoError> {
        self.full_body
            .get_or_try_init(|| self.fetch_full_body())
            .await
    }

    async fn fetch_range(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        // Build range header: "bytes=start-end" (inclusive on both ends)
        let range = format!("bytes={}-{}", offset, offset + len as u64 - 1);

        let resp = self
            .client
            .get(&self.url)
            .header(RANGE, range)
            .send()
            .await
            .map_err(|e| IoError::Connection(e.to_string()))?;

        match resp.status() {
            StatusCode::PARTIAL_CONTENT => {
                let data = resp
                    .bytes()
                    .await
                    .map_err(|e| IoError::Connection(e.to_string()))?;

                if data.len() != len {
                    return Err(IoError::Connection(format!(
                        "short range read from {}: expected {} bytes, got {}",
                        self.url,
                        len,
                        data.len()
                    )));
                }
                Ok(data)
            }
            StatusCode::OK => {
                // The server ignored the range and sent the whole document
                let body = resp
                    .bytes()
                    .await
                    .map_err(|e| IoError::Connection(e.to_string()))?;
                check_range(offset, len, body.len() as u64)?;
                let start = offset as usize;
                let slice = body.slice(start..start + len);
                let _ = self.full_body.set(body);
                Ok(slice)
            }
            StatusCode::NOT_FOUND => Err(IoError::NotFound(self.url.clone())),
            status => Err(IoError::Http {
                status: status.as_u16(),
                url: self.url.clone(),
            }),
        }
    }
}

#[async_trait]
impl RangeReader for HttpRangeReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        check_range(offset, len, self.size)?;

        // Handle zero-length reads
        if len == 0 {
            return Ok(Bytes::new());
        }

        if let Some(body) = self.full_body.get() {
            let start = offset as usize;
            return Ok(body.slice(start..start + len));
        }

        if !self.supports_ranges {
            let body = self.full_body().await?;
            let start = offset as usize;
            return Ok(body.slice(start..start + len));
        }

        self.fetch_range(offset, len).await
    }

    fn size(&self) -> u64 {
        self.size
    }

    fn identifier(&self) -> &str {
        &self.url
    }
}

/// Total length from a `Content-Range: bytes a-b/total` value.
///
/// `None` when the total is unknown (`*`) or the value is malformed.
fn content_range_total(value: &str) -> Option<u64> {
    let (unit, rest) = value.trim().split_once(' ')?;
    if !unit.eq_ignore_ascii_case("bytes") {
        return None;
    }
    let (_, total) = rest.split_once('/')?;
    total.trim().parse().ok()
}

/// Create the HTTP client used for document fetches.
pub fn create_http_client() -> Result<Client, IoError> {
    Client::builder()
        .user_agent(concat!("folio/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| IoError::Connection(e.to_string()))
}
