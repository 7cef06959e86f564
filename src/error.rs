use std::time::Duration;

use thiserror::Error;

/// I/O errors that can occur when reading document bytes
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// Non-success HTTP response
    #[error("HTTP error: {status} from {url}")]
    Http { status: u16, url: String },

    /// Requested range exceeds resource bounds
    #[error("Range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Network or connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Resource not found
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Local filesystem error
    #[error("File error: {0}")]
    File(String),
}

/// Fatal errors that abort a whole render run.
///
/// Every way a document can fail to open collapses into this enum. It is
/// `Clone` because it is carried inside the live [`RenderState`].
///
/// [`RenderState`]: crate::render::RenderState
#[derive(Debug, Clone, Error)]
pub enum DocumentLoadError {
    /// I/O error while fetching the document
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// The locator is neither an http(s) URL, a file URL nor a path
    #[error("Unsupported locator: {0}")]
    UnsupportedLocator(String),

    /// The leading bytes do not contain a `%PDF-` marker
    #[error("Invalid PDF header: {reason}")]
    InvalidHeader { reason: String },

    /// The document requires a password
    #[error("Document is encrypted")]
    Encrypted,

    /// The engine rejected the document structure
    #[error("Malformed document: {0}")]
    Malformed(String),

    /// The rendering engine is unavailable or failed
    #[error("Engine error: {0}")]
    Engine(String),

    /// Opening the document took too long
    #[error("Timed out opening document after {0:?}")]
    Timeout(Duration),
}

/// Errors confined to a single page.
///
/// These never abort a run: the rasterizer logs them and the page is omitted.
#[derive(Debug, Clone, Error)]
pub enum PageRenderError {
    /// Page number outside `1..=page_count`
    #[error("Invalid page {page_number}: document has {page_count} pages")]
    InvalidPage { page_number: u32, page_count: u32 },

    /// Page reports a non-positive or non-finite size
    #[error("Invalid page geometry: {width}x{height} pt")]
    InvalidGeometry { width: f32, height: f32 },

    /// The scaled viewport would exceed the surface ceiling
    #[error("Surface too large: {width}x{height} px exceeds {max_pixels} pixels")]
    SurfaceTooLarge {
        width: u32,
        height: u32,
        max_pixels: u64,
    },

    /// Drawing page content failed
    #[error("Draw failed: {message}")]
    Draw { message: String },

    /// PNG encoding failed
    #[error("Encode failed: {message}")]
    Encode { message: String },

    /// Rasterization exceeded the per-page timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),

    /// The engine thread is gone
    #[error("Engine error: {0}")]
    Engine(String),
}
