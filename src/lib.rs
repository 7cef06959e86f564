//! # folio
//!
//! Progressive PDF page rasterization.
//!
//! This library turns a document locator (a local path or an http(s) URL)
//! into an ordered stream of lossless PNG page images. Remote documents are
//! read with HTTP range requests, so rendering can start before the whole
//! file has been downloaded.
//!
//! ## Features
//!
//! - **Range-based streaming**: Reads only the bytes the PDF engine asks for, through a block cache
//! - **Progressive output**: Pages are emitted one at a time, in order, with progress events
//! - **Failure isolation**: A page that cannot be rendered is skipped; the run continues
//! - **Supersession**: Submitting a new document discards every later write from the old one
//! - **Bounded resources**: Per-page surfaces, page and open timeouts, a surface ceiling
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`io`] - Range readers (HTTP, local file), block caching and a blocking bridge
//! - [`mod@format`] - PDF header sniffing
//! - [`document`] - Document loading and the pdfium engine
//! - [`render`] - Rasterizer, pipeline, live render state
//! - [`viewer`] - Read-only slideshow and scroll helpers
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use folio::{LoaderConfig, PdfiumLoader, PipelineConfig, RenderPipeline, RenderRequest, RenderSession};
//!
//! #[tokio::main]
//! async fn main() {
//!     let loader = PdfiumLoader::new(LoaderConfig::default()).unwrap();
//!     let session = RenderSession::new(RenderPipeline::new(loader, PipelineConfig::default()));
//!
//!     let mut updates = session.subscribe();
//!     let generation = session.submit(RenderRequest::new("https://example.com/report.pdf"));
//!
//!     while updates.changed().await.is_ok() {
//!         let state = updates.borrow_and_update().clone();
//!         println!("{}% ({} pages ready)", state.progress_percent, state.images.len());
//!         if state.generation == generation && !state.loading {
//!             break;
//!         }
//!     }
//! }
//! ```

pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod io;
pub mod render;
pub mod viewer;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, InspectConfig, RenderConfig};
pub use document::{
    DocumentLoader, LibrarySearch, LoaderConfig, Locator, PageSize, PageSource, PdfEngine,
    PdfiumDocument, PdfiumLoader,
};
pub use error::{DocumentLoadError, IoError, PageRenderError};
pub use format::{sniff_document, DocumentSniff, PdfVersion};
pub use io::{BlockCache, FileRangeReader, HttpRangeReader, RangeReader};
pub use render::{
    PageImage, PageRasterizer, PipelineConfig, RasterConfig, RenderEvent, RenderPipeline,
    RenderRequest, RenderRun, RenderSession, RenderState, RunOutcome, Viewport,
};
pub use viewer::{ScrollLayout, SlideshowCursor};
