//! Render layer.
//!
//! Turns an opened document into an ordered stream of PNG page images and
//! folds that stream into a live [`RenderState`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │      RenderSession (watch<State>)       │
//! │   generation check on every write       │
//! └────────────────────┬────────────────────┘
//!                      │ RenderEvent (bounded mpsc)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            RenderPipeline               │
//! │  open → page 1 → page 2 → … → Done      │
//! └────────────────────┬────────────────────┘
//!                      │ one page at a time
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            PageRasterizer               │
//! │  ┌──────────┐ ┌──────────┐ ┌─────────┐  │
//! │  │ Viewport │ │ Surface  │ │   PNG   │  │
//! │  │ (scale)  │ │ (scoped) │ │ encoder │  │
//! │  └──────────┘ └──────────┘ └─────────┘  │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │         PageSource (document)           │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`RenderPipeline`]: Opens a document and renders its pages in order
//! - [`RenderRun`]: Event stream and task handle of one run
//! - [`RenderSession`]: Live state with supersession of older runs
//! - [`PageRasterizer`]: Renders one page; failures are isolated to that page
//! - [`Viewport`]: Scale and pixel size selection
//! - [`RenderSurface`]: Single-use pixel buffer
//! - [`PngPageEncoder`]: Lossless output encoding
//!
//! # Example
//!
//! ```no_run
//! use folio::document::{LoaderConfig, PdfiumLoader};
//! use folio::render::{PipelineConfig, RenderPipeline, RenderRequest};
//!
//! #[tokio::main]
//! async fn main() {
//!     let loader = PdfiumLoader::new(LoaderConfig::default()).unwrap();
//!     let pipeline = RenderPipeline::new(loader, PipelineConfig::default());
//!
//!     let state = pipeline
//!         .render_all(RenderRequest::new("https://example.com/report.pdf"))
//!         .await;
//!
//!     for image in &state.images {
//!         println!("page {}: {}x{}", image.page_number(), image.width(), image.height());
//!     }
//! }
//! ```

mod encoder;
mod pipeline;
mod rasterizer;
mod session;
mod state;
mod surface;
mod viewport;

pub use encoder::PngPageEncoder;
pub use pipeline::{
    PipelineConfig, RenderEvent, RenderPipeline, RenderRun, RunOutcome, DEFAULT_EVENT_BUFFER,
    DEFAULT_OPEN_TIMEOUT,
};
pub use rasterizer::{PageRasterizer, RasterConfig, DEFAULT_PAGE_TIMEOUT};
pub use session::RenderSession;
pub use state::{progress_percent, PageImage, RenderRequest, RenderState};
pub use surface::{RenderSurface, BACKGROUND, DEFAULT_MAX_SURFACE_PIXELS};
pub use viewport::{compute_scale, Viewport, DEFAULT_DISPLAY_DENSITY, MAX_SCALE, MIN_TARGET_WIDTH};
