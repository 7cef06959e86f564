use async_trait::async_trait;
use serde::Serialize;

use crate::error::{DocumentLoadError, PageRenderError};
use crate::render::{RenderSurface, Viewport};

/// Intrinsic page size in points (1/72 inch) at unit scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Both dimensions are finite and positive.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// An opened document whose pages can be drawn.
///
/// Page numbers are 1-based. Implementations release their resources on
/// drop.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Number of pages; fixed for the lifetime of the document.
    fn page_count(&self) -> u32;

    /// Intrinsic size of a page.
    async fn page_size(&self, page_number: u32) -> Result<PageSize, PageRenderError>;

    /// Draw a page into `surface`, which is sized to `viewport` and already
    /// filled with the background.
    async fn draw(
        &self,
        page_number: u32,
        viewport: &Viewport,
        surface: &mut RenderSurface,
    ) -> Result<(), PageRenderError>;
}

/// Opens documents by locator.
///
/// Every failure mode (unreachable locator, bad header, parse failure,
/// encryption) is reported as a [`DocumentLoadError`]; a loader never hands
/// out a partially opened document.
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    type Document: PageSource + 'static;

    async fn open(&self, locator: &str) -> Result<Self::Document, DocumentLoadError>;
}

#[async_trait]
impl<L: DocumentLoader + ?Sized> DocumentLoader for std::sync::Arc<L> {
    type Document = L::Document;

    async fn open(&self, locator: &str) -> Result<Self::Document, DocumentLoadError> {
        (**self).open(locator).await
    }
}
