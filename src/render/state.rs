//! Render request, page images and the live aggregate state.

use bytes::Bytes;
use tracing::warn;

use super::pipeline::RenderEvent;
use crate::error::DocumentLoadError;

/// Identifies the document to render. A new request always starts a new run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub source_locator: String,
}

impl RenderRequest {
    pub fn new(source_locator: impl Into<String>) -> Self {
        Self {
            source_locator: source_locator.into(),
        }
    }
}

/// One rendered page. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    page_number: u32,
    image_data: Bytes,
    width: u32,
    height: u32,
}

impl PageImage {
    pub fn new(page_number: u32, image_data: Bytes, width: u32, height: u32) -> Self {
        Self {
            page_number,
            image_data,
            width,
            height,
        }
    }

    /// 1-based page number.
    pub fn page_number(&self) -> u32 {
        self.page_number
    }

    /// PNG-encoded bitmap.
    pub fn image_data(&self) -> &Bytes {
        &self.image_data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

/// `round(page_number / total_pages * 100)`, computed in integers.
///
/// An empty document is complete by definition.
pub fn progress_percent(page_number: u32, total_pages: u32) -> u8 {
    if total_pages == 0 {
        return 100;
    }
    let page_number = page_number.min(total_pages) as u64;
    let total = total_pages as u64;
    ((page_number * 100 + total / 2) / total) as u8
}

/// Aggregate state of one render run, as observed by consumers.
///
/// Only [`RenderState::apply`] mutates a live state; it keeps `images`
/// strictly ascending and `progress_percent` monotonic even if handed
/// events out of order.
#[derive(Debug, Clone)]
pub struct RenderState {
    /// Locator of the run this state belongs to (`None` when idle)
    pub source_locator: Option<String>,

    /// Increases with every submitted request; used to discard stale writes
    pub generation: u64,

    pub total_pages: u32,
    pub images: Vec<PageImage>,
    pub loading: bool,
    pub error: Option<DocumentLoadError>,
    pub progress_percent: u8,
}

impl RenderState {
    /// State before any request was made.
    pub fn idle() -> Self {
        Self {
            source_locator: None,
            generation: 0,
            total_pages: 0,
            images: Vec::new(),
            loading: false,
            error: None,
            progress_percent: 0,
        }
    }

    /// Fresh state for a newly submitted request.
    pub fn loading(request: &RenderRequest, generation: u64) -> Self {
        Self {
            source_locator: Some(request.source_locator.clone()),
            generation,
            total_pages: 0,
            images: Vec::new(),
            loading: true,
            error: None,
            progress_percent: 0,
        }
    }

    /// Run finished without a fatal error.
    pub fn is_done(&self) -> bool {
        !self.loading && self.error.is_none() && self.source_locator.is_some()
    }

    /// Run ended with a fatal load error.
    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Page numbers that were attempted but produced no image.
    ///
    /// Only meaningful once the run is done.
    pub fn missing_pages(&self) -> Vec<u32> {
        let mut rendered = self.images.iter().map(PageImage::page_number).peekable();
        (1..=self.total_pages)
            .filter(|page| {
                while rendered.next_if(|p| p < page).is_some() {}
                rendered.next_if_eq(page).is_none()
            })
            .collect()
    }

    /// Fold one pipeline event into the state.
    pub fn apply(&mut self, event: RenderEvent) {
        match event {
            RenderEvent::Loaded { total_pages } => {
                self.total_pages = total_pages;
            }
            RenderEvent::PageRendered(image) => {
                let page_number = image.page_number();
                let in_order = self
                    .images
                    .last()
                    .map_or(true, |last| page_number > last.page_number());

                if page_number == 0 || page_number > self.total_pages || !in_order {
                    warn!(
                        page_number,
                        total_pages = self.total_pages,
                        "dropping out-of-order page image"
                    );
                    return;
                }
                self.images.push(image);
            }
            RenderEvent::Progress { percent, .. } => {
                self.progress_percent = self.progress_percent.max(percent.min(100));
            }
            RenderEvent::Done => {
                self.loading = false;
                self.error = None;
                self.progress_percent = 100;
            }
            RenderEvent::Failed(error) => {
                self.loading = false;
                self.images.clear();
                self.error = Some(error);
            }
        }
    }
}

impl Default for RenderState {
    fn default() -> Self {
        Self::idle()
    }
}
