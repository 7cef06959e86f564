use serde::Serialize;

use crate::render::PageImage;

/// Smallest presentation zoom.
pub const MIN_ZOOM: f32 = 0.5;

/// Largest presentation zoom.
pub const MAX_ZOOM: f32 = 3.0;

/// Zoom change per step.
pub const ZOOM_STEP: f32 = 0.25;

/// Vertical gap between stacked pages, in display pixels.
pub const DEFAULT_PAGE_GAP: u32 = 16;

/// Where one page sits in a vertical scroll view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlacedPage {
    pub page_number: u32,
    pub y: u64,
    pub width: u32,
    pub height: u32,
}

/// Stacks every rendered page vertically at a presentation-only zoom.
///
/// Zoom changes display sizes only; bitmaps are never re-rasterized. At zoom
/// 1.0 each page is fitted to the column width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollLayout {
    column_width: u32,
    zoom: f32,
    gap: u32,
}

impl ScrollLayout {
    pub fn new(column_width: u32) -> Self {
        Self {
            column_width: column_width.max(1),
            zoom: 1.0,
            gap: DEFAULT_PAGE_GAP,
        }
    }

    pub fn with_gap(mut self, gap: u32) -> Self {
        self.gap = gap;
        self
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    /// Set the zoom, clamped to `[MIN_ZOOM, MAX_ZOOM]`. NaN resets to 1.0.
    pub fn set_zoom(&mut self, zoom: f32) {
        self.zoom = if zoom.is_nan() {
            1.0
        } else {
            zoom.clamp(MIN_ZOOM, MAX_ZOOM)
        };
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    /// Display size of one page, preserving its aspect ratio.
    pub fn display_size(&self, image: &PageImage) -> (u32, u32) {
        let width = (self.column_width as f64 * self.zoom as f64).round().max(1.0);
        let aspect = image.height() as f64 / image.width().max(1) as f64;
        let height = (width * aspect).round().max(1.0);
        (width as u32, height as u32)
    }

    /// Positions of all pages, top to bottom.
    pub fn place(&self, images: &[PageImage]) -> Vec<PlacedPage> {
        let mut y = 0u64;
        images
            .iter()
            .map(|image| {
                let (width, height) = self.display_size(image);
                let placed = PlacedPage {
                    page_number: image.page_number(),
                    y,
                    width,
                    height,
                };
                y += height as u64 + self.gap as u64;
                placed
            })
            .collect()
    }

    /// Height of the whole stack.
    pub fn total_height(&self, images: &[PageImage]) -> u64 {
        let pages: u64 = images
            .iter()
            .map(|image| self.display_size(image).1 as u64)
            .sum();
        let gaps = images.len().saturating_sub(1) as u64 * self.gap as u64;
        pages + gaps
    }

    /// Page visible at scroll offset `y`: the last page starting at or above it.
    pub fn page_at(&self, images: &[PageImage], y: u64) -> Option<u32> {
        self.place(images)
            .into_iter()
            .take_while(|placed| placed.y <= y)
            .last()
            .map(|placed| placed.page_number)
    }
}
