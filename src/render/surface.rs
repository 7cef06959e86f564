use image::{Rgba, RgbaImage};
use tracing::trace;

use super::viewport::Viewport;
use crate::error::PageRenderError;

/// Opaque white, used as the page background.
pub const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Default ceiling for a single surface: 100 megapixels (400MB of RGBA).
pub const DEFAULT_MAX_SURFACE_PIXELS: u64 = 100_000_000;

/// Single-use pixel buffer for one page.
///
/// A surface is allocated per page and dropped as soon as the page is
/// encoded; surfaces are never pooled, so peak memory does not grow with
/// document length.
pub struct RenderSurface {
    image: RgbaImage,
}

impl RenderSurface {
    /// Allocate a surface sized to the viewport.
    ///
    /// # Errors
    ///
    /// `PageRenderError::SurfaceTooLarge` if the viewport exceeds `max_pixels`.
    pub fn allocate(viewport: &Viewport, max_pixels: u64) -> Result<Self, PageRenderError> {
        if viewport.pixel_count() > max_pixels {
            return Err(PageRenderError::SurfaceTooLarge {
                width: viewport.width,
                height: viewport.height,
                max_pixels,
            });
        }

        trace!(
            width = viewport.width,
            height = viewport.height,
            "allocating render surface"
        );

        Ok(Self {
            image: RgbaImage::new(viewport.width, viewport.height),
        })
    }

    /// Fill every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.image.pixels_mut() {
            *pixel = color;
        }
    }

    /// Alpha-composite `layer` over the surface, anchored at the top-left.
    ///
    /// Layers larger than the surface are clipped.
    pub fn composite(&mut self, layer: &RgbaImage) {
        image::imageops::overlay(&mut self.image, layer, 0, 0);
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Borrow the pixel buffer.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Mutable access for backends that draw directly into the buffer.
    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }
}

impl Drop for RenderSurface {
    fn drop(&mut self) {
        trace!(
            width = self.image.width(),
            height = self.image.height(),
            "released render surface"
        );
    }
}
