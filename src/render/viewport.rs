//! Resolution selection for page rasterization.
//!
//! A page of intrinsic width `w` points is rendered at
//!
//! ```text
//! target = max(MIN_TARGET_WIDTH, w * density)
//! scale  = min(target / w, MAX_SCALE)
//! ```
//!
//! The floor keeps small pages legible, the density term sharpens output for
//! high-density displays, and the cap bounds per-page memory and CPU.

use crate::document::PageSize;
use crate::error::PageRenderError;

/// Minimum target pixel width.
pub const MIN_TARGET_WIDTH: f32 = 1920.0;

/// Upper bound on the scale multiplier.
pub const MAX_SCALE: f32 = 4.0;

/// Display density used when there is no physical display.
pub const DEFAULT_DISPLAY_DENSITY: f32 = 2.0;

/// Compute the render scale for a page of the given intrinsic width.
///
/// Densities below 1.0 (or NaN) are treated as 1.0 so the result is always
/// within `[1.0, MAX_SCALE]` for positive widths.
pub fn compute_scale(intrinsic_width: f32, display_density: f32) -> f32 {
    let density = display_density.max(1.0);
    let target_width = MIN_TARGET_WIDTH.max(intrinsic_width * density);
    (target_width / intrinsic_width).min(MAX_SCALE)
}

/// Scale and pixel size of one rendered page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub scale: f32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    /// Build the viewport for a page.
    ///
    /// # Errors
    ///
    /// `PageRenderError::InvalidGeometry` for non-finite or non-positive sizes.
    pub fn for_page(size: PageSize, display_density: f32) -> Result<Self, PageRenderError> {
        if !size.is_valid() {
            return Err(PageRenderError::InvalidGeometry {
                width: size.width,
                height: size.height,
            });
        }

        let scale = compute_scale(size.width, display_density);

        Ok(Self {
            scale,
            width: to_pixels(size.width * scale),
            height: to_pixels(size.height * scale),
        })
    }

    /// Number of pixels in the viewport.
    pub fn pixel_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

#[inline]
fn to_pixels(value: f32) -> u32 {
    value.round().clamp(1.0, u32::MAX as f32) as u32
}
