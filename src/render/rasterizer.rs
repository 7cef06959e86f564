use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use super::encoder::PngPageEncoder;
use super::state::PageImage;
use super::surface::{RenderSurface, BACKGROUND, DEFAULT_MAX_SURFACE_PIXELS};
use super::viewport::{Viewport, DEFAULT_DISPLAY_DENSITY};
use crate::document::PageSource;
use crate::error::PageRenderError;

/// Default per-page rasterization timeout.
pub const DEFAULT_PAGE_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for page rasterization.
#[derive(Debug, Clone)]
pub struct RasterConfig {
    /// Display density multiplier (device pixels per logical pixel)
    pub display_density: f32,

    /// Upper bound on one page's rasterization, encode included
    pub page_timeout: Duration,

    /// Largest surface, in pixels, a single page may allocate
    pub max_surface_pixels: u64,
}

impl Default for RasterConfig {
    fn default() -> Self {
        Self {
            display_density: DEFAULT_DISPLAY_DENSITY,
            page_timeout: DEFAULT_PAGE_TIMEOUT,
            max_surface_pixels: DEFAULT_MAX_SURFACE_PIXELS,
        }
    }
}

impl RasterConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.display_density.is_finite() || self.display_density < 1.0 {
            return Err(format!(
                "display density must be a finite number >= 1.0, got {}",
                self.display_density
            ));
        }
        if self.page_timeout.is_zero() {
            return Err("page timeout must be greater than 0".to_string());
        }
        if self.max_surface_pixels == 0 {
            return Err("max surface pixels must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Renders single pages into PNG images.
///
/// Every failure is confined to its page: [`render`](Self::render) logs it
/// and returns `None`, so one bad page never aborts a document.
#[derive(Debug, Clone, Default)]
pub struct PageRasterizer {
    config: RasterConfig,
    encoder: PngPageEncoder,
}

impl PageRasterizer {
    pub fn new(config: RasterConfig) -> Self {
        Self {
            config,
            encoder: PngPageEncoder::new(),
        }
    }

    pub fn config(&self) -> &RasterConfig {
        &self.config
    }

    /// Render one page, or `None` if it could not be rendered.
    pub async fn render<D>(&self, document: &D, page_number: u32) -> Option<PageImage>
    where
        D: PageSource + ?Sized,
    {
        let started = Instant::now();

        let result = match timeout(
            self.config.page_timeout,
            self.try_render(document, page_number),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PageRenderError::Timeout(self.config.page_timeout)),
        };

        match result {
            Ok(image) => {
                debug!(
                    page_number,
                    width = image.width(),
                    height = image.height(),
                    bytes = image.image_data().len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "rendered page"
                );
                Some(image)
            }
            Err(e) => {
                warn!(page_number, error = %e, "failed to render page, skipping");
                None
            }
        }
    }

    /// Render one page, surfacing the error.
    ///
    /// Not bounded by the page timeout.
    pub async fn try_render<D>(
        &self,
        document: &D,
        page_number: u32,
    ) -> Result<PageImage, PageRenderError>
    where
        D: PageSource + ?Sized,
    {
        let page_count = document.page_count();
        if page_number == 0 || page_number > page_count {
            return Err(PageRenderError::InvalidPage {
                page_number,
                page_count,
            });
        }

        let size = document.page_size(page_number).await?;
        let viewport = Viewport::for_page(size, self.config.display_density)?;

        let mut surface = RenderSurface::allocate(&viewport, self.config.max_surface_pixels)?;
        surface.fill(BACKGROUND);

        // On error the surface is dropped here
        document.draw(page_number, &viewport, &mut surface).await?;

        let encoder = self.encoder.clone();
        let (width, height) = (surface.width(), surface.height());
        let image_data = tokio::task::spawn_blocking(move || {
            let encoded = encoder.encode(surface.image());
            drop(surface);
            encoded
        })
        .await
        .map_err(|e| PageRenderError::Encode {
            message: format!("encoder task failed: {}", e),
        })??;

        Ok(PageImage::new(page_number, image_data, width, height))
    }
}
