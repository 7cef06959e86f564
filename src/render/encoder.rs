//! Lossless page encoder.
//!
//! Surfaces are always opaque (filled with white before drawing), so pages are
//! written as 8-bit RGB PNG at the strongest compression level. PNG is
//! lossless; the compression level only trades CPU for size.

use std::io::Cursor;

use bytes::Bytes;
use image::buffer::ConvertBuffer;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ExtendedColorType, ImageEncoder, ImageFormat, ImageReader, RgbImage, RgbaImage};

use crate::error::PageRenderError;

/// PNG encoder for rendered pages.
#[derive(Debug, Clone, Default)]
pub struct PngPageEncoder {}

impl PngPageEncoder {
    pub fn new() -> Self {
        Self {}
    }

    /// Encode a page bitmap as PNG.
    ///
    /// # Errors
    ///
    /// `PageRenderError::Encode` if the image is empty or encoding fails.
    pub fn encode(&self, image: &RgbaImage) -> Result<Bytes, PageRenderError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PageRenderError::Encode {
                message: "cannot encode an empty image".to_string(),
            });
        }

        let rgb: RgbImage = image.convert();

        let mut output = Vec::new();
        let encoder =
            PngEncoder::new_with_quality(&mut output, CompressionType::Best, FilterType::Adaptive);

        encoder
            .write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )
            .map_err(|e| PageRenderError::Encode {
                message: e.to_string(),
            })?;

        Ok(Bytes::from(output))
    }

    /// Read PNG dimensions without decoding pixel data.
    ///
    /// Returns `(width, height)` in pixels.
    pub fn dimensions(&self, png: &[u8]) -> Result<(u32, u32), PageRenderError> {
        let reader = ImageReader::with_format(Cursor::new(png), ImageFormat::Png);

        reader
            .into_dimensions()
            .map_err(|e| PageRenderError::Encode {
                message: e.to_string(),
            })
    }
}
