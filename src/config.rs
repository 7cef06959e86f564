//! Command-line configuration for folio.
//!
//! Every option can also be set through an environment variable with the
//! `FOLIO_` prefix:
//!
//! - `FOLIO_PDFIUM_DIR` - Directory containing the pdfium shared library
//! - `FOLIO_BLOCK_SIZE` - Block cache block size in bytes (default: 65536)
//! - `FOLIO_CACHE_BLOCKS` - Blocks cached per document (default: 256)
//! - `FOLIO_DISPLAY_DENSITY` - Display density multiplier (default: 2.0)
//! - `FOLIO_PAGE_TIMEOUT` - Per-page timeout in seconds (default: 60)
//! - `FOLIO_OPEN_TIMEOUT` - Document open timeout in seconds (default: 120)
//! - `FOLIO_MAX_SURFACE_PIXELS` - Largest page surface in pixels (default: 100000000)
//! - `FOLIO_OUT_DIR` - Output directory for `render`

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use crate::document::{LibrarySearch, LoaderConfig};
use crate::io::{DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE};
use crate::render::{
    PipelineConfig, RasterConfig, DEFAULT_DISPLAY_DENSITY, DEFAULT_EVENT_BUFFER,
    DEFAULT_MAX_SURFACE_PIXELS,
};

// =============================================================================
// Default Values
// =============================================================================

/// Default per-page timeout in seconds.
pub const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 60;

/// Default document open timeout in seconds.
pub const DEFAULT_OPEN_TIMEOUT_SECS: u64 = 120;

/// Default output directory for rendered pages.
pub const DEFAULT_OUT_DIR: &str = "pages";

// =============================================================================
// CLI Arguments
// =============================================================================

/// folio - progressive PDF page rasterization.
///
/// Renders every page of a PDF (local path or http(s) URL) to a lossless PNG,
/// streaming remote documents with HTTP range requests.
#[derive(Parser, Debug, Clone)]
#[command(name = "folio")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn into_command(self) -> Command {
        self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render every page of a document to PNG files
    Render(RenderConfig),

    /// Print document information and planned raster sizes
    Inspect(InspectConfig),

    /// Check that the pdfium library can be loaded (and optionally a locator)
    Check(CheckConfig),
}

/// Options locating the engine and sizing the read cache.
#[derive(Args, Debug, Clone)]
pub struct EngineOptions {
    /// Directory containing the pdfium shared library.
    #[arg(long, env = "FOLIO_PDFIUM_DIR")]
    pub pdfium_dir: Option<PathBuf>,

    /// Block size in bytes for the read cache.
    #[arg(long, default_value_t = DEFAULT_BLOCK_SIZE, env = "FOLIO_BLOCK_SIZE")]
    pub block_size: usize,

    /// Maximum number of blocks cached per document.
    #[arg(long, default_value_t = DEFAULT_BLOCK_CACHE_CAPACITY, env = "FOLIO_CACHE_BLOCKS")]
    pub cache_blocks: usize,
}

impl EngineOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.block_size > 16 * 1024 * 1024 {
            return Err("block_size must be between 1KB and 16MB".to_string());
        }
        self.loader_config().validate()
    }

    pub fn loader_config(&self) -> LoaderConfig {
        LoaderConfig {
            block_size: self.block_size,
            cache_blocks: self.cache_blocks,
            library: LibrarySearch::new(self.pdfium_dir.clone()),
        }
    }
}

/// Options controlling rasterization.
#[derive(Args, Debug, Clone)]
pub struct RasterOptions {
    /// Display density multiplier (device pixels per logical pixel).
    #[arg(long, default_value_t = DEFAULT_DISPLAY_DENSITY, env = "FOLIO_DISPLAY_DENSITY")]
    pub density: f32,

    /// Per-page rasterization timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_PAGE_TIMEOUT_SECS, env = "FOLIO_PAGE_TIMEOUT")]
    pub page_timeout: u64,

    /// Largest surface a single page may allocate, in pixels.
    #[arg(long, default_value_t = DEFAULT_MAX_SURFACE_PIXELS, env = "FOLIO_MAX_SURFACE_PIXELS")]
    pub max_surface_pixels: u64,
}

impl RasterOptions {
    pub fn raster_config(&self) -> RasterConfig {
        RasterConfig {
            display_density: self.density,
            page_timeout: Duration::from_secs(self.page_timeout),
            max_surface_pixels: self.max_surface_pixels,
        }
    }
}

/// Configuration for the `render` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RenderConfig {
    /// Document path, file:// URL or http(s) URL.
    pub locator: String,

    /// Directory the page images are written to.
    #[arg(short, long, default_value = DEFAULT_OUT_DIR, env = "FOLIO_OUT_DIR")]
    pub out_dir: PathBuf,

    /// Document open timeout in seconds.
    #[arg(long, default_value_t = DEFAULT_OPEN_TIMEOUT_SECS, env = "FOLIO_OPEN_TIMEOUT")]
    pub open_timeout: u64,

    #[command(flatten)]
    pub engine: EngineOptions,

    #[command(flatten)]
    pub raster: RasterOptions,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl RenderConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.locator.trim().is_empty() {
            return Err("a document locator is required".to_string());
        }
        self.engine.validate()?;
        self.pipeline_config().validate()
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            open_timeout: Duration::from_secs(self.open_timeout),
            event_buffer: DEFAULT_EVENT_BUFFER,
            raster: self.raster.raster_config(),
        }
    }

    /// Output path for a page, e.g. `pages/page-0007.png`.
    pub fn page_path(&self, page_number: u32) -> PathBuf {
        self.out_dir.join(format!("page-{:04}.png", page_number))
    }
}

/// Configuration for the `inspect` subcommand.
#[derive(Args, Debug, Clone)]
pub struct InspectConfig {
    /// Document path, file:// URL or http(s) URL.
    pub locator: String,

    /// Print JSON instead of text.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    #[command(flatten)]
    pub engine: EngineOptions,

    #[command(flatten)]
    pub raster: RasterOptions,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl InspectConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.locator.trim().is_empty() {
            return Err("a document locator is required".to_string());
        }
        self.engine.validate()?;
        self.raster.raster_config().validate()
    }
}

/// Configuration for the `check` subcommand.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Also check that this locator is reachable and looks like a PDF.
    #[arg(long)]
    pub locator: Option<String>,

    #[command(flatten)]
    pub engine: EngineOptions,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
