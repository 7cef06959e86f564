use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio::runtime::Handle;
use tracing::{debug, info};

use super::engine::{BusyFlag, BusyGuard, PdfEngine};
use super::library::LibrarySearch;
use crate::document::{DocumentLoader, Locator, PageSize, PageSource};
use crate::error::{DocumentLoadError, PageRenderError};
use crate::format::{sniff_document, DocumentSniff};
use crate::io::{
    create_http_client, BlockCache, BlockingRangeCursor, RangeReader,
    DEFAULT_BLOCK_CACHE_CAPACITY, DEFAULT_BLOCK_SIZE,
};
use crate::render::{RenderSurface, Viewport};

/// Settings for [`PdfiumLoader`].
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Size of each cached block in bytes
    pub block_size: usize,

    /// Number of blocks cached per document
    pub cache_blocks: usize,

    pub library: LibrarySearch,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            cache_blocks: DEFAULT_BLOCK_CACHE_CAPACITY,
            library: LibrarySearch::default(),
        }
    }
}

impl LoaderConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.block_size < 1024 {
            return Err(format!(
                "block size must be at least 1024 bytes, got {}",
                self.block_size
            ));
        }
        if self.cache_blocks == 0 {
            return Err("cache blocks must be greater than 0".to_string());
        }
        Ok(())
    }
}

/// Opens PDF documents from URLs or local paths with pdfium.
///
/// Documents are read lazily through a block cache, so for servers that
/// honour range requests only the parts pdfium touches are downloaded.
pub struct PdfiumLoader {
    client: Client,
    config: LoaderConfig,
}

impl PdfiumLoader {
    pub fn new(config: LoaderConfig) -> Result<Self, DocumentLoadError> {
        Ok(Self::with_client(create_http_client()?, config))
    }

    /// Use an existing HTTP client.
    pub fn with_client(client: Client, config: LoaderConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Start the engine without opening a document.
    pub async fn engine(&self) -> Result<&'static PdfEngine, DocumentLoadError> {
        PdfEngine::global(&self.config.library).await
    }

    /// Open a cached reader for `locator` and check its header.
    ///
    /// Does not touch the engine.
    pub async fn probe(
        &self,
        locator: &str,
    ) -> Result<(Arc<dyn RangeReader>, DocumentSniff), DocumentLoadError> {
        let locator = Locator::parse(locator)?;
        let reader = locator.open_reader(&self.client).await?;

        let reader: Arc<dyn RangeReader> = Arc::new(BlockCache::with_capacity(
            reader,
            self.config.block_size,
            self.config.cache_blocks,
        ));

        let sniff = sniff_document(reader.as_ref()).await?;
        debug!(
            locator = %locator,
            version = %sniff.version,
            size = sniff.size,
            linearized = sniff.linearized,
            "document header ok"
        );
        if sniff.encrypted_hint {
            debug!(locator = %locator, "document advertises an encryption dictionary");
        }

        Ok((reader, sniff))
    }
}

#[async_trait]
impl DocumentLoader for PdfiumLoader {
    type Document = PdfiumDocument;

    async fn open(&self, locator: &str) -> Result<PdfiumDocument, DocumentLoadError> {
        let (reader, sniff) = self.probe(locator).await?;
        let engine = self.engine().await?;

        let cursor = BlockingRangeCursor::new(reader, Handle::current());
        let (id, page_count) = engine.open(cursor).await?;

        info!(locator, id, page_count, "opened PDF document");

        Ok(PdfiumDocument {
            engine,
            id,
            page_count,
            sniff,
            busy: BusyFlag::default(),
        })
    }
}

/// A document open in the pdfium engine. Closed on drop.
pub struct PdfiumDocument {
    engine: &'static PdfEngine,
    id: u64,
    page_count: u32,
    sniff: DocumentSniff,
    busy: BusyFlag,
}

impl PdfiumDocument {
    /// Header information gathered before the document was opened.
    pub fn sniff(&self) -> &DocumentSniff {
        &self.sniff
    }

    /// pdfium cannot be interrupted, so a page that outlived its timeout is
    /// still occupying the engine. Later pages fail at once instead of
    /// queueing behind it.
    fn claim(&self, page_number: u32) -> Result<BusyGuard, PageRenderError> {
        self.busy.acquire().ok_or_else(|| {
            PageRenderError::Engine(format!(
                "page {} skipped: an earlier page of document {} is still rendering",
                page_number, self.id
            ))
        })
    }
}

#[async_trait]
impl PageSource for PdfiumDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    async fn page_size(&self, page_number: u32) -> Result<PageSize, PageRenderError> {
        let busy = self.claim(page_number)?;
        self.engine.page_size(self.id, page_number, busy).await
    }

    async fn draw(
        &self,
        page_number: u32,
        viewport: &Viewport,
        surface: &mut RenderSurface,
    ) -> Result<(), PageRenderError> {
        let busy = self.claim(page_number)?;
        let layer = self
            .engine
            .render(self.id, page_number, viewport.width, viewport.height, busy)
            .await?;
        surface.composite(&layer);
        Ok(())
    }
}

impl Drop for PdfiumDocument {
    fn drop(&mut self) {
        self.engine.close(self.id);
    }
}
