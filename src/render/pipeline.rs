use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use super::rasterizer::{PageRasterizer, RasterConfig};
use super::state::{progress_percent, PageImage, RenderRequest, RenderState};
use crate::document::{DocumentLoader, PageSource};
use crate::error::DocumentLoadError;

/// Default bound on opening a document.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(120);

/// Default number of events buffered between the pipeline and its consumer.
pub const DEFAULT_EVENT_BUFFER: usize = 4;

/// One step of a render run.
///
/// A run emits `Loaded`, then a `PageRendered` (unless the page failed) and
/// a `Progress` per page in ascending order, then `Done`. A run whose
/// document cannot be opened emits only `Failed`.
#[derive(Debug, Clone)]
pub enum RenderEvent {
    /// The document opened; the page count is fixed for the rest of the run
    Loaded { total_pages: u32 },

    /// A page was rasterized
    PageRendered(PageImage),

    /// A page was attempted, successfully or not
    Progress { page_number: u32, percent: u8 },

    /// Every page was attempted
    Done,

    /// The document could not be opened
    Failed(DocumentLoadError),
}

impl RenderEvent {
    /// `Done` and `Failed` end a run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RenderEvent::Done | RenderEvent::Failed(_))
    }
}

/// Settings for a render pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Upper bound on `DocumentLoader::open`
    pub open_timeout: Duration,

    /// Events the pipeline may run ahead of its consumer
    pub event_buffer: usize,

    pub raster: RasterConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            open_timeout: DEFAULT_OPEN_TIMEOUT,
            event_buffer: DEFAULT_EVENT_BUFFER,
            raster: RasterConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.open_timeout.is_zero() {
            return Err("open timeout must be greater than 0".to_string());
        }
        if self.event_buffer == 0 {
            return Err("event buffer must be greater than 0".to_string());
        }
        self.raster.validate()
    }
}

/// How a run ended, as seen by the pipeline task.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// Every page was attempted
    Completed { total_pages: u32, rendered: u32 },

    /// The document could not be opened
    Failed(DocumentLoadError),

    /// The consumer went away; `last_page` was the last page attempted
    Abandoned { last_page: u32 },
}

/// Drives one document from open to the last page.
///
/// Pages are rendered strictly one after another. Each call to
/// [`start`](Self::start) is an independent run, even for a locator that
/// was rendered before.
pub struct RenderPipeline<L> {
    loader: Arc<L>,
    rasterizer: Arc<PageRasterizer>,
    config: Arc<PipelineConfig>,
}

impl<L> Clone for RenderPipeline<L> {
    fn clone(&self) -> Self {
        Self {
            loader: self.loader.clone(),
            rasterizer: self.rasterizer.clone(),
            config: self.config.clone(),
        }
    }
}

impl<L> RenderPipeline<L>
where
    L: DocumentLoader + 'static,
{
    pub fn new(loader: L, config: PipelineConfig) -> Self {
        Self::with_shared_loader(Arc::new(loader), config)
    }

    /// Build a pipeline around a loader shared with other owners.
    pub fn with_shared_loader(loader: Arc<L>, config: PipelineConfig) -> Self {
        Self {
            rasterizer: Arc::new(PageRasterizer::new(config.raster.clone())),
            loader,
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn loader(&self) -> &Arc<L> {
        &self.loader
    }

    /// Start a run in a background task.
    ///
    /// Dropping the returned [`RenderRun`] (or its event receiver) stops the
    /// run after the page currently being rendered.
    pub fn start(&self, request: RenderRequest) -> RenderRun {
        let (tx, rx) = mpsc::channel(self.config.event_buffer.max(1));

        let loader = self.loader.clone();
        let rasterizer = self.rasterizer.clone();
        let open_timeout = self.config.open_timeout;

        let handle = tokio::spawn(async move {
            run(loader.as_ref(), &rasterizer, open_timeout, request, tx).await
        });

        RenderRun { events: rx, handle }
    }

    /// Run to completion and return the final state.
    pub async fn render_all(&self, request: RenderRequest) -> RenderState {
        let mut state = RenderState::loading(&request, 1);
        let mut run = self.start(request);

        while let Some(event) = run.next_event().await {
            state.apply(event);
        }

        state
    }
}

/// Handle to a running render.
pub struct RenderRun {
    events: mpsc::Receiver<RenderEvent>,
    handle: JoinHandle<RunOutcome>,
}

impl RenderRun {
    /// Next event, or `None` after the terminal event.
    pub async fn next_event(&mut self) -> Option<RenderEvent> {
        self.events.recv().await
    }

    /// Wait for the pipeline task and return how the run ended.
    ///
    /// Drops the event receiver first, so remaining events are discarded.
    pub async fn outcome(self) -> Option<RunOutcome> {
        drop(self.events);
        match self.handle.await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                error!(error = %e, "render task failed");
                None
            }
        }
    }

    pub fn into_parts(self) -> (mpsc::Receiver<RenderEvent>, JoinHandle<RunOutcome>) {
        (self.events, self.handle)
    }
}

async fn run<L>(
    loader: &L,
    rasterizer: &PageRasterizer,
    open_timeout: Duration,
    request: RenderRequest,
    tx: mpsc::Sender<RenderEvent>,
) -> RunOutcome
where
    L: DocumentLoader + ?Sized,
{
    let locator = request.source_locator;
    let started = Instant::now();
    info!(locator = %locator, "opening document");

    let opened = match timeout(open_timeout, loader.open(&locator)).await {
        Ok(result) => result,
        Err(_) => Err(DocumentLoadError::Timeout(open_timeout)),
    };

    let document = match opened {
        Ok(document) => document,
        Err(e) => {
            error!(locator = %locator, error = %e, "failed to open document");
            let _ = tx.send(RenderEvent::Failed(e.clone())).await;
            return RunOutcome::Failed(e);
        }
    };

    let total_pages = document.page_count();
    info!(locator = %locator, total_pages, "document opened");

    if tx.send(RenderEvent::Loaded { total_pages }).await.is_err() {
        debug!(locator = %locator, "consumer gone before rendering started");
        return RunOutcome::Abandoned { last_page: 0 };
    }

    let mut rendered = 0;
    for page_number in 1..=total_pages {
        if let Some(image) = rasterizer.render(&document, page_number).await {
            rendered += 1;
            if tx.send(RenderEvent::PageRendered(image)).await.is_err() {
                return abandoned(&locator, page_number);
            }
        }

        let percent = progress_percent(page_number, total_pages);
        if tx
            .send(RenderEvent::Progress {
                page_number,
                percent,
            })
            .await
            .is_err()
        {
            return abandoned(&locator, page_number);
        }
    }

    if rendered < total_pages {
        warn!(
            locator = %locator,
            total_pages,
            rendered,
            "some pages could not be rendered"
        );
    }
    info!(
        locator = %locator,
        total_pages,
        rendered,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "render complete"
    );

    let _ = tx.send(RenderEvent::Done).await;

    RunOutcome::Completed {
        total_pages,
        rendered,
    }
}

fn abandoned(locator: &str, page_number: u32) -> RunOutcome {
    debug!(locator, page_number, "consumer gone, abandoning run");
    RunOutcome::Abandoned {
        last_page: page_number,
    }
}
