//! The process-wide pdfium engine.
//!
//! pdfium is not thread-safe and its documents borrow the library handle, so
//! the library is bound once on a dedicated OS thread that owns every open
//! document for the rest of the process. Async callers talk to it through
//! a command channel and receive replies on oneshot channels.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use pdfium_render::prelude::*;
use tokio::sync::{mpsc, oneshot, OnceCell};
use tracing::{debug, info, warn};

use super::library::LibrarySearch;
use crate::document::PageSize;
use crate::error::{DocumentLoadError, IoError, PageRenderError};
use crate::io::BlockingRangeCursor;

static ENGINE: OnceCell<PdfEngine> = OnceCell::const_new();

enum EngineCommand {
    Open {
        id: u64,
        cursor: BlockingRangeCursor,
        reply: oneshot::Sender<Result<u32, DocumentLoadError>>,
    },
    PageSize {
        id: u64,
        page_number: u32,
        busy: BusyGuard,
        reply: oneshot::Sender<Result<PageSize, PageRenderError>>,
    },
    Render {
        id: u64,
        page_number: u32,
        width: u32,
        height: u32,
        busy: BusyGuard,
        reply: oneshot::Sender<Result<RgbaImage, PageRenderError>>,
    },
    Close {
        id: u64,
    },
}

/// Tracks whether a document has a page command on the engine thread.
///
/// The guard travels with the command and is released when the engine has
/// finished with it, not when the caller stops waiting. A page that timed
/// out therefore keeps its document busy until pdfium returns.
#[derive(Debug, Clone, Default)]
pub struct BusyFlag(Arc<AtomicBool>);

impl BusyFlag {
    /// Claim the document, or `None` if a command is still running.
    pub fn acquire(&self) -> Option<BusyGuard> {
        self.0
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(self.0.clone()))
    }

    pub fn is_busy(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Releases its [`BusyFlag`] on drop.
#[derive(Debug)]
pub struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Handle to the engine thread.
pub struct PdfEngine {
    commands: mpsc::UnboundedSender<EngineCommand>,
    next_id: AtomicU64,
    library: String,
}

impl PdfEngine {
    /// The process-wide engine, started on first use.
    ///
    /// Only the first successful call binds the library; later calls get the
    /// same engine whatever `search` they pass. A failed bind is retried on
    /// the next call.
    pub async fn global(search: &LibrarySearch) -> Result<&'static PdfEngine, DocumentLoadError> {
        ENGINE.get_or_try_init(|| Self::start(search.clone())).await
    }

    /// Where the bound library was found.
    pub fn library(&self) -> &str {
        &self.library
    }

    async fn start(search: LibrarySearch) -> Result<Self, DocumentLoadError> {
        let (commands, rx) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = oneshot::channel();

        std::thread::Builder::new()
            .name("folio-pdfium".to_string())
            .spawn(move || {
                let pdfium = match search.bind() {
                    Ok((pdfium, library)) => {
                        let _ = ready_tx.send(Ok(library));
                        pdfium
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                run_engine(&pdfium, rx);
            })
            .map_err(|e| DocumentLoadError::Engine(format!("failed to spawn engine thread: {}", e)))?;

        let library = ready_rx.await.map_err(|_| {
            DocumentLoadError::Engine("engine thread exited during startup".to_string())
        })??;

        info!(library = %library, "pdfium engine started");

        Ok(Self {
            commands,
            next_id: AtomicU64::new(1),
            library,
        })
    }

    /// Open a document read through `cursor`.
    ///
    /// Returns the document id and its page count.
    pub async fn open(&self, cursor: BlockingRangeCursor) -> Result<(u64, u32), DocumentLoadError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (reply, rx) = oneshot::channel();

        self.commands
            .send(EngineCommand::Open { id, cursor, reply })
            .map_err(|_| engine_gone())?;

        let page_count = rx.await.map_err(|_| engine_gone())??;
        Ok((id, page_count))
    }

    pub async fn page_size(
        &self,
        id: u64,
        page_number: u32,
        busy: BusyGuard,
    ) -> Result<PageSize, PageRenderError> {
        let (reply, rx) = oneshot::channel();

        self.commands
            .send(EngineCommand::PageSize {
                id,
                page_number,
                busy,
                reply,
            })
            .map_err(|_| page_engine_gone())?;

        rx.await.map_err(|_| page_engine_gone())?
    }

    /// Render a page to an RGBA bitmap of exactly `width` x `height` pixels,
    /// over an opaque white background.
    pub async fn render(
        &self,
        id: u64,
        page_number: u32,
        width: u32,
        height: u32,
        busy: BusyGuard,
    ) -> Result<RgbaImage, PageRenderError> {
        let (reply, rx) = oneshot::channel();

        self.commands
            .send(EngineCommand::Render {
                id,
                page_number,
                width,
                height,
                busy,
                reply,
            })
            .map_err(|_| page_engine_gone())?;

        rx.await.map_err(|_| page_engine_gone())?
    }

    /// Release a document. Unknown ids are ignored.
    pub fn close(&self, id: u64) {
        let _ = self.commands.send(EngineCommand::Close { id });
    }
}

fn engine_gone() -> DocumentLoadError {
    DocumentLoadError::Engine("pdfium engine thread is not running".to_string())
}

fn page_engine_gone() -> PageRenderError {
    PageRenderError::Engine("pdfium engine thread is not running".to_string())
}

fn run_engine(pdfium: &Pdfium, mut rx: mpsc::UnboundedReceiver<EngineCommand>) {
    let mut documents: HashMap<u64, PdfDocument<'_>> = HashMap::new();

    while let Some(command) = rx.blocking_recv() {
        match command {
            EngineCommand::Open { id, cursor, reply } => {
                let opened = guarded(
                    || -> Result<_, DocumentLoadError> {
                        let document = pdfium
                            .load_pdf_from_reader(cursor, None)
                            .map_err(load_error)?;
                        let page_count = document.pages().len() as u32;
                        Ok((document, page_count))
                    },
                    |message| {
                        DocumentLoadError::Malformed(format!(
                            "engine panicked while opening: {}",
                            message
                        ))
                    },
                );
                match opened {
                    Ok((document, page_count)) => {
                        // The caller may have timed out; keep nothing it cannot close
                        if reply.send(Ok(page_count)).is_ok() {
                            debug!(id, page_count, "opened document");
                            documents.insert(id, document);
                        }
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e));
                    }
                }
            }
            EngineCommand::PageSize {
                id,
                page_number,
                busy,
                reply,
            } => {
                let result = guarded(
                    || {
                        with_page(&documents, id, page_number, |page| {
                            Ok(PageSize::new(page.width().value, page.height().value))
                        })
                    },
                    page_panic,
                );
                // Release before replying so the caller's next page never sees it held
                drop(busy);
                let _ = reply.send(result);
            }
            EngineCommand::Render {
                id,
                page_number,
                width,
                height,
                busy,
                reply,
            } => {
                let result = guarded(
                    || {
                        with_page(&documents, id, page_number, |page| {
                            render_page(page, width, height)
                        })
                    },
                    page_panic,
                );
                drop(busy);
                let _ = reply.send(result);
            }
            EngineCommand::Close { id } => {
                if documents.remove(&id).is_some() {
                    debug!(id, "closed document");
                }
            }
        }
    }

    debug!(open_documents = documents.len(), "pdfium engine stopping");
}

/// Run `f`, turning a panic inside pdfium or its bindings into an error so
/// the engine thread survives it.
fn guarded<T, E>(
    f: impl FnOnce() -> Result<T, E>,
    on_panic: impl FnOnce(String) -> E,
) -> Result<T, E> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(panic = %message, "pdfium call panicked");
            Err(on_panic(message))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn page_panic(message: String) -> PageRenderError {
    PageRenderError::Draw {
        message: format!("engine panicked: {}", message),
    }
}

fn with_page<T>(
    documents: &HashMap<u64, PdfDocument<'_>>,
    id: u64,
    page_number: u32,
    f: impl FnOnce(&PdfPage<'_>) -> Result<T, PageRenderError>,
) -> Result<T, PageRenderError> {
    let document = documents
        .get(&id)
        .ok_or_else(|| PageRenderError::Engine(format!("document {} is not open", id)))?;

    let pages = document.pages();
    let page_count = pages.len() as u32;

    let index = page_number
        .checked_sub(1)
        .filter(|index| *index < page_count)
        .and_then(|index| u16::try_from(index).ok())
        .ok_or(PageRenderError::InvalidPage {
            page_number,
            page_count,
        })?;

    let page = pages.get(index).map_err(|e| PageRenderError::Draw {
        message: format!("failed to load page: {}", e),
    })?;

    f(&page)
}

fn render_page(page: &PdfPage<'_>, width: u32, height: u32) -> Result<RgbaImage, PageRenderError> {
    let (target_width, target_height) = match (i32::try_from(width), i32::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(PageRenderError::InvalidGeometry {
                width: width as f32,
                height: height as f32,
            })
        }
    };

    let config = PdfRenderConfig::new()
        .set_target_width(target_width)
        .set_target_height(target_height)
        .set_clear_color(PdfColor::new(255, 255, 255, 255))
        .set_text_smoothing(true)
        .set_image_smoothing(true)
        .set_path_smoothing(true);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| PageRenderError::Draw {
            message: e.to_string(),
        })?;

    let image = bitmap_image(bitmap.width(), bitmap.height(), bitmap.as_rgba_bytes())?;
    if image.dimensions() != (width, height) {
        warn!(
            expected_width = width,
            expected_height = height,
            actual_width = image.width(),
            actual_height = image.height(),
            "engine returned a bitmap of unexpected size"
        );
    }

    Ok(image)
}

/// Wrap raw RGBA bytes from the engine, checking them against the bitmap size.
fn bitmap_image(width: i32, height: i32, rgba: Vec<u8>) -> Result<RgbaImage, PageRenderError> {
    let len = rgba.len();
    let (w, h) = match (u32::try_from(width), u32::try_from(height)) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(PageRenderError::Draw {
                message: format!("engine returned a {}x{} bitmap", width, height),
            })
        }
    };

    RgbaImage::from_raw(w, h, rgba).ok_or_else(|| PageRenderError::Draw {
        message: format!("engine returned {} bytes for a {}x{} bitmap", len, w, h),
    })
}

fn load_error(error: PdfiumError) -> DocumentLoadError {
    match error {
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::PasswordError)
        | PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::SecurityError) => {
            DocumentLoadError::Encrypted
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FormatError) => {
            DocumentLoadError::Malformed("document structure could not be parsed".to_string())
        }
        PdfiumError::PdfiumLibraryInternalError(PdfiumInternalError::FileError) => {
            IoError::Connection("engine could not read document bytes".to_string()).into()
        }
        other => DocumentLoadError::Malformed(other.to_string()),
    }
}
