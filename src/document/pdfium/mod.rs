//! pdfium-backed document loading.
//!
//! The library is located and bound once per process (see
//! [`LibrarySearch`]); all documents are then served by a single engine
//! thread.

mod engine;
mod library;
mod loader;

pub use engine::{BusyFlag, BusyGuard, PdfEngine};
pub use library::{LibrarySearch, PDFIUM_DIR_ENV};
pub use loader::{LoaderConfig, PdfiumDocument, PdfiumLoader};
