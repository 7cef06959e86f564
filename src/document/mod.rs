//! Document layer.
//!
//! [`DocumentLoader`] turns a locator into an opened [`PageSource`]. The
//! production implementation is [`PdfiumLoader`]; tests substitute their own.

mod locator;
pub mod pdfium;
mod source;

pub use locator::Locator;
pub use pdfium::{LibrarySearch, LoaderConfig, PdfEngine, PdfiumDocument, PdfiumLoader};
pub use source::{DocumentLoader, PageSize, PageSource};
