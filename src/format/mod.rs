//! PDF format sniffing.
//!
//! The rendering engine does the real parsing; this module only inspects the
//! first and last kilobyte of a document so obviously wrong input (HTML error
//! pages, images, truncated downloads) is rejected before the engine sees it.

mod sniff;

pub use sniff::{find_pdf_header, sniff_document, DocumentSniff, PdfVersion, HEADER_SCAN_BYTES};
