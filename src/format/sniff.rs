//! Header and trailer sniffing for PDF documents.
//!
//! - **Header**: `%PDF-M.m` must appear within the first 1024 bytes (readers
//!   tolerate leading garbage up to that point).
//! - **Linearization**: a `/Linearized` dictionary right after the header means
//!   the first page can be rendered from the start of the file alone.
//! - **Encryption**: an `/Encrypt` entry in the tail of the file. This is a
//!   hint for logging; the engine decides whether a password is needed.

use crate::error::DocumentLoadError;
use crate::io::RangeReader;

/// How far into the document the `%PDF-` marker may appear.
pub const HEADER_SCAN_BYTES: usize = 1024;

/// How much of the tail is scanned for trailer hints.
const TRAILER_SCAN_BYTES: usize = 1024;

const PDF_MARKER: &[u8] = b"%PDF-";

const LINEARIZED_MARKER: &[u8] = b"/Linearized";

const ENCRYPT_MARKER: &[u8] = b"/Encrypt";

/// PDF version from the header comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct PdfVersion {
    pub major: u8,
    pub minor: u8,
}

impl std::fmt::Display for PdfVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// What sniffing learned about a document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DocumentSniff {
    /// Version from the header
    pub version: PdfVersion,

    /// Offset of the `%PDF-` marker
    pub header_offset: usize,

    /// Document starts with a linearization dictionary
    pub linearized: bool,

    /// Trailer references an encryption dictionary
    pub encrypted_hint: bool,

    /// Total size in bytes
    pub size: u64,
}

/// Locate the `%PDF-M.m` marker in a header buffer.
///
/// Returns the marker offset and parsed version.
pub fn find_pdf_header(bytes: &[u8]) -> Option<(usize, PdfVersion)> {
    let window = &bytes[..bytes.len().min(HEADER_SCAN_BYTES)];
    let offset = find(window, PDF_MARKER)?;

    let rest = &window[offset + PDF_MARKER.len()..];
    if rest.len() < 3 {
        return None;
    }

    let (major, dot, minor) = (rest[0], rest[1], rest[2]);
    if !major.is_ascii_digit() || dot != b'.' || !minor.is_ascii_digit() {
        return None;
    }

    Some((
        offset,
        PdfVersion {
            major: major - b'0',
            minor: minor - b'0',
        },
    ))
}

/// Sniff a document through a range reader.
///
/// Reads at most two small ranges: the head and the tail.
///
/// # Errors
///
/// `DocumentLoadError::InvalidHeader` if the document is empty or has no
/// `%PDF-` marker, `DocumentLoadError::Io` if a read fails.
pub async fn sniff_document<R: RangeReader + ?Sized>(
    reader: &R,
) -> Result<DocumentSniff, DocumentLoadError> {
    let size = reader.size();
    if size == 0 {
        return Err(DocumentLoadError::InvalidHeader {
            reason: "document is empty".to_string(),
        });
    }

    let head_len = std::cmp::min(size, HEADER_SCAN_BYTES as u64) as usize;
    let head = reader.read_exact_at(0, head_len).await?;

    let (header_offset, version) =
        find_pdf_header(&head).ok_or_else(|| DocumentLoadError::InvalidHeader {
            reason: format!(
                "no %PDF- marker in the first {} bytes (starts with {:?})",
                head_len,
                printable_prefix(&head)
            ),
        })?;

    let linearized = find(&head[header_offset..], LINEARIZED_MARKER).is_some();

    let tail_len = std::cmp::min(size, TRAILER_SCAN_BYTES as u64) as usize;
    let tail_offset = size - tail_len as u64;
    let encrypted_hint = if tail_offset == 0 {
        find(&head[..tail_len], ENCRYPT_MARKER).is_some()
    } else {
        let tail = reader.read_exact_at(tail_offset, tail_len).await?;
        find(&tail, ENCRYPT_MARKER).is_some()
    };

    Ok(DocumentSniff {
        version,
        header_offset,
        linearized,
        encrypted_hint,
        size,
    })
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn printable_prefix(bytes: &[u8]) -> String {
    bytes
        .iter()
        .take(16)
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        })
        .collect()
}
