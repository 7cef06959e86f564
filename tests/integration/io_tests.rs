//! I/O layer integration tests against a local HTTP server.
//!
//! Tests verify:
//! - Range requests return exactly the requested bytes
//! - Servers without range support fall back to one full download
//! - The block cache collapses small reads into few requests
//! - Locator resolution for URLs, file URLs and paths
//! - The blocking cursor used by the engine thread

use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::Arc;

use folio::document::Locator;
use folio::error::{DocumentLoadError, IoError};
use folio::format::sniff_document;
use folio::io::{create_http_client, BlockCache, BlockingRangeCursor, HttpRangeReader, RangeReader};

use super::test_utils::{minimal_pdf, RangeSupport, TestServer};

fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 256) as u8).collect()
}

// =============================================================================
// HttpRangeReader
// =============================================================================

#[tokio::test]
async fn test_range_reads_return_requested_bytes() {
    let data = payload(10_000);
    let server = TestServer::start(data.clone(), RangeSupport::Bytes);

    let reader = HttpRangeReader::new(create_http_client().unwrap(), server.doc_url())
        .await
        .unwrap();
    assert!(reader.supports_ranges());
    assert_eq!(reader.size(), 10_000);
    assert_eq!(reader.identifier(), server.doc_url());

    let bytes = reader.read_exact_at(100, 50).await.unwrap();
    assert_eq!(&bytes[..], &data[100..150]);

    let tail = reader.read_exact_at(9_990, 10).await.unwrap();
    assert_eq!(&tail[..], &data[9_990..]);

    assert_eq!(server.range_request_count(), 2);
}

#[tokio::test]
async fn test_out_of_bounds_read_makes_no_request() {
    let server = TestServer::start(payload(1_000), RangeSupport::Bytes);
    let reader = HttpRangeReader::new(create_http_client().unwrap(), server.doc_url())
        .await
        .unwrap();

    let result = reader.read_exact_at(990, 20).await;
    assert!(matches!(result, Err(IoError::RangeOutOfBounds { .. })));
    assert!(reader.read_exact_at(0, 0).await.unwrap().is_empty());
    assert_eq!(server.range_request_count(), 0);
}

#[tokio::test]
async fn test_server_without_ranges_falls_back_to_full_body() {
    let data = payload(5_000);
    let server = TestServer::start(data.clone(), RangeSupport::None);

    let reader = HttpRangeReader::new(create_http_client().unwrap(), server.doc_url())
        .await
        .unwrap();
    assert!(!reader.supports_ranges());
    assert_eq!(reader.size(), 5_000);

    // HEAD plus one full GET
    let after_open = server.request_count();
    assert_eq!(after_open, 2);

    for offset in [0u64, 1_000, 4_990] {
        let bytes = reader.read_exact_at(offset, 10).await.unwrap();
        let start = offset as usize;
        assert_eq!(&bytes[..], &data[start..start + 10]);
    }
    assert_eq!(server.request_count(), after_open);
    assert_eq!(server.range_request_count(), 0);
}

#[tokio::test]
async fn test_missing_document_is_not_found() {
    let server = TestServer::start(payload(100), RangeSupport::Bytes);

    let result = HttpRangeReader::new(create_http_client().unwrap(), server.url("/nope.pdf")).await;
    assert!(matches!(result, Err(IoError::NotFound(_))));
}

#[tokio::test]
async fn test_rejected_head_falls_back_to_ranged_get() {
    let data = payload(8_000);
    let server = TestServer::rejecting_head(data.clone(), RangeSupport::Bytes, 403);

    let reader = HttpRangeReader::new(create_http_client().unwrap(), server.doc_url())
        .await
        .unwrap();
    assert!(reader.supports_ranges());
    assert_eq!(reader.size(), 8_000);

    let bytes = reader.read_exact_at(4_000, 100).await.unwrap();
    assert_eq!(&bytes[..], &data[4_000..4_100]);

    // The one-byte size request plus the read
    assert_eq!(server.range_request_count(), 2);
}

#[tokio::test]
async fn test_rejected_head_without_ranges_reads_full_body() {
    let data = payload(3_000);
    let server = TestServer::rejecting_head(data.clone(), RangeSupport::None, 405);

    let reader = HttpRangeReader::new(create_http_client().unwrap(), server.doc_url())
        .await
        .unwrap();
    assert!(!reader.supports_ranges());
    assert_eq!(reader.size(), 3_000);

    // HEAD plus one GET whose 200 body is kept
    assert_eq!(server.request_count(), 2);

    let bytes = reader.read_exact_at(2_990, 10).await.unwrap();
    assert_eq!(&bytes[..], &data[2_990..]);
    assert_eq!(server.request_count(), 2);
}

#[tokio::test]
async fn test_rejected_head_on_missing_document_is_not_found() {
    let server = TestServer::rejecting_head(payload(100), RangeSupport::Bytes, 501);

    let result = HttpRangeReader::new(create_http_client().unwrap(), server.url("/nope.pdf")).await;
    assert!(matches!(result, Err(IoError::NotFound(_))));
}

#[tokio::test]
async fn test_unreachable_host_is_connection_error() {
    let result = HttpRangeReader::new(
        create_http_client().unwrap(),
        "http://127.0.0.1:1/doc.pdf",
    )
    .await;
    assert!(matches!(result, Err(IoError::Connection(_))));
}

// =============================================================================
// Block Cache over HTTP
// =============================================================================

#[tokio::test]
async fn test_block_cache_collapses_small_reads() {
    let data = payload(200_000);
    let server = TestServer::start(data.clone(), RangeSupport::Bytes);

    let reader = HttpRangeReader::new(create_http_client().unwrap(), server.doc_url())
        .await
        .unwrap();
    let cache = BlockCache::with_capacity(reader, 64 * 1024, 8);

    // Scattered small reads, all inside the first block
    for offset in [0u64, 17, 512, 4_000, 30_000, 65_000] {
        let bytes = cache.read_exact_at(offset, 16).await.unwrap();
        let start = offset as usize;
        assert_eq!(&bytes[..], &data[start..start + 16]);
    }
    assert_eq!(server.range_request_count(), 1);

    // A read straddling blocks 0 and 1 fetches only block 1
    let bytes = cache.read_exact_at(65_530, 20).await.unwrap();
    assert_eq!(&bytes[..], &data[65_530..65_550]);
    assert_eq!(server.range_request_count(), 2);
}

#[tokio::test]
async fn test_sniff_over_http() {
    let server = TestServer::start(minimal_pdf(2, 200, 300), RangeSupport::Bytes);
    let reader = HttpRangeReader::new(create_http_client().unwrap(), server.doc_url())
        .await
        .unwrap();

    let sniff = sniff_document(&reader).await.unwrap();
    assert_eq!(sniff.version.to_string(), "1.4");
    assert_eq!(sniff.header_offset, 0);
    assert!(!sniff.encrypted_hint);
}

// =============================================================================
// Locators
// =============================================================================

#[tokio::test]
async fn test_locator_opens_http_reader() {
    let data = payload(3_000);
    let server = TestServer::start(data.clone(), RangeSupport::Bytes);

    let locator = Locator::parse(&server.doc_url()).unwrap();
    let reader = locator
        .open_reader(&create_http_client().unwrap())
        .await
        .unwrap();

    assert_eq!(reader.size(), 3_000);
    assert_eq!(&reader.read_exact_at(10, 5).await.unwrap()[..], &data[10..15]);
}

#[tokio::test]
async fn test_locator_opens_file_url_and_path() {
    let data = payload(2_048);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();

    let client = create_http_client().unwrap();
    let path = file.path().to_str().unwrap().to_string();

    let by_path = Locator::parse(&path).unwrap().open_reader(&client).await.unwrap();
    assert_eq!(by_path.size(), 2_048);

    let url = url::Url::from_file_path(file.path()).unwrap();
    let by_url = Locator::parse(url.as_str())
        .unwrap()
        .open_reader(&client)
        .await
        .unwrap();
    assert_eq!(
        by_url.read_exact_at(1_000, 24).await.unwrap(),
        by_path.read_exact_at(1_000, 24).await.unwrap()
    );
}

#[tokio::test]
async fn test_unsupported_locator() {
    assert!(matches!(
        Locator::parse("gopher://example.com/doc.pdf"),
        Err(DocumentLoadError::UnsupportedLocator(_))
    ));
}

// =============================================================================
// Blocking Cursor
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_blocking_cursor_over_http() {
    let data = payload(150_000);
    let server = TestServer::start(data.clone(), RangeSupport::Bytes);

    let reader = HttpRangeReader::new(create_http_client().unwrap(), server.doc_url())
        .await
        .unwrap();
    let reader: Arc<dyn RangeReader> = Arc::new(BlockCache::new(reader));
    let handle = tokio::runtime::Handle::current();

    let (tail, all) = tokio::task::spawn_blocking(move || {
        let mut cursor = BlockingRangeCursor::new(reader, handle);

        cursor.seek(SeekFrom::End(-100)).unwrap();
        let mut tail = Vec::new();
        cursor.read_to_end(&mut tail).unwrap();

        cursor.seek(SeekFrom::Start(0)).unwrap();
        let mut all = Vec::new();
        cursor.read_to_end(&mut all).unwrap();

        (tail, all)
    })
    .await
    .unwrap();

    assert_eq!(&tail[..], &data[150_000 - 100..]);
    assert_eq!(all, data);
    // Three 64KB blocks cover the document
    assert_eq!(server.range_request_count(), 3);
}
