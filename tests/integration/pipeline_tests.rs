//! Render pipeline integration tests.
//!
//! Tests verify:
//! - Progress rounding and the terminal state of successful runs
//! - Isolation of page failures and timeouts
//! - Fatal load failures (unreachable, bad header, open timeout)
//! - Strict page ordering and restartability

use std::time::Duration;

use folio::document::{LoaderConfig, PdfiumLoader};
use folio::error::{DocumentLoadError, IoError};
use folio::render::{
    PipelineConfig, RasterConfig, RenderEvent, RenderPipeline, RenderRequest, RunOutcome,
    MAX_SCALE,
};

use super::test_utils::{MockDocumentSpec, MockLoader};

fn pipeline(loader: MockLoader) -> RenderPipeline<MockLoader> {
    RenderPipeline::new(loader, PipelineConfig::default())
}

async fn collect_events(pipeline: &RenderPipeline<MockLoader>, locator: &str) -> Vec<RenderEvent> {
    let mut run = pipeline.start(RenderRequest::new(locator));
    let mut events = Vec::new();
    while let Some(event) = run.next_event().await {
        events.push(event);
    }
    events
}

fn progress_sequence(events: &[RenderEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|event| match event {
            RenderEvent::Progress { percent, .. } => Some(*percent),
            _ => None,
        })
        .collect()
}

fn rendered_pages(events: &[RenderEvent]) -> Vec<u32> {
    events
        .iter()
        .filter_map(|event| match event {
            RenderEvent::PageRendered(image) => Some(image.page_number()),
            _ => None,
        })
        .collect()
}

// =============================================================================
// Successful Runs
// =============================================================================

#[tokio::test]
async fn test_three_page_document() {
    let loader = MockLoader::new().with_document("three.pdf", MockDocumentSpec::pages(3));
    let pipeline = pipeline(loader);

    let events = collect_events(&pipeline, "three.pdf").await;
    assert_eq!(progress_sequence(&events), vec![33, 67, 100]);
    assert_eq!(rendered_pages(&events), vec![1, 2, 3]);
    assert!(matches!(events.last(), Some(RenderEvent::Done)));

    let state = pipeline.render_all(RenderRequest::new("three.pdf")).await;
    assert_eq!(state.images.len(), 3);
    assert_eq!(state.total_pages, 3);
    assert_eq!(state.progress_percent, 100);
    assert!(!state.loading);
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_page_dimensions_follow_viewport() {
    let loader = MockLoader::new().with_document(
        "letter.pdf",
        MockDocumentSpec::pages(1).with_page_size(612.0, 792.0),
    );
    let state = pipeline(loader)
        .render_all(RenderRequest::new("letter.pdf"))
        .await;

    let image = &state.images[0];
    assert_eq!((image.width(), image.height()), (1920, 2485));

    let decoded = image::load_from_memory(image.image_data()).unwrap();
    assert_eq!((decoded.width(), decoded.height()), (1920, 2485));
}

#[tokio::test]
async fn test_scale_bounds_over_page_widths() {
    let mut loader = MockLoader::new();
    let widths = [50.0f32, 300.0, 612.0, 1000.0, 2400.0];
    for (i, width) in widths.iter().enumerate() {
        loader = loader.with_document(
            &format!("w{}.pdf", i),
            MockDocumentSpec::pages(1).with_page_size(*width, 10.0),
        );
    }
    let pipeline = pipeline(loader);

    for (i, width) in widths.iter().enumerate() {
        let state = pipeline
            .render_all(RenderRequest::new(format!("w{}.pdf", i)))
            .await;
        let pixel_width = state.images[0].width() as f32;

        let floor = 1920f32.min(width * MAX_SCALE);
        assert!(pixel_width >= floor.round(), "width {} rendered at {}", width, pixel_width);
        assert!(pixel_width <= (width * MAX_SCALE).round());
        assert!(pixel_width >= width.round());
    }
}

#[tokio::test]
async fn test_empty_document_completes() {
    let loader = MockLoader::new().with_document("empty.pdf", MockDocumentSpec::pages(0));
    let events = collect_events(&pipeline(loader), "empty.pdf").await;

    assert!(matches!(events[0], RenderEvent::Loaded { total_pages: 0 }));
    assert!(matches!(events[1], RenderEvent::Done));
    assert_eq!(events.len(), 2);
}

// =============================================================================
// Page Failure Isolation
// =============================================================================

#[tokio::test]
async fn test_corrupt_page_is_omitted() {
    let loader = MockLoader::new().with_document(
        "five.pdf",
        MockDocumentSpec::pages(5).with_corrupt_page(3),
    );
    let pipeline = pipeline(loader);

    let events = collect_events(&pipeline, "five.pdf").await;
    assert_eq!(progress_sequence(&events), vec![20, 40, 60, 80, 100]);

    let state = pipeline.render_all(RenderRequest::new("five.pdf")).await;
    let pages: Vec<u32> = state.images.iter().map(|i| i.page_number()).collect();
    assert_eq!(pages, vec![1, 2, 4, 5]);
    assert_eq!(state.progress_percent, 100);
    assert!(state.error.is_none());
    assert!(!state.loading);
    assert_eq!(state.missing_pages(), vec![3]);
}

#[tokio::test]
async fn test_every_page_failing_still_completes() {
    let mut spec = MockDocumentSpec::pages(4);
    for page in 1..=4 {
        spec = spec.with_corrupt_page(page);
    }
    let loader = MockLoader::new().with_document("bad.pdf", spec);

    let state = pipeline(loader).render_all(RenderRequest::new("bad.pdf")).await;
    assert!(state.images.is_empty());
    assert_eq!(state.progress_percent, 100);
    assert!(state.is_done());
}

#[tokio::test]
async fn test_hanging_page_times_out() {
    let loader = MockLoader::new().with_document(
        "hang.pdf",
        MockDocumentSpec::pages(3).with_hanging_page(2),
    );
    let config = PipelineConfig {
        raster: RasterConfig {
            page_timeout: Duration::from_millis(100),
            ..Default::default()
        },
        ..Default::default()
    };
    let pipeline = RenderPipeline::new(loader, config);

    let state = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline.render_all(RenderRequest::new("hang.pdf")),
    )
    .await
    .expect("hung page must not stall the run");

    let pages: Vec<u32> = state.images.iter().map(|i| i.page_number()).collect();
    assert_eq!(pages, vec![1, 3]);
    assert!(state.is_done());
}

#[tokio::test]
async fn test_oversized_page_is_isolated() {
    let loader = MockLoader::new()
        .with_document("big.pdf", MockDocumentSpec::pages(2).with_page_size(100.0, 140.0));
    let config = PipelineConfig {
        raster: RasterConfig {
            max_surface_pixels: 1000,
            ..Default::default()
        },
        ..Default::default()
    };

    let state = RenderPipeline::new(loader, config)
        .render_all(RenderRequest::new("big.pdf"))
        .await;
    assert!(state.images.is_empty());
    assert!(state.is_done());
}

// =============================================================================
// Fatal Load Failures
// =============================================================================

#[tokio::test]
async fn test_unreachable_locator_fails() {
    let loader = MockLoader::new();
    let log = loader.log();
    let pipeline = pipeline(loader);

    let events = collect_events(&pipeline, "https://unreachable.invalid/doc.pdf").await;
    assert_eq!(events.len(), 1);
    assert!(matches!(
        events[0],
        RenderEvent::Failed(DocumentLoadError::Io(IoError::NotFound(_)))
    ));

    let state = pipeline
        .render_all(RenderRequest::new("https://unreachable.invalid/doc.pdf"))
        .await;
    assert!(state.error.is_some());
    assert!(state.images.is_empty());
    assert!(!state.loading);

    // No rasterization was attempted
    assert!(log.draws().is_empty());
}

#[tokio::test]
async fn test_open_timeout_fails() {
    let loader = MockLoader::new()
        .with_document("slow.pdf", MockDocumentSpec::pages(2))
        .with_open_delay(Duration::from_secs(3600));
    let config = PipelineConfig {
        open_timeout: Duration::from_millis(100),
        ..Default::default()
    };
    let pipeline = RenderPipeline::new(loader, config);

    let run = pipeline.start(RenderRequest::new("slow.pdf"));
    let (mut events, handle) = run.into_parts();

    assert!(matches!(
        events.recv().await,
        Some(RenderEvent::Failed(DocumentLoadError::Timeout(_)))
    ));
    assert!(events.recv().await.is_none());
    assert!(matches!(
        handle.await.unwrap(),
        RunOutcome::Failed(DocumentLoadError::Timeout(_))
    ));
}

#[tokio::test]
async fn test_non_pdf_header_fails_before_engine() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    std::io::Write::write_all(&mut file, b"<!DOCTYPE html><html>404</html>").unwrap();

    let loader = PdfiumLoader::new(LoaderConfig::default()).unwrap();
    let pipeline = RenderPipeline::new(loader, PipelineConfig::default());

    let state = pipeline
        .render_all(RenderRequest::new(file.path().to_str().unwrap()))
        .await;
    assert!(matches!(
        state.error,
        Some(DocumentLoadError::InvalidHeader { .. })
    ));
    assert!(state.images.is_empty());
    assert!(!state.loading);
}

#[tokio::test]
async fn test_missing_file_fails() {
    let loader = PdfiumLoader::new(LoaderConfig::default()).unwrap();
    let pipeline = RenderPipeline::new(loader, PipelineConfig::default());

    let state = pipeline
        .render_all(RenderRequest::new("/no/such/dir/doc.pdf"))
        .await;
    assert!(matches!(
        state.error,
        Some(DocumentLoadError::Io(IoError::NotFound(_)))
    ));
}

// =============================================================================
// Ordering and Restartability
// =============================================================================

#[tokio::test]
async fn test_pages_rendered_strictly_in_order() {
    // Page 1 is much slower than the rest; its result must still come first
    let loader = MockLoader::new().with_document(
        "order.pdf",
        MockDocumentSpec::pages(4).with_slow_page(1, Duration::from_millis(150)),
    );
    let log = loader.log();

    let events = collect_events(&pipeline(loader), "order.pdf").await;
    assert_eq!(rendered_pages(&events), vec![1, 2, 3, 4]);
    assert_eq!(log.draws_for("order.pdf"), vec![1, 2, 3, 4]);

    // Every page's progress event follows its own image
    let mut last_rendered = 0;
    for event in &events {
        match event {
            RenderEvent::PageRendered(image) => last_rendered = image.page_number(),
            RenderEvent::Progress { page_number, .. } => assert_eq!(*page_number, last_rendered),
            _ => {}
        }
    }
}

#[tokio::test]
async fn test_resubmitting_is_a_fresh_equivalent_run() {
    let loader = MockLoader::new().with_document(
        "again.pdf",
        MockDocumentSpec::pages(3).with_corrupt_page(2),
    );
    let log = loader.log();
    let pipeline = pipeline(loader);

    let first = pipeline.render_all(RenderRequest::new("again.pdf")).await;
    let second = pipeline.render_all(RenderRequest::new("again.pdf")).await;

    assert_eq!(log.open_count(), 2);
    let dims = |state: &folio::RenderState| -> Vec<(u32, u32, u32)> {
        state
            .images
            .iter()
            .map(|i| (i.page_number(), i.width(), i.height()))
            .collect()
    };
    assert_eq!(dims(&first), dims(&second));
    assert_eq!(first.missing_pages(), second.missing_pages());
}

#[tokio::test]
async fn test_dropped_consumer_stops_run() {
    let loader = MockLoader::new().with_document(
        "long.pdf",
        MockDocumentSpec::pages(50).with_page_delay(Duration::from_millis(5)),
    );
    let log = loader.log();
    let pipeline = pipeline(loader);

    let mut run = pipeline.start(RenderRequest::new("long.pdf"));
    assert!(matches!(
        run.next_event().await,
        Some(RenderEvent::Loaded { total_pages: 50 })
    ));

    match run.outcome().await {
        Some(RunOutcome::Abandoned { last_page }) => assert!(last_page < 50),
        other => panic!("Expected Abandoned, got {:?}", other),
    }
    assert!(log.draws_for("long.pdf").len() < 50);
}
