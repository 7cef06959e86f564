//! Render session integration tests.
//!
//! Tests verify:
//! - Live state reaches a consistent final state
//! - A new request supersedes the old one without mixing pages
//! - Superseded runs stop early
//! - Clearing returns to idle

use std::sync::{Arc, Mutex};
use std::time::Duration;

use folio::render::{PipelineConfig, RenderPipeline, RenderRequest, RenderSession, RenderState};

use super::test_utils::{MockDocumentSpec, MockLoader};

/// Document A has 100pt pages (400 px wide), document B 200pt pages (800 px).
fn two_document_loader() -> MockLoader {
    MockLoader::new()
        .with_document(
            "a.pdf",
            MockDocumentSpec::pages(20)
                .with_page_size(100.0, 140.0)
                .with_page_delay(Duration::from_millis(20)),
        )
        .with_document(
            "b.pdf",
            MockDocumentSpec::pages(3).with_page_size(200.0, 280.0),
        )
}

fn session(loader: MockLoader) -> RenderSession<MockLoader> {
    RenderSession::new(RenderPipeline::new(loader, PipelineConfig::default()))
}

fn expected_width(locator: &str) -> u32 {
    match locator {
        "a.pdf" => 400,
        "b.pdf" => 800,
        other => panic!("unexpected locator {}", other),
    }
}

fn assert_consistent(state: &RenderState) {
    let Some(locator) = state.source_locator.as_deref() else {
        assert!(state.images.is_empty());
        return;
    };
    let width = expected_width(locator);
    for image in &state.images {
        assert_eq!(
            image.width(),
            width,
            "page {} of {} has foreign width",
            image.page_number(),
            locator
        );
    }

    let pages: Vec<u32> = state.images.iter().map(|i| i.page_number()).collect();
    assert!(pages.windows(2).all(|w| w[0] < w[1]), "pages out of order: {:?}", pages);
    assert!(state.images.len() as u32 <= state.total_pages);
}

#[tokio::test]
async fn test_submit_and_wait() {
    let session = session(two_document_loader());

    let generation = session.submit(RenderRequest::new("b.pdf"));
    assert_eq!(generation, 1);
    assert!(session.state().loading);

    let state = session.wait_for_generation(generation).await.unwrap();
    assert_eq!(state.images.len(), 3);
    assert_eq!(state.progress_percent, 100);
    assert!(!state.loading);
    assert!(state.error.is_none());
    assert_eq!(state.source_locator.as_deref(), Some("b.pdf"));
}

#[tokio::test]
async fn test_progress_is_monotonic_for_observers() {
    let session = session(two_document_loader());
    let mut rx = session.subscribe();

    let generation = session.submit(RenderRequest::new("a.pdf"));

    let mut last_progress = 0;
    loop {
        rx.changed().await.unwrap();
        let state = rx.borrow_and_update().clone();
        if state.generation != generation {
            continue;
        }
        assert!(state.progress_percent >= last_progress);
        last_progress = state.progress_percent;
        assert_consistent(&state);
        if !state.loading {
            break;
        }
    }
    assert_eq!(last_progress, 100);
}

#[tokio::test]
async fn test_supersession_never_mixes_documents() {
    let loader = two_document_loader();
    let log = loader.log();
    let session = Arc::new(session(loader));

    // Record every state any observer could see
    let observed: Arc<Mutex<Vec<RenderState>>> = Arc::new(Mutex::new(Vec::new()));
    let mut rx = session.subscribe();
    let recorder = {
        let observed = observed.clone();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let state = rx.borrow_and_update().clone();
                observed.lock().unwrap().push(state);
            }
        })
    };

    let first = session.submit(RenderRequest::new("a.pdf"));

    // Let a few pages of A arrive
    let mut rx = session.subscribe();
    rx.wait_for(|s| s.images.len() >= 2).await.unwrap();

    let second = session.submit(RenderRequest::new("b.pdf"));
    assert!(second > first);

    // A is gone for good
    assert!(session.wait_for_generation(first).await.is_none());

    let state = session.wait_for_generation(second).await.unwrap();
    assert_eq!(state.source_locator.as_deref(), Some("b.pdf"));
    let pages: Vec<u32> = state.images.iter().map(|i| i.page_number()).collect();
    assert_eq!(pages, vec![1, 2, 3]);
    assert_consistent(&state);

    // Give any straggling A events a chance to (wrongly) land
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_consistent(&session.state());
    assert_eq!(session.state().images.len(), 3);

    // The superseded run stopped well short of its 20 pages
    assert!(log.draws_for("a.pdf").len() < 20);

    recorder.abort();
    for state in observed.lock().unwrap().iter() {
        assert_consistent(state);
    }
}

#[tokio::test]
async fn test_superseding_with_same_locator_restarts() {
    let session = session(two_document_loader());

    let first = session.submit(RenderRequest::new("b.pdf"));
    let second = session.submit(RenderRequest::new("b.pdf"));
    assert_eq!(second, first + 1);

    let state = session.wait_for_generation(second).await.unwrap();
    assert_eq!(state.images.len(), 3);
    assert_eq!(state.generation, second);
}

#[tokio::test]
async fn test_failed_request_then_recovery() {
    let session = session(two_document_loader());

    let failed = session.submit(RenderRequest::new("missing.pdf"));
    let state = session.wait_for_generation(failed).await.unwrap();
    assert!(state.is_failed());
    assert!(state.images.is_empty());
    assert!(!state.loading);

    // Retrying with a good locator clears the error
    let retry = session.submit(RenderRequest::new("b.pdf"));
    let state = session.wait_for_generation(retry).await.unwrap();
    assert!(state.error.is_none());
    assert_eq!(state.images.len(), 3);
}

#[tokio::test]
async fn test_clear_returns_to_idle() {
    let session = session(two_document_loader());

    let generation = session.submit(RenderRequest::new("a.pdf"));
    session.clear();

    let state = session.state();
    assert!(state.source_locator.is_none());
    assert!(!state.loading);
    assert!(state.images.is_empty());
    assert!(state.generation > generation);

    assert!(session.wait_for_generation(generation).await.is_none());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(session.state().images.is_empty());
}
