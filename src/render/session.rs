use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use super::pipeline::RenderPipeline;
use super::state::{RenderRequest, RenderState};
use crate::document::DocumentLoader;

/// Live render state for a consumer that may change documents at any time.
///
/// Each [`submit`](Self::submit) starts a new generation and resets the
/// watched state in one step. Events from older runs are applied only while
/// their generation is still current; the check and the write happen under
/// the watch channel's lock, so observers never see pages from two
/// locators in the same state.
pub struct RenderSession<L> {
    pipeline: RenderPipeline<L>,
    state: Arc<watch::Sender<RenderState>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl<L> RenderSession<L>
where
    L: DocumentLoader + 'static,
{
    pub fn new(pipeline: RenderPipeline<L>) -> Self {
        let (state, _) = watch::channel(RenderState::idle());
        Self {
            pipeline,
            state: Arc::new(state),
            forwarder: Mutex::new(None),
        }
    }

    /// Observe the live state.
    pub fn subscribe(&self) -> watch::Receiver<RenderState> {
        self.state.subscribe()
    }

    /// Snapshot of the live state.
    pub fn state(&self) -> RenderState {
        self.state.borrow().clone()
    }

    /// Current generation.
    pub fn generation(&self) -> u64 {
        self.state.borrow().generation
    }

    /// Start rendering `request`, superseding any run in progress.
    ///
    /// The superseded run finishes the page it is on and then stops. Returns
    /// the generation of the new run.
    pub fn submit(&self, request: RenderRequest) -> u64 {
        let mut generation = 0;
        self.state.send_modify(|state| {
            generation = state.generation + 1;
            *state = RenderState::loading(&request, generation);
        });

        debug!(
            locator = %request.source_locator,
            generation,
            "submitting render request"
        );

        let run = self.pipeline.start(request);
        let state = self.state.clone();

        let forwarder = tokio::spawn(async move {
            let (mut events, _handle) = run.into_parts();

            while let Some(event) = events.recv().await {
                let current = state.send_if_modified(|s| {
                    if s.generation != generation {
                        return false;
                    }
                    s.apply(event);
                    true
                });

                if !current {
                    debug!(generation, "render run superseded");
                    break;
                }
            }
        });

        let previous = self
            .forwarder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .replace(forwarder);
        if let Some(previous) = previous {
            previous.abort();
        }

        generation
    }

    /// Wait until `generation` finishes.
    ///
    /// Returns the final state, or `None` if the run was superseded first.
    pub async fn wait_for_generation(&self, generation: u64) -> Option<RenderState> {
        let mut rx = self.state.subscribe();
        let state = rx
            .wait_for(|s| s.generation != generation || !s.loading)
            .await
            .ok()?;

        if state.generation == generation {
            Some(state.clone())
        } else {
            None
        }
    }

    /// Drop the current run and return to the idle state.
    pub fn clear(&self) {
        self.state.send_modify(|state| {
            let generation = state.generation + 1;
            *state = RenderState::idle();
            state.generation = generation;
        });

        if let Some(previous) = self
            .forwarder
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            previous.abort();
        }
    }
}

impl<L> Drop for RenderSession<L> {
    fn drop(&mut self) {
        let forwarder = self
            .forwarder
            .get_mut()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(forwarder) = forwarder {
            forwarder.abort();
        }
    }
}
