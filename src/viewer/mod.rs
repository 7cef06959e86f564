//! Read-only consumers of [`RenderState`](crate::render::RenderState).
//!
//! Both helpers only look at `images`; they work while a run is still in
//! progress and when some pages are missing.

mod scroll;
mod slideshow;

pub use scroll::{PlacedPage, ScrollLayout, DEFAULT_PAGE_GAP, MAX_ZOOM, MIN_ZOOM, ZOOM_STEP};
pub use slideshow::SlideshowCursor;
