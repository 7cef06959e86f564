use crate::render::{PageImage, RenderState};

/// One-image-at-a-time navigation over rendered pages.
///
/// Slides are 1-based positions in `images`, not page numbers: when a page
/// failed to render the slideshow simply skips it. The cursor is clamped to
/// `[1, images.len()]` on every access, so it stays valid as images arrive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideshowCursor {
    slide: usize,
}

impl Default for SlideshowCursor {
    fn default() -> Self {
        Self::new()
    }
}

impl SlideshowCursor {
    pub fn new() -> Self {
        Self { slide: 1 }
    }

    /// Current slide, or `None` while there is nothing to show.
    pub fn current_slide(&self, images: &[PageImage]) -> Option<usize> {
        if images.is_empty() {
            None
        } else {
            Some(self.slide.clamp(1, images.len()))
        }
    }

    /// Image under the cursor.
    pub fn current<'a>(&self, images: &'a [PageImage]) -> Option<&'a PageImage> {
        self.current_slide(images).map(|slide| &images[slide - 1])
    }

    /// Move forward one slide. Returns false at the last slide.
    pub fn next(&mut self, images: &[PageImage]) -> bool {
        match self.current_slide(images) {
            Some(slide) if slide < images.len() => {
                self.slide = slide + 1;
                true
            }
            _ => false,
        }
    }

    /// Move back one slide. Returns false at the first slide.
    pub fn previous(&mut self, images: &[PageImage]) -> bool {
        match self.current_slide(images) {
            Some(slide) if slide > 1 => {
                self.slide = slide - 1;
                true
            }
            _ => false,
        }
    }

    /// Jump to `slide`. Out-of-range targets are rejected.
    pub fn jump(&mut self, slide: usize, images: &[PageImage]) -> bool {
        if slide == 0 || slide > images.len() {
            return false;
        }
        self.slide = slide;
        true
    }

    /// Short status line, e.g. `Slide 2 of 4 (page 3, rendering 60%)`.
    pub fn status(&self, state: &RenderState) -> String {
        let Some(slide) = self.current_slide(&state.images) else {
            return if state.loading {
                format!("Rendering {}%", state.progress_percent)
            } else {
                "No pages".to_string()
            };
        };

        let page_number = state.images[slide - 1].page_number();
        if state.loading {
            format!(
                "Slide {} of {} (page {}, rendering {}%)",
                slide,
                state.images.len(),
                page_number,
                state.progress_percent
            )
        } else {
            format!(
                "Slide {} of {} (page {})",
                slide,
                state.images.len(),
                page_number
            )
        }
    }
}
