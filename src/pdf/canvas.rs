use pdf_writer::Content;

use crate::config::PageGeometry;
use crate::fonts::FontSet;
use crate::model::{BlockKind, HeaderStamp, Placement};

use super::header::{Emblem, HeaderLayout};

/// Tolerance for "fits" comparisons so an exact fill does not trigger a break.
pub(super) const FIT_EPSILON: f32 = 1e-3;

/// The pages of one document under construction, with everything needed to
/// start a fresh page: geometry, fonts, and the precomputed letterhead.
pub(super) struct Canvas {
    pub(super) geometry: PageGeometry,
    pub(super) fonts: FontSet,
    pub(super) header: HeaderLayout,
    pub(super) emblem: Option<Emblem>,
    pages: Vec<Content>,
    headers: Vec<HeaderStamp>,
    current: usize,
    placements: Vec<Placement>,
    block: usize,
}

impl Canvas {
    pub(super) fn new(geometry: PageGeometry, fonts: FontSet, header: HeaderLayout, emblem: Option<Emblem>) -> Self {
        Self {
            geometry,
            fonts,
            header,
            emblem,
            pages: Vec::new(),
            headers: Vec::new(),
            current: 0,
            placements: Vec::new(),
            block: 0,
        }
    }

    /// Append a page, paint the letterhead on it and make it current.
    /// Returns the y where content starts.
    pub(super) fn start_page(&mut self) -> f32 {
        let mut content = Content::new();
        let stamp = self.header.paint(&mut content, &mut self.fonts, &self.geometry);
        self.pages.push(content);
        self.headers.push(stamp);
        self.current = self.pages.len() - 1;
        log::debug!(
            "page {} started, content from y={:.2}mm",
            self.pages.len(),
            self.header.bottom
        );
        self.header.bottom
    }

    /// Whether a unit `height` tall drawn at `y` crosses the safe bottom.
    pub(super) fn overflows(&self, y: f32, height: f32) -> bool {
        y + height > self.geometry.safe_bottom() + FIT_EPSILON
    }

    /// Vertical room between the letterhead and the safe bottom of a page.
    pub(super) fn capacity(&self) -> f32 {
        self.geometry.safe_bottom() - self.header.bottom
    }

    pub(super) fn jump_to_last_page(&mut self) {
        self.current = self.pages.len().saturating_sub(1);
    }

    /// The current page's content stream together with the fonts, split so both
    /// can be borrowed mutably at once.
    pub(super) fn surface(&mut self) -> (&mut Content, &mut FontSet) {
        (&mut self.pages[self.current], &mut self.fonts)
    }

    pub(super) fn record(&mut self, kind: BlockKind, top: f32, bottom: f32) {
        self.placements.push(Placement {
            block: self.block,
            kind,
            page: self.current,
            top,
            bottom,
        });
    }

    pub(super) fn finish_block(&mut self) {
        self.block += 1;
    }

    pub(super) fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub(super) fn current_page(&self) -> usize {
        self.current
    }

    pub(super) fn placements(&self) -> &[Placement] {
        &self.placements
    }

    pub(super) fn headers(&self) -> &[HeaderStamp] {
        &self.headers
    }

    pub(super) fn into_parts(self) -> (PageGeometry, FontSet, Option<Emblem>, Vec<Content>) {
        (self.geometry, self.fonts, self.emblem, self.pages)
    }
}
