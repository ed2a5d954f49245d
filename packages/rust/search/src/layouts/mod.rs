//! Result-page layout trait and built-in layouts for finding extraction.
//!
//! Google's markup changes often, so extraction is split into layouts that
//! are tried in priority order. The first layout that detects its markup and
//! yields at least one finding wins.

mod anchors;
mod google;

use scraper::{ElementRef, Html};
use vendorrisk_shared::Finding;

pub use anchors::AnchorFallbackLayout;
pub use google::GoogleOrganicLayout;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// A strategy for pulling title/url/snippet triples out of a result page.
pub trait SerpLayout: Send + Sync {
    /// Whether this layout's markup is present in the document.
    fn detect(&self, doc: &Html) -> bool;

    /// Extract findings in document order.
    fn extract(&self, doc: &Html) -> Vec<Finding>;

    /// Human-readable layout name for tracing.
    fn name(&self) -> &'static str;
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Holds registered layouts in priority order.
pub struct LayoutRegistry {
    layouts: Vec<Box<dyn SerpLayout>>,
}

impl LayoutRegistry {
    /// Create a registry with the built-in layouts (organic results first, anchors last).
    pub fn new() -> Self {
        Self {
            layouts: vec![Box::new(GoogleOrganicLayout), Box::new(AnchorFallbackLayout)],
        }
    }

    /// Run layouts in order and return the first non-empty extraction with its layout name.
    pub fn extract(&self, doc: &Html) -> Option<(&'static str, Vec<Finding>)> {
        for layout in &self.layouts {
            if !layout.detect(doc) {
                continue;
            }
            let findings = layout.extract(doc);
            if !findings.is_empty() {
                return Some((layout.name(), findings));
            }
        }
        None
    }
}

impl Default for LayoutRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Join an element's trimmed, non-empty text nodes with single spaces.
pub(crate) fn stripped_text(el: &ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
