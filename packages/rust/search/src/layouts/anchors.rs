//! Fallback layout: every absolute link with visible text.

use std::sync::LazyLock;

use scraper::{Html, Selector};
use vendorrisk_shared::Finding;

use super::{SerpLayout, stripped_text};

static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

/// Used when no known result markup is found. Always matches.
pub struct AnchorFallbackLayout;

impl SerpLayout for AnchorFallbackLayout {
    fn detect(&self, _doc: &Html) -> bool {
        true
    }

    fn extract(&self, doc: &Html) -> Vec<Finding> {
        doc.select(&ANCHOR_SEL)
            .filter_map(|a| {
                let href = a.value().attr("href")?;
                let text = stripped_text(&a);
                (!text.is_empty() && href.contains("http"))
                    .then(|| Finding::new(text, href, String::new()))
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "anchors"
    }
}
