//! Organic Google result blocks (`div.tF2Cxc` and the older `div.g`).

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use vendorrisk_shared::Finding;

use super::{SerpLayout, stripped_text};

static BLOCK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.tF2Cxc, div.g").expect("valid selector"));
static TITLE_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h3").expect("valid selector"));
static LINK_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));
static SNIPPET_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.VwiC3b").expect("valid selector"));

/// Extracts one finding per organic result block that has both a heading and a link.
///
/// Newer markup nests `div.tF2Cxc` inside `div.g`, so the same result can be
/// matched twice; only the first occurrence of a URL is kept.
pub struct GoogleOrganicLayout;

impl SerpLayout for GoogleOrganicLayout {
    fn detect(&self, doc: &Html) -> bool {
        doc.select(&BLOCK_SEL).next().is_some()
    }

    fn extract(&self, doc: &Html) -> Vec<Finding> {
        let mut findings = Vec::new();
        let mut seen = HashSet::new();

        for block in doc.select(&BLOCK_SEL) {
            let Some(title) = block.select(&TITLE_SEL).next() else {
                continue;
            };
            let Some(href) = block
                .select(&LINK_SEL)
                .next()
                .and_then(|a| a.value().attr("href"))
            else {
                continue;
            };

            if !seen.insert(href.to_string()) {
                continue;
            }

            let snippet = block
                .select(&SNIPPET_SEL)
                .next()
                .map(|el| stripped_text(&el))
                .unwrap_or_default();

            findings.push(Finding::new(stripped_text(&title), href, snippet));
        }

        findings
    }

    fn name(&self) -> &'static str {
        "google-organic"
    }
}
