//! Web evidence gathering: SERP proxy client and result-page extraction.
//!
//! This crate provides:
//! - [`layouts`] — result-page layouts (organic Google blocks, plain anchors)
//! - [`LayoutRegistry`] — tries layouts in priority order
//! - [`SearchClient`] — fetches result pages through the SERP proxy

pub mod client;
pub mod layouts;

pub use client::{FindingSource, SearchClient, build_search_url, parse_serp_html};
pub use layouts::{AnchorFallbackLayout, GoogleOrganicLayout, LayoutRegistry, SerpLayout};
