// src/services/links.rs

//! Listing link collector.
//!
//! Picks the municipality administration anchors out of one listing page.

use std::collections::HashSet;

use scraper::Html;
use url::Url;

use crate::browser::{RenderedPage, dom};
use crate::error::Result;
use crate::models::{Config, MunicipalityLink};
use crate::utils::{normalize_whitespace, resolve_url};

/// Collects detail links whose text carries the marker phrase.
#[derive(Debug, Clone)]
pub struct LinkCollector {
    marker: String,
    base: Url,
}

impl LinkCollector {
    /// Create a collector for `marker`, resolving links against `base`.
    pub fn new(marker: &str, base: Url) -> Self {
        Self {
            marker: normalize_whitespace(marker).to_lowercase(),
            base,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            &config.markers.link_marker,
            config.crawler.base_url()?,
        ))
    }

    /// Qualifying links on the page, deduplicated by URL in first-seen order.
    pub fn collect(&self, page: &RenderedPage) -> Vec<MunicipalityLink> {
        self.collect_from(&page.document())
    }

    pub fn collect_from(&self, document: &Html) -> Vec<MunicipalityLink> {
        let Some(anchor_sel) = dom::selector("a[href]") else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut links = Vec::new();

        for anchor in document.select(&anchor_sel) {
            let text = dom::element_text(anchor);
            if !text.to_lowercase().contains(&self.marker) {
                continue;
            }
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() || href == "#" || href.to_lowercase().starts_with("javascript:") {
                continue;
            }

            let url = resolve_url(&self.base, href);
            if seen.insert(url.clone()) {
                links.push(MunicipalityLink::new(text, url));
            }
        }

        links
    }
}

/// Drop later links whose URL was already seen, keeping order.
pub fn dedup_by_url(links: impl IntoIterator<Item = MunicipalityLink>) -> Vec<MunicipalityLink> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.url.clone()))
        .collect()
}
