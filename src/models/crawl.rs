//! Run-scoped crawl state and summary.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ExtractionResult, Strategy};

/// Accumulated results for one run. Nothing is persisted between runs.
#[derive(Debug, Default)]
pub struct CrawlState {
    visited: HashSet<String>,
    results: Vec<ExtractionResult>,
}

impl CrawlState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a detail URL already has a result.
    pub fn is_visited(&self, url: &str) -> bool {
        self.visited.contains(url)
    }

    /// Record a result; a second result for the same URL is ignored.
    pub fn record(&mut self, result: ExtractionResult) -> bool {
        if !self.visited.insert(result.source_url.clone()) {
            return false;
        }
        self.results.push(result);
        true
    }

    pub fn results(&self) -> &[ExtractionResult] {
        &self.results
    }

    pub fn into_results(self) -> Vec<ExtractionResult> {
        self.results
    }
}

/// Per-run counts for the reporting collaborator.
#[derive(Debug, Clone, Serialize)]
pub struct CrawlSummary {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Listing pages walked
    pub listing_pages: usize,
    /// Unique detail links found on the listing
    pub links_discovered: usize,
    /// Detail pages the browser was sent to
    pub pages_visited: usize,
    /// Rows written without navigating, once the run budget ran out
    pub skipped: usize,
    /// Rows with at least one email
    pub with_email: usize,
    /// Rows produced without a successful page read
    pub degraded: usize,
    /// Rows per winning strategy
    pub by_strategy: HashMap<Strategy, usize>,
}

impl CrawlSummary {
    /// Build a summary from finished results.
    pub fn from_results(
        results: &[ExtractionResult],
        start_time: DateTime<Utc>,
        listing_pages: usize,
        links_discovered: usize,
        skipped: usize,
        degraded: usize,
    ) -> Self {
        let mut by_strategy = HashMap::new();
        for strategy in results.iter().filter_map(|r| r.matched_by) {
            *by_strategy.entry(strategy).or_insert(0) += 1;
        }

        Self {
            start_time,
            end_time: Utc::now(),
            listing_pages,
            links_discovered,
            pages_visited: results.len().saturating_sub(skipped),
            skipped,
            with_email: results.iter().filter(|r| r.has_email()).count(),
            degraded,
            by_strategy,
        }
    }

    /// Summary lines in chain order, for logging.
    pub fn items(&self) -> Vec<(String, String)> {
        let mut items = vec![
            ("Listing pages".to_string(), self.listing_pages.to_string()),
            ("Links discovered".to_string(), self.links_discovered.to_string()),
            ("Pages visited".to_string(), self.pages_visited.to_string()),
            ("Skipped".to_string(), self.skipped.to_string()),
            ("With email".to_string(), self.with_email.to_string()),
            ("Degraded".to_string(), self.degraded.to_string()),
        ];
        for strategy in Strategy::CHAIN {
            let count = self.by_strategy.get(&strategy).copied().unwrap_or(0);
            items.push((format!("  via {strategy}"), count.to_string()));
        }
        let secs = (self.end_time - self.start_time).num_seconds();
        items.push(("Duration".to_string(), format!("{secs}s")));
        items
    }
}
