// src/services/crawl.rs

//! Crawl orchestration: listing walk, then one extraction per unique link.

use std::time::Duration;

use chrono::Utc;

use crate::browser::Browser;
use crate::error::Result;
use crate::models::{Config, CrawlState, CrawlSummary, ExtractionResult, MunicipalityLink};
use crate::services::detail::DetailExtractor;
use crate::services::links::dedup_by_url;
use crate::services::pagination::{PaginationWalker, WalkOutcome};
use crate::utils::budget::RunBudget;

/// Rows of one run plus its counts.
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    /// One row per unique link, in discovery order
    pub results: Vec<ExtractionResult>,
    pub summary: CrawlSummary,
}

/// Drives the walker and the extractor over one browser session.
#[derive(Debug, Clone)]
pub struct MayorCrawler {
    walker: PaginationWalker,
    extractor: DetailExtractor,
    request_delay: Duration,
    run_budget: Duration,
}

impl MayorCrawler {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            walker: PaginationWalker::new(config)?,
            extractor: DetailExtractor::new(config),
            request_delay: config.crawler.request_delay(),
            run_budget: config.crawler.run_budget(),
        })
    }

    /// Walk the listing only.
    pub async fn discover(&self, browser: &mut dyn Browser) -> WalkOutcome {
        self.walker.walk(browser, &RunBudget::new(self.run_budget)).await
    }

    /// Walk the listing, then extract every discovered detail page.
    pub async fn run(&self, browser: &mut dyn Browser) -> CrawlOutcome {
        let started = Utc::now();
        let budget = RunBudget::new(self.run_budget);

        let walk = self.walker.walk(browser, &budget).await;
        self.extract_all(browser, walk.links, walk.pages_visited, &budget, started)
            .await
    }

    /// Extract a known set of links, skipping the listing walk.
    pub async fn run_links(
        &self,
        browser: &mut dyn Browser,
        links: Vec<MunicipalityLink>,
    ) -> CrawlOutcome {
        let started = Utc::now();
        let budget = RunBudget::new(self.run_budget);
        self.extract_all(browser, links, 0, &budget, started).await
    }

    async fn extract_all(
        &self,
        browser: &mut dyn Browser,
        links: Vec<MunicipalityLink>,
        listing_pages: usize,
        budget: &RunBudget,
        started: chrono::DateTime<Utc>,
    ) -> CrawlOutcome {
        let links = dedup_by_url(links);
        let total = links.len();
        let mut state = CrawlState::new();
        let mut degraded = 0;
        let mut skipped = 0;
        let mut budget_logged = false;

        for (idx, link) in links.iter().enumerate() {
            if state.is_visited(&link.url) {
                continue;
            }

            let result = if budget.exhausted() {
                if !budget_logged {
                    log::warn!(
                        "Run budget exhausted after {:?}; {} page(s) left unvisited",
                        budget.elapsed(),
                        total - idx
                    );
                    budget_logged = true;
                }
                skipped += 1;
                degraded += 1;
                ExtractionResult::unresolved(link)
            } else {
                log::info!("[{}/{}] {}", idx + 1, total, link.display_text);
                let result = match self.extractor.extract(browser, link).await {
                    Ok(result) => result,
                    Err(e) => {
                        log::warn!("Extraction failed for {}: {}", link.url, e);
                        degraded += 1;
                        ExtractionResult::unresolved(link)
                    }
                };
                if idx + 1 < total && !self.request_delay.is_zero() {
                    tokio::time::sleep(self.request_delay).await;
                }
                result
            };

            state.record(result);
        }

        let summary = CrawlSummary::from_results(
            state.results(),
            started,
            listing_pages,
            total,
            skipped,
            degraded,
        );
        CrawlOutcome {
            results: state.into_results(),
            summary,
        }
    }
}
