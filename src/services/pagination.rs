// src/services/pagination.rs

//! Listing traversal.
//!
//! The walker owns the browser for the duration of the walk. It alternates
//! between collecting the current page's links and advancing to the next
//! page until no next-page control works, the page cap is hit, or the run
//! budget is spent.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use crate::browser::{Browser, Locator};
use crate::error::Result;
use crate::models::{Config, MarkerConfig, MunicipalityLink};
use crate::services::links::LinkCollector;
use crate::utils::budget::RunBudget;

/// Position of the walker in its collect/advance cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkState {
    Collecting,
    Advancing,
    Done,
}

/// Why the walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// No next-page control could be activated
    NoNextPage,
    /// The configured page cap was reached
    PageLimit,
    /// The run budget ran out
    BudgetExhausted,
    /// The starting page could not be loaded
    NavigationFailed,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            StopReason::NoNextPage => "no next page",
            StopReason::PageLimit => "page limit reached",
            StopReason::BudgetExhausted => "run budget exhausted",
            StopReason::NavigationFailed => "start page unreachable",
        };
        f.write_str(text)
    }
}

/// Links accumulated over the whole listing.
#[derive(Debug, Clone)]
pub struct WalkOutcome {
    /// Unique links in first-seen order
    pub links: Vec<MunicipalityLink>,
    /// Listing pages whose links were collected
    pub pages_visited: usize,
    pub stop_reason: StopReason,
}

/// Next-page heuristics in the order they are tried.
///
/// Each label is tried as the text of a link, then as the exact text of
/// any element; the CSS fallbacks come last.
pub fn next_page_locators(markers: &MarkerConfig) -> Vec<Locator> {
    let mut locators = Vec::new();
    for label in &markers.next_page_labels {
        locators.push(Locator::LinkText(label.clone()));
        locators.push(Locator::ExactText(label.clone()));
    }
    locators.extend(
        markers
            .next_page_selectors
            .iter()
            .map(|css| Locator::Css(css.clone())),
    );
    locators
}

/// Walks a paginated listing collecting detail links.
#[derive(Debug, Clone)]
pub struct PaginationWalker {
    collector: LinkCollector,
    start_url: String,
    next_page: Vec<Locator>,
    listing_ready: Locator,
    max_pages: usize,
    transition_wait: Duration,
    element_timeout: Duration,
}

impl PaginationWalker {
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            collector: LinkCollector::from_config(config)?,
            start_url: config.crawler.start_url.clone(),
            next_page: next_page_locators(&config.markers),
            listing_ready: Locator::Css(config.markers.listing_ready_selector.clone()),
            max_pages: config.crawler.max_pages,
            transition_wait: config.crawler.page_transition_wait(),
            element_timeout: config.browser.element_timeout(),
        })
    }

    /// Walk the listing from the start page.
    pub async fn walk(&self, browser: &mut dyn Browser, budget: &RunBudget) -> WalkOutcome {
        let mut links = Vec::new();
        let mut seen = HashSet::new();
        let mut pages_visited = 0;

        log::info!("Opening listing {}", self.start_url);
        if let Err(e) = browser.navigate(&self.start_url).await {
            log::error!("Could not open listing: {}", e);
            return WalkOutcome {
                links,
                pages_visited,
                stop_reason: StopReason::NavigationFailed,
            };
        }

        let mut state = WalkState::Collecting;
        let mut stop_reason = StopReason::NoNextPage;

        while state != WalkState::Done {
            state = match state {
                WalkState::Collecting => {
                    pages_visited += 1;
                    if !browser.wait_for(&self.listing_ready, self.element_timeout).await {
                        log::debug!("Listing page {} not ready in time, reading anyway", pages_visited);
                    }

                    match browser.current_document().await {
                        Ok(page) => {
                            let found = self.collector.collect(&page);
                            let before = links.len();
                            links.extend(
                                found
                                    .iter()
                                    .filter(|link| seen.insert(link.url.clone()))
                                    .cloned(),
                            );
                            log::info!(
                                "Listing page {}: {} links ({} new, {} total)",
                                pages_visited,
                                found.len(),
                                links.len() - before,
                                links.len()
                            );
                        }
                        Err(e) => log::warn!("Could not read listing page {}: {}", pages_visited, e),
                    }

                    if pages_visited >= self.max_pages {
                        stop_reason = StopReason::PageLimit;
                        WalkState::Done
                    } else if budget.exhausted() {
                        stop_reason = StopReason::BudgetExhausted;
                        WalkState::Done
                    } else {
                        WalkState::Advancing
                    }
                }
                WalkState::Advancing => {
                    if self.advance(browser).await {
                        if !self.transition_wait.is_zero() {
                            tokio::time::sleep(self.transition_wait).await;
                        }
                        WalkState::Collecting
                    } else {
                        stop_reason = StopReason::NoNextPage;
                        WalkState::Done
                    }
                }
                WalkState::Done => WalkState::Done,
            };
        }

        log::info!(
            "Listing walk finished after {} pages ({}): {} unique links",
            pages_visited,
            stop_reason,
            links.len()
        );

        WalkOutcome {
            links,
            pages_visited,
            stop_reason,
        }
    }

    /// Try each next-page heuristic until one activates.
    async fn advance(&self, browser: &mut dyn Browser) -> bool {
        for locator in &self.next_page {
            let handle = match browser.find(locator).await {
                Ok(Some(handle)) => handle,
                Ok(None) => continue,
                Err(e) => {
                    log::debug!("Next-page lookup {:?} failed: {}", locator, e);
                    continue;
                }
            };

            match browser.click(handle).await {
                Ok(true) => {
                    log::debug!("Advanced listing via {:?}", locator);
                    return true;
                }
                Ok(false) => log::debug!("Next-page control {:?} had no effect", locator),
                Err(e) => log::debug!("Next-page click {:?} failed: {}", locator, e),
            }
        }
        false
    }
}
