// src/services/detail.rs

//! Detail page extraction.
//!
//! Loads one detail page and runs the email strategies in chain order until
//! one yields an address. The municipality and mayor names are read
//! independently of which strategy wins.

use std::time::Duration;

use tokio::time::Instant;

use crate::browser::{Browser, Locator, RenderedPage};
use crate::error::{AppError, Result};
use crate::models::{Config, ExtractionResult, MarkerConfig, MunicipalityLink, Strategy};
use crate::services::strategies;

/// Interval between reads while waiting for disclosed content.
const REVEAL_POLL: Duration = Duration::from_millis(200);

/// Names read from the page, filled by whichever step finds them first.
#[derive(Debug, Default)]
struct PageFields {
    heading: Option<String>,
    mayor_name: Option<String>,
}

impl PageFields {
    fn read(page: &RenderedPage, markers: &MarkerConfig) -> Self {
        let document = page.document();
        Self {
            heading: strategies::page_heading(&document),
            mayor_name: strategies::official_name(&document, markers),
        }
    }
}

/// Extracts the official's contact from detail pages.
#[derive(Debug, Clone)]
pub struct DetailExtractor {
    markers: MarkerConfig,
    detail_ready: Locator,
    element_timeout: Duration,
    settle: Duration,
    disclosure_wait: Duration,
}

impl DetailExtractor {
    pub fn new(config: &Config) -> Self {
        Self {
            markers: config.markers.clone(),
            detail_ready: Locator::Css(config.markers.detail_ready_selector.clone()),
            element_timeout: config.browser.element_timeout(),
            settle: config.crawler.detail_settle(),
            disclosure_wait: config.crawler.disclosure_wait(),
        }
    }

    /// Extract one detail page.
    ///
    /// A page that cannot be loaded yields an empty-field result rather than
    /// an error. Errors are reserved for faults after the page loaded.
    pub async fn extract(
        &self,
        browser: &mut dyn Browser,
        link: &MunicipalityLink,
    ) -> Result<ExtractionResult> {
        if let Err(e) = browser.navigate(&link.url).await {
            log::warn!("Skipping {}: {}", link.url, e);
            return Ok(ExtractionResult::unresolved(link));
        }

        if !browser.wait_for(&self.detail_ready, self.element_timeout).await {
            log::debug!("Detail page {} not ready in time, reading anyway", link.url);
        }
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        let page = browser
            .current_document()
            .await
            .map_err(|e| AppError::extraction(&link.url, e))?;
        let mut fields = PageFields::read(&page, &self.markers);

        let mut matched = None;
        for strategy in Strategy::CHAIN {
            let emails = match strategies::for_strategy(strategy) {
                Some(apply) => apply_to(apply, &page, &self.markers),
                None => self.disclose(browser, &page, &mut fields).await,
            };
            if let Some(emails) = emails.filter(|e| !e.is_empty()) {
                log::debug!("{}: {} address(es) via {}", link.url, emails.len(), strategy);
                matched = Some((strategy, emails));
                break;
            }
        }

        let (strategy, emails) = match matched {
            Some((strategy, emails)) => (Some(strategy), emails),
            None => {
                log::info!("No email found on {}", link.url);
                (None, Vec::new())
            }
        };

        Ok(ExtractionResult::new(
            fields.heading.unwrap_or_else(|| link.display_text.clone()),
            fields.mayor_name.unwrap_or_default(),
            emails,
            link.url.clone(),
            strategy,
        ))
    }

    /// Click the official's information control and read what it reveals.
    ///
    /// Every failure here means "nothing found"; the page is left as it was
    /// found as far as the backend allows. Labeled addresses already on
    /// `page` before the click never count as revealed.
    async fn disclose(
        &self,
        browser: &mut dyn Browser,
        page: &RenderedPage,
        fields: &mut PageFields,
    ) -> Option<Vec<String>> {
        let trigger = Locator::Within {
            title: self.markers.official_title.clone(),
            target: self.markers.disclosure_selector.clone(),
        };

        let handle = match browser.find(&trigger).await {
            Ok(Some(handle)) => handle,
            Ok(None) => return None,
            Err(e) => {
                log::debug!("Disclosure control lookup failed: {}", e);
                return None;
            }
        };
        match browser.click(handle).await {
            Ok(true) => {}
            Ok(false) => {
                log::debug!("Disclosure control had no effect");
                return None;
            }
            Err(e) => {
                log::debug!("Disclosure click failed: {}", e);
                return None;
            }
        }

        let switched = browser.switch_to_latest_context().await.unwrap_or_else(|e| {
            log::debug!("Context switch after disclosure failed: {}", e);
            false
        });

        let known = labeled_addresses(page, &self.markers);
        let emails = self.read_revealed(browser, &known, fields).await;
        self.dismiss(browser, switched).await;
        emails
    }

    /// Poll the current document until the revealed content yields an
    /// address outside `known`.
    async fn read_revealed(
        &self,
        browser: &mut dyn Browser,
        known: &[String],
        fields: &mut PageFields,
    ) -> Option<Vec<String>> {
        let deadline = Instant::now() + self.disclosure_wait;
        loop {
            let page = match browser.current_document().await {
                Ok(page) => page,
                Err(e) => {
                    log::debug!("Could not read disclosed content: {}", e);
                    return None;
                }
            };

            let (emails, name) = revealed_fields(&page, &self.markers, known);
            if fields.mayor_name.is_none() {
                fields.mayor_name = name;
            }
            if emails.is_some() {
                return emails;
            }

            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            tokio::time::sleep(REVEAL_POLL.min(deadline - now)).await;
        }
    }

    /// Close whatever the disclosure opened. Best effort.
    async fn dismiss(&self, browser: &mut dyn Browser, switched: bool) {
        if switched {
            if let Err(e) = browser.restore_context().await {
                log::debug!("Restoring context failed: {}", e);
            }
            return;
        }

        let close = Locator::Css(self.markers.dismiss_selector.clone());
        if let Ok(Some(handle)) = browser.find(&close).await {
            if let Err(e) = browser.click(handle).await {
                log::debug!("Dismissing disclosure failed: {}", e);
            }
        }
    }
}

fn apply_to(
    apply: strategies::PageStrategy,
    page: &RenderedPage,
    markers: &MarkerConfig,
) -> Option<Vec<String>> {
    apply(&page.document(), markers)
}

/// Every labeled address on the page.
fn labeled_addresses(page: &RenderedPage, markers: &MarkerConfig) -> Vec<String> {
    strategies::labeled_groups(&page.document(), markers)
        .into_iter()
        .flatten()
        .collect()
}

/// Addresses and name readable from a disclosed document.
///
/// The official's block is trusted as is; page-wide labels only count when
/// they carry an address that was not on the page before the click.
fn revealed_fields(
    page: &RenderedPage,
    markers: &MarkerConfig,
    known: &[String],
) -> (Option<Vec<String>>, Option<String>) {
    let document = page.document();
    let emails = strategies::structured_block(&document, markers).or_else(|| {
        strategies::labeled_groups(&document, markers)
            .into_iter()
            .map(|group| {
                group
                    .into_iter()
                    .filter(|address| !known.contains(address))
                    .collect::<Vec<_>>()
            })
            .find(|fresh| !fresh.is_empty())
    });
    (emails, strategies::official_name(&document, markers))
}
