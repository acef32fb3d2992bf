// src/pipeline/links.rs

//! Listing discovery pipeline.

use std::path::Path;

use crate::browser::Browser;
use crate::error::Result;
use crate::models::{Config, MunicipalityLink};
use crate::services::{MayorCrawler, WalkOutcome};

/// Walk the listing and save the discovered links as JSON.
pub async fn run_link_discovery(
    config: &Config,
    browser: &mut dyn Browser,
    output: impl AsRef<Path>,
) -> Result<WalkOutcome> {
    log::info!("=== Listing discovery ===");

    let crawler = MayorCrawler::new(config)?;
    let outcome = crawler.discover(browser).await;

    MunicipalityLink::save_all(&outcome.links, output.as_ref())?;
    log::info!(
        "Saved {} links from {} listing pages to {} ({})",
        outcome.links.len(),
        outcome.pages_visited,
        output.as_ref().display(),
        outcome.stop_reason
    );
    Ok(outcome)
}
