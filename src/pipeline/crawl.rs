// src/pipeline/crawl.rs

//! Mayor crawling pipeline.

use crate::browser::Browser;
use crate::error::Result;
use crate::models::{Config, CrawlSummary, MunicipalityLink};
use crate::services::MayorCrawler;
use crate::storage::ResultSink;

/// Run the crawler and hand every row to `sink`.
///
/// With `links`, the listing walk is skipped and exactly those detail pages
/// are visited.
pub async fn run_crawler(
    config: &Config,
    browser: &mut dyn Browser,
    sink: &dyn ResultSink,
    links: Option<Vec<MunicipalityLink>>,
) -> Result<CrawlSummary> {
    log::info!("=== Mayor contact crawl ===");

    let crawler = MayorCrawler::new(config)?;
    let outcome = match links {
        Some(links) => {
            log::info!("Visiting {} saved links", links.len());
            crawler.run_links(browser, links).await
        }
        None => {
            log::info!("Walking listing at {}", config.crawler.start_url);
            crawler.run(browser).await
        }
    };

    let written = sink.write_results(&outcome.results).await?;
    log::info!("Saved {} rows to {}", written.rows, written.location);

    for (label, value) in outcome.summary.items() {
        log::info!("{label}: {value}");
    }
    Ok(outcome.summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fixture::FixtureBrowser;
    use crate::storage::CsvSink;

    #[tokio::test]
    async fn test_saved_links_end_in_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mayors.csv");
        let sink = CsvSink::new(&path);

        let url = "https://iisda.government.bg/ras/adm/7";
        let mut browser = FixtureBrowser::new().page(
            url,
            r#"<html><body><h1>Община Рила</h1><p><a href="mailto:obshtina@rila.bg">пишете ни</a></p></body></html>"#,
        );
        let mut config = Config::default();
        config.browser.element_timeout_ms = 0;
        config.crawler.detail_settle_ms = 0;
        config.crawler.disclosure_wait_ms = 0;
        config.crawler.request_delay_ms = 0;

        let summary = run_crawler(
            &config,
            &mut browser,
            &sink,
            Some(vec![MunicipalityLink::new("Общинска администрация - Рила", url)]),
        )
        .await
        .unwrap();

        assert_eq!(summary.pages_visited, 1);
        assert_eq!(summary.with_email, 1);
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("Община Рила,,obshtina@rila.bg,https://iisda.government.bg/ras/adm/7\n"));
    }
}
