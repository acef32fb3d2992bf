// src/browser/http.rs

//! Static HTML backend over plain HTTP.
//!
//! Works for server-rendered directories. Scripts never run, so clicks only
//! have an effect on elements carrying a navigable `href`.

use async_trait::async_trait;
use reqwest::Client;

use crate::browser::snapshot::SnapshotSession;
use crate::browser::{Browser, ElementHandle, Locator, RenderedPage};
use crate::error::{AppError, Result};
use crate::models::BrowserConfig;
use crate::utils::http::create_async_client;
use crate::utils::resolve_url;

/// Browser that fetches documents with `reqwest`.
pub struct HttpBrowser {
    client: Client,
    session: SnapshotSession,
}

impl HttpBrowser {
    /// Create a backend with the configured user agent and timeout.
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            session: SnapshotSession::new(),
        })
    }

    async fn fetch(&self, url: &str) -> Result<RenderedPage> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AppError::navigation(url, e))?;
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| AppError::navigation(url, e))?;
        Ok(RenderedPage::new(final_url, html))
    }
}

/// Target URL for an `href`, skipping script and same-page anchors.
fn navigable_href(page_url: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.to_lowercase().starts_with("javascript:") {
        return None;
    }
    let base = url::Url::parse(page_url).ok()?;
    Some(resolve_url(&base, href))
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        let page = self.fetch(url).await?;
        log::debug!("Fetched {} ({} bytes)", page.url, page.html.len());
        self.session.load(page);
        Ok(())
    }

    async fn current_document(&mut self) -> Result<RenderedPage> {
        self.session
            .current()
            .cloned()
            .ok_or_else(|| AppError::browser("no page loaded"))
    }

    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementHandle>> {
        Ok(self.session.find(locator))
    }

    async fn click(&mut self, element: ElementHandle) -> Result<bool> {
        let Some(target) = self.session.resolve(element) else {
            return Ok(false);
        };
        let Some(url) = target
            .href
            .as_deref()
            .and_then(|href| navigable_href(&target.page_url, href))
        else {
            log::debug!("Element has no navigable href; click has no effect without scripts");
            return Ok(false);
        };

        match self.navigate(&url).await {
            Ok(()) => Ok(true),
            Err(e) => {
                log::warn!("Click navigation to {} failed: {}", url, e);
                Ok(false)
            }
        }
    }

    async fn switch_to_latest_context(&mut self) -> Result<bool> {
        Ok(self.session.switch_latest())
    }

    async fn restore_context(&mut self) -> Result<()> {
        self.session.restore();
        Ok(())
    }
}
