// src/browser/mod.rs

//! Browser capability surface used by the crawler.
//!
//! The crawler never talks to a transport directly. It drives one owned
//! [`Browser`] handle, passed as `&mut dyn Browser`, so only one component
//! can act on the current page at a time.
//!
//! Backends:
//! - `ChromeBrowser` (feature `chrome`): headless Chrome over CDP
//! - [`HttpBrowser`]: static HTML over plain HTTP, no script execution

#[cfg(feature = "chrome")]
mod chrome;
pub mod dom;
#[cfg(test)]
pub(crate) mod fixture;
mod http;
mod snapshot;

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tokio::time::Instant;

use crate::error::Result;
use crate::models::{BackendKind, BrowserConfig};

#[cfg(feature = "chrome")]
pub use chrome::ChromeBrowser;
pub use http::HttpBrowser;

/// Interval between checks while waiting for an element.
const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Immutable snapshot of a rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPage {
    /// URL the snapshot was taken at
    pub url: String,

    /// Serialized document
    pub html: String,
}

impl RenderedPage {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
        }
    }

    /// Parse the snapshot into a document tree.
    pub fn document(&self) -> Html {
        Html::parse_document(&self.html)
    }
}

/// How an element is looked up on the current page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    /// CSS selector
    Css(String),
    /// Anchor whose whole visible text equals the label
    LinkText(String),
    /// Element whose own text equals the label
    ExactText(String),
    /// `target` selector inside the parent of the element titled `title`
    Within { title: String, target: String },
}

/// Opaque reference to an element found on the current page.
///
/// Handles go stale when the page changes; clicking a stale handle is a
/// no-op that reports `false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(u64);

impl ElementHandle {
    pub(crate) fn new(id: u64) -> Self {
        Self(id)
    }

    pub(crate) fn id(self) -> u64 {
        self.0
    }
}

/// One stateful browsing session with a single current page.
#[async_trait]
pub trait Browser: Send {
    /// Load `url` into the current context.
    ///
    /// Failure to load the page at all is the only hard error.
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Snapshot the current document.
    async fn current_document(&mut self) -> Result<RenderedPage>;

    /// Look up an element on the current page.
    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementHandle>>;

    /// Activate an element programmatically, even when it is not
    /// interactable. Returns whether anything was activated.
    async fn click(&mut self, element: ElementHandle) -> Result<bool>;

    /// Move into the most recently opened context (tab, dialog window).
    /// Returns `false` when there is no context besides the current one.
    async fn switch_to_latest_context(&mut self) -> Result<bool>;

    /// Return to the primary context, discarding any opened ones.
    async fn restore_context(&mut self) -> Result<()>;

    /// Release the session.
    async fn close(&mut self) -> Result<()> {
        Ok(())
    }

    /// Wait until `locator` matches or `timeout` elapses.
    ///
    /// Lookup errors count as "not yet present".
    async fn wait_for(&mut self, locator: &Locator, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match self.find(locator).await {
                Ok(Some(_)) => return true,
                Ok(None) => {}
                Err(e) => log::debug!("Lookup of {:?} failed while waiting: {}", locator, e),
            }

            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            tokio::time::sleep(POLL_INTERVAL.min(deadline - now)).await;
        }
    }
}

/// Open the backend selected in the configuration.
pub async fn connect(config: &BrowserConfig) -> Result<Box<dyn Browser>> {
    match config.backend {
        #[cfg(feature = "chrome")]
        BackendKind::Chrome => Ok(Box::new(ChromeBrowser::launch(config).await?)),
        #[cfg(not(feature = "chrome"))]
        BackendKind::Chrome => Err(crate::error::AppError::config(
            "browser.backend = \"chrome\" requires the `chrome` feature",
        )),
        BackendKind::Http => Ok(Box::new(HttpBrowser::new(config)?)),
    }
}
