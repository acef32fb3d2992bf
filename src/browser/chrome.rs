// src/browser/chrome.rs

//! Headless Chrome backend over the DevTools protocol.
//!
//! Locators are evaluated in the page by injected scripts. A found element is
//! tagged with a `data-crawler-handle` attribute so a later click can find it
//! again; re-rendered content drops the tag, which makes the handle stale.

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::target::TargetId;
use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::browser::{Browser, ElementHandle, Locator, RenderedPage};
use crate::error::{AppError, Result};
use crate::models::BrowserConfig;
use crate::utils::normalize_whitespace;

/// Helpers shared by every locator script; mirrors `browser::dom`.
const PRELUDE: &str = r#"
const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
const ownText = (el) => norm(Array.from(el.childNodes)
    .filter((n) => n.nodeType === Node.TEXT_NODE)
    .map((n) => n.textContent.trim())
    .join(' '));
const shown = (el) => !el.closest('script, style, noscript, template, head');
const all = () => Array.from(document.querySelectorAll('*')).filter(shown);
const byOwnText = (label) => all().filter((el) => ownText(el) === label);
"#;

/// Chrome session with one primary tab.
pub struct ChromeBrowser {
    browser: CdpBrowser,
    handler: JoinHandle<()>,
    primary: Page,
    current: Page,
    known_targets: HashSet<TargetId>,
    next_handle: u64,
    navigation_timeout: Duration,
}

impl ChromeBrowser {
    /// Launch Chrome and open a blank primary tab.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let mut builder = CdpConfig::builder()
            .no_sandbox()
            .arg("--disable-dev-shm-usage")
            .arg(format!("--user-agent={}", config.user_agent))
            .request_timeout(config.navigation_timeout());
        if !config.headless {
            builder = builder.with_head();
        }
        let cdp_config = builder.build().map_err(AppError::browser)?;

        let (browser, mut handler) = CdpBrowser::launch(cdp_config)
            .await
            .map_err(AppError::browser)?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    log::debug!("CDP handler event error: {}", e);
                }
            }
        });

        let primary = browser
            .new_page("about:blank")
            .await
            .map_err(AppError::browser)?;
        let mut known_targets = HashSet::new();
        known_targets.insert(primary.target_id().clone());

        log::info!(
            "Chrome launched ({})",
            if config.headless { "headless" } else { "headed" }
        );

        Ok(Self {
            browser,
            handler,
            current: primary.clone(),
            primary,
            known_targets,
            next_handle: 0,
            navigation_timeout: config.navigation_timeout(),
        })
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T> {
        self.current
            .evaluate(script)
            .await
            .map_err(AppError::browser)?
            .into_value::<T>()
            .map_err(AppError::browser)
    }
}

/// JS string literal for `s`.
fn js_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// JS expression evaluating to the first matching element or `undefined`.
fn locator_expr(locator: &Locator) -> String {
    match locator {
        Locator::Css(css) => format!("document.querySelector({})", js_str(css)),
        Locator::LinkText(label) => format!(
            "Array.from(document.querySelectorAll('a')).find((a) => norm(a.textContent) === {})",
            js_str(&normalize_whitespace(label))
        ),
        Locator::ExactText(label) => {
            format!("byOwnText({})[0]", js_str(&normalize_whitespace(label)))
        }
        Locator::Within { title, target } => format!(
            "byOwnText({}).map((el) => el.parentElement && el.parentElement.querySelector({})).find((el) => el)",
            js_str(&normalize_whitespace(title)),
            js_str(target)
        ),
    }
}

/// Script that tags the located element and returns its handle, or -1.
fn find_script(locator: &Locator, handle: u64) -> String {
    format!(
        r#"(() => {{
{PRELUDE}
let el = null;
try {{ el = {expr}; }} catch (e) {{ el = null; }}
if (!el) return -1;
if (!el.dataset.crawlerHandle) el.dataset.crawlerHandle = '{handle}';
return Number(el.dataset.crawlerHandle);
}})()"#,
        expr = locator_expr(locator),
    )
}

/// Script that activates a tagged element; returns whether it still exists.
fn click_script(handle: u64) -> String {
    format!(
        r#"(() => {{
const el = document.querySelector('[data-crawler-handle="{handle}"]');
if (!el) return false;
el.scrollIntoView({{ block: 'center' }});
el.click();
return true;
}})()"#
    )
}

#[async_trait]
impl Browser for ChromeBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        match tokio::time::timeout(self.navigation_timeout, self.current.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AppError::navigation(url, e)),
            Err(_) => Err(AppError::navigation(
                url,
                format!("timed out after {:?}", self.navigation_timeout),
            )),
        }
    }

    async fn current_document(&mut self) -> Result<RenderedPage> {
        let html = self.current.content().await.map_err(AppError::browser)?;
        let url = self
            .current
            .url()
            .await
            .map_err(AppError::browser)?
            .unwrap_or_default();
        Ok(RenderedPage::new(url, html))
    }

    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementHandle>> {
        let candidate = self.next_handle;
        self.next_handle += 1;

        let id: i64 = self.eval(find_script(locator, candidate)).await?;
        Ok(u64::try_from(id).ok().map(ElementHandle::new))
    }

    async fn click(&mut self, element: ElementHandle) -> Result<bool> {
        self.eval(click_script(element.id())).await
    }

    async fn switch_to_latest_context(&mut self) -> Result<bool> {
        let pages = self.browser.pages().await.map_err(AppError::browser)?;
        let Some(page) = pages
            .into_iter()
            .rev()
            .find(|p| !self.known_targets.contains(p.target_id()))
        else {
            return Ok(false);
        };

        self.known_targets.insert(page.target_id().clone());
        page.bring_to_front().await.map_err(AppError::browser)?;
        log::debug!("Switched to new browsing context {:?}", page.target_id());
        self.current = page;
        Ok(true)
    }

    async fn restore_context(&mut self) -> Result<()> {
        let pages = self.browser.pages().await.map_err(AppError::browser)?;
        for page in pages {
            if page.target_id() != self.primary.target_id() {
                if let Err(e) = page.close().await {
                    log::debug!("Closing secondary context failed: {}", e);
                }
            }
        }

        self.known_targets.clear();
        self.known_targets.insert(self.primary.target_id().clone());
        self.current = self.primary.clone();
        self.current
            .bring_to_front()
            .await
            .map_err(AppError::browser)?;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let result = self.browser.close().await.map_err(AppError::browser);
        self.handler.abort();
        result.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_expr_escapes_labels() {
        let expr = locator_expr(&Locator::LinkText("Следваща \"x\"".into()));
        assert!(expr.contains(r#""Следваща \"x\"""#));
    }

    #[test]
    fn test_within_expr_scopes_to_parent() {
        let expr = locator_expr(&Locator::Within {
            title: "Кмет на община".into(),
            target: "div.show-icon[title='Информация']".into(),
        });
        assert!(expr.starts_with("byOwnText(\"Кмет на община\")"));
        assert!(expr.contains("parentElement.querySelector(\"div.show-icon[title='Информация']\")"));
    }

    #[test]
    fn test_find_script_tags_element() {
        let script = find_script(&Locator::Css("a.next".into()), 7);
        assert!(script.contains("el.dataset.crawlerHandle = '7'"));
        assert!(script.contains("document.querySelector(\"a.next\")"));
    }

    #[test]
    fn test_click_script_targets_handle() {
        assert!(click_script(3).contains(r#"[data-crawler-handle="3"]"#));
    }
}
