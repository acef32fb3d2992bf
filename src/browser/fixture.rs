// src/browser/fixture.rs

//! In-memory browser for tests: fixed pages plus scripted click effects.

use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;

use crate::browser::snapshot::SnapshotSession;
use crate::browser::{Browser, ElementHandle, Locator, RenderedPage};
use crate::error::{AppError, Result};
use crate::utils::resolve_url;

/// Effect of clicking a scripted element.
#[derive(Debug, Clone)]
pub(crate) enum Transition {
    /// Re-render the current page in place (script pagination, modal)
    Replace(String),
    /// Load another fixture page
    Navigate(String),
    /// Open a new context holding this document
    OpenContext(String),
    /// Re-render in place, then advance one document per read
    Staged(Vec<String>),
}

#[derive(Debug, Clone)]
struct ClickRule {
    page_url: String,
    needle: String,
    transition: Transition,
}

#[derive(Default)]
pub(crate) struct FixtureBrowser {
    pages: HashMap<String, String>,
    failing: HashSet<String>,
    rules: Vec<ClickRule>,
    session: SnapshotSession,
    staged: VecDeque<String>,
    pub navigations: Vec<String>,
    pub clicks: usize,
}

impl FixtureBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }

    /// Navigation to `url` fails as if the host were unreachable.
    pub fn failing(mut self, url: &str) -> Self {
        self.failing.insert(url.to_string());
        self
    }

    /// Clicking an element on `page_url` whose markup contains `needle`
    /// applies `transition`.
    pub fn on_click(mut self, page_url: &str, needle: &str, transition: Transition) -> Self {
        self.rules.push(ClickRule {
            page_url: page_url.to_string(),
            needle: needle.to_string(),
            transition,
        });
        self
    }
}

#[async_trait]
impl Browser for FixtureBrowser {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.navigations.push(url.to_string());
        if self.failing.contains(url) {
            return Err(AppError::navigation(url, "net::ERR_CONNECTION_REFUSED"));
        }
        let html = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::navigation(url, "no fixture page"))?;
        self.session.load(RenderedPage::new(url, html));
        Ok(())
    }

    async fn current_document(&mut self) -> Result<RenderedPage> {
        let page = self
            .session
            .current()
            .cloned()
            .ok_or_else(|| AppError::browser("no page loaded"))?;
        if let Some(next) = self.staged.pop_front() {
            self.session.load(RenderedPage::new(page.url.clone(), next));
        }
        Ok(page)
    }

    async fn find(&mut self, locator: &Locator) -> Result<Option<ElementHandle>> {
        Ok(self.session.find(locator))
    }

    async fn click(&mut self, element: ElementHandle) -> Result<bool> {
        let Some(target) = self.session.resolve(element) else {
            return Ok(false);
        };
        self.clicks += 1;

        let rule = self
            .rules
            .iter()
            .find(|r| r.page_url == target.page_url && target.outer_html.contains(&r.needle))
            .cloned();

        match rule.map(|r| r.transition) {
            Some(Transition::Replace(html)) => {
                self.session.load(RenderedPage::new(target.page_url, html));
                Ok(true)
            }
            Some(Transition::Navigate(url)) => Ok(self.navigate(&url).await.is_ok()),
            Some(Transition::Staged(stages)) => {
                let mut stages = VecDeque::from(stages);
                let Some(first) = stages.pop_front() else {
                    return Ok(false);
                };
                self.session.load(RenderedPage::new(target.page_url, first));
                self.staged = stages;
                Ok(true)
            }
            Some(Transition::OpenContext(html)) => {
                let url = format!("{}#context", target.page_url);
                self.session.open_context(RenderedPage::new(url, html));
                Ok(true)
            }
            None => {
                let Some(href) = target.href else {
                    return Ok(false);
                };
                let Ok(base) = url::Url::parse(&target.page_url) else {
                    return Ok(false);
                };
                let url = resolve_url(&base, &href);
                Ok(self.navigate(&url).await.is_ok())
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
