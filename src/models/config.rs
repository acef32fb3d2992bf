//! Application configuration structures.

use std::fs;
use std::path::Path;
use std::time::Duration;

use scraper::Selector;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Browser backend and timeouts
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Traversal behavior and safety bounds
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Text markers and selectors the heuristics key on
    #[serde(default)]
    pub markers: MarkerConfig,

    /// Output locations
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values before any navigation happens.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.max_pages == 0 {
            return Err(AppError::validation("crawler.max_pages must be > 0"));
        }
        if self.crawler.run_budget_secs == 0 {
            return Err(AppError::validation("crawler.run_budget_secs must be > 0"));
        }
        if self.browser.navigation_timeout_ms == 0 {
            return Err(AppError::validation(
                "browser.navigation_timeout_ms must be > 0",
            ));
        }
        if self.browser.element_timeout_ms == 0 {
            return Err(AppError::validation("browser.element_timeout_ms must be > 0"));
        }
        if self.browser.user_agent.trim().is_empty() {
            return Err(AppError::validation("browser.user_agent is empty"));
        }

        Url::parse(&self.crawler.start_url)
            .map_err(|e| AppError::validation(format!("crawler.start_url: {e}")))?;
        self.crawler.base_url()?;

        self.markers.validate()
    }
}

/// Which browser implementation drives the crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Headless Chrome via the DevTools protocol
    #[default]
    Chrome,
    /// Plain HTTP fetches, no script execution
    Http,
}

/// Browser backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// Backend implementation
    #[serde(default)]
    pub backend: BackendKind,

    /// Run without a visible window
    #[serde(default = "defaults::headless")]
    pub headless: bool,

    /// User-Agent reported to the directory
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Upper bound for a single page load
    #[serde(default = "defaults::navigation_timeout")]
    pub navigation_timeout_ms: u64,

    /// Upper bound for waiting on an expected element
    #[serde(default = "defaults::element_timeout")]
    pub element_timeout_ms: u64,
}

impl BrowserConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_millis(self.element_timeout_ms)
    }
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            headless: defaults::headless(),
            user_agent: defaults::user_agent(),
            navigation_timeout_ms: defaults::navigation_timeout(),
            element_timeout_ms: defaults::element_timeout(),
        }
    }
}

/// Traversal settings and safety bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// First listing page
    #[serde(default = "defaults::start_url")]
    pub start_url: String,

    /// Origin that relative detail links are resolved against
    #[serde(default = "defaults::base_origin")]
    pub base_origin: String,

    /// Hard ceiling on listing pages visited
    #[serde(default = "defaults::max_pages")]
    pub max_pages: usize,

    /// Pause after clicking the next-page control
    #[serde(default = "defaults::page_transition_wait")]
    pub page_transition_wait_ms: u64,

    /// Pause after a detail page load before reading it
    #[serde(default = "defaults::detail_settle")]
    pub detail_settle_ms: u64,

    /// Bound for content revealed by a disclosure click
    #[serde(default = "defaults::disclosure_wait")]
    pub disclosure_wait_ms: u64,

    /// Delay between detail pages
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Wall-clock budget for one run
    #[serde(default = "defaults::run_budget")]
    pub run_budget_secs: u64,
}

impl CrawlerConfig {
    /// Parsed base origin.
    pub fn base_url(&self) -> Result<Url> {
        Url::parse(&self.base_origin)
            .map_err(|e| AppError::validation(format!("crawler.base_origin: {e}")))
    }

    pub fn page_transition_wait(&self) -> Duration {
        Duration::from_millis(self.page_transition_wait_ms)
    }

    pub fn detail_settle(&self) -> Duration {
        Duration::from_millis(self.detail_settle_ms)
    }

    pub fn disclosure_wait(&self) -> Duration {
        Duration::from_millis(self.disclosure_wait_ms)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }

    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.run_budget_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            start_url: defaults::start_url(),
            base_origin: defaults::base_origin(),
            max_pages: defaults::max_pages(),
            page_transition_wait_ms: defaults::page_transition_wait(),
            detail_settle_ms: defaults::detail_settle(),
            disclosure_wait_ms: defaults::disclosure_wait(),
            request_delay_ms: defaults::request_delay(),
            run_budget_secs: defaults::run_budget(),
        }
    }
}

/// Visible-text markers and selectors used by the heuristics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkerConfig {
    /// Phrase identifying a municipal administration link on the listing
    #[serde(default = "defaults::link_marker")]
    pub link_marker: String,

    /// Exact labels of the next-page control, tried in order
    #[serde(default = "defaults::next_page_labels")]
    pub next_page_labels: Vec<String>,

    /// Structural fallbacks for the next-page control, tried after the labels
    #[serde(default = "defaults::next_page_selectors")]
    pub next_page_selectors: Vec<String>,

    /// Exact title of the official whose contact is extracted
    #[serde(default = "defaults::official_title")]
    pub official_title: String,

    /// Inline label preceding an email address
    #[serde(default = "defaults::email_label")]
    pub email_label: String,

    /// Disclosure control inside the official's block
    #[serde(default = "defaults::disclosure_selector")]
    pub disclosure_selector: String,

    /// Control that dismisses an opened disclosure
    #[serde(default = "defaults::dismiss_selector")]
    pub dismiss_selector: String,

    /// Present once a listing page has rendered
    #[serde(default = "defaults::listing_ready_selector")]
    pub listing_ready_selector: String,

    /// Present once a detail page has rendered
    #[serde(default = "defaults::detail_ready_selector")]
    pub detail_ready_selector: String,
}

impl MarkerConfig {
    fn validate(&self) -> Result<()> {
        let texts = [
            ("markers.link_marker", &self.link_marker),
            ("markers.official_title", &self.official_title),
            ("markers.email_label", &self.email_label),
        ];
        for (name, value) in texts {
            if value.trim().is_empty() {
                return Err(AppError::validation(format!("{name} is empty")));
            }
        }
        if self.next_page_labels.iter().all(|l| l.trim().is_empty())
            && self.next_page_selectors.is_empty()
        {
            return Err(AppError::validation(
                "markers.next_page_labels and markers.next_page_selectors are both empty",
            ));
        }

        let selectors = [
            &self.disclosure_selector,
            &self.dismiss_selector,
            &self.listing_ready_selector,
            &self.detail_ready_selector,
        ];
        for selector in selectors.into_iter().chain(&self.next_page_selectors) {
            Selector::parse(selector).map_err(|e| AppError::selector(selector, format!("{e:?}")))?;
        }
        Ok(())
    }
}

impl Default for MarkerConfig {
    fn default() -> Self {
        Self {
            link_marker: defaults::link_marker(),
            next_page_labels: defaults::next_page_labels(),
            next_page_selectors: defaults::next_page_selectors(),
            official_title: defaults::official_title(),
            email_label: defaults::email_label(),
            disclosure_selector: defaults::disclosure_selector(),
            dismiss_selector: defaults::dismiss_selector(),
            listing_ready_selector: defaults::listing_ready_selector(),
            detail_ready_selector: defaults::detail_ready_selector(),
        }
    }
}

/// Output file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// CSV written at the end of a crawl
    #[serde(default = "defaults::csv_path")]
    pub csv_path: String,

    /// Discovered listing links
    #[serde(default = "defaults::links_path")]
    pub links_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            csv_path: defaults::csv_path(),
            links_path: defaults::links_path(),
        }
    }
}

mod defaults {
    // Browser defaults
    pub fn headless() -> bool {
        true
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) \
         Chrome/117.0 Safari/537.36"
            .into()
    }
    pub fn navigation_timeout() -> u64 {
        60_000
    }
    pub fn element_timeout() -> u64 {
        12_000
    }

    // Crawler defaults
    pub fn start_url() -> String {
        "https://iisda.government.bg/ras/adm_structures/municipality_administrations".into()
    }
    pub fn base_origin() -> String {
        "https://iisda.government.bg".into()
    }
    pub fn max_pages() -> usize {
        20
    }
    pub fn page_transition_wait() -> u64 {
        5_000
    }
    pub fn detail_settle() -> u64 {
        1_000
    }
    pub fn disclosure_wait() -> u64 {
        1_500
    }
    pub fn request_delay() -> u64 {
        600
    }
    pub fn run_budget() -> u64 {
        3_600
    }

    // Marker defaults
    pub fn link_marker() -> String {
        "Общинска администрация".into()
    }
    pub fn next_page_labels() -> Vec<String> {
        vec!["Следваща".into()]
    }
    pub fn next_page_selectors() -> Vec<String> {
        vec!["a.next".into()]
    }
    pub fn official_title() -> String {
        "Кмет на община".into()
    }
    pub fn email_label() -> String {
        "Електронна поща".into()
    }
    pub fn disclosure_selector() -> String {
        "div.show-icon[title='Информация']".into()
    }
    pub fn dismiss_selector() -> String {
        ".modal .close, [data-dismiss='modal']".into()
    }
    pub fn listing_ready_selector() -> String {
        "a".into()
    }
    pub fn detail_ready_selector() -> String {
        "h1, h2, div.node-title".into()
    }

    // Output defaults
    pub fn csv_path() -> String {
        "mayors_bulgaria.csv".into()
    }
    pub fn links_path() -> String {
        "links.json".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_max_pages() {
        let mut config = Config::default();
        config.crawler.max_pages = 0;
        assert!(matches!(config.validate(), Err(AppError::Validation(_))));
    }

    #[test]
    fn validate_rejects_relative_base_origin() {
        let mut config = Config::default();
        config.crawler.base_origin = "/ras".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_empty_official_title() {
        let mut config = Config::default();
        config.markers.official_title = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_selector() {
        let mut config = Config::default();
        config.markers.disclosure_selector = "[[invalid".to_string();
        assert!(matches!(
            config.validate(),
            Err(AppError::Selector { .. })
        ));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [browser]
            backend = "http"
            headless = false

            [crawler]
            max_pages = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.browser.backend, BackendKind::Http);
        assert!(!config.browser.headless);
        assert_eq!(config.crawler.max_pages, 3);
        assert_eq!(config.crawler.base_origin, "https://iisda.government.bg");
        assert_eq!(config.markers.next_page_labels, vec!["Следваща".to_string()]);
    }
}
