//! Per-page extraction result.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::MunicipalityLink;
use crate::utils::email;

/// Email extraction heuristics, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Strategy {
    /// `mailto:` or labeled address inside the official's own block
    StructuredBlock,
    /// Same as above after clicking the block's information control
    Disclosure,
    /// Any `mailto:` link on the page
    PageMailto,
    /// First address anywhere in the visible text
    PageText,
}

impl Strategy {
    /// Priority order of the fallback chain.
    pub const CHAIN: [Strategy; 4] = [
        Strategy::StructuredBlock,
        Strategy::Disclosure,
        Strategy::PageMailto,
        Strategy::PageText,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Strategy::StructuredBlock => "structured-block",
            Strategy::Disclosure => "disclosure",
            Strategy::PageMailto => "page-mailto",
            Strategy::PageText => "page-text",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What was recovered from one detail page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExtractionResult {
    /// Heading of the detail page, or the listing text as fallback
    pub municipality_name: String,

    /// Mayor's name, empty when not recognised
    pub mayor_name: String,

    /// Valid addresses in discovery order, no duplicates
    emails: Vec<String>,

    /// Detail page URL
    pub source_url: String,

    /// Strategy that produced `emails`
    pub matched_by: Option<Strategy>,
}

impl ExtractionResult {
    /// Build a result, keeping only valid, first-seen addresses.
    pub fn new(
        municipality_name: impl Into<String>,
        mayor_name: impl Into<String>,
        emails: impl IntoIterator<Item = String>,
        source_url: impl Into<String>,
        matched_by: Option<Strategy>,
    ) -> Self {
        let mut seen = HashSet::new();
        let emails: Vec<String> = emails
            .into_iter()
            .map(|e| e.trim().to_string())
            .filter(|e| email::is_email(e) && seen.insert(e.clone()))
            .collect();
        let matched_by = if emails.is_empty() { None } else { matched_by };

        Self {
            municipality_name: municipality_name.into(),
            mayor_name: mayor_name.into(),
            emails,
            source_url: source_url.into(),
            matched_by,
        }
    }

    /// Empty-field result for a page that could not be processed.
    pub fn unresolved(link: &MunicipalityLink) -> Self {
        Self::new(link.display_text.clone(), "", Vec::new(), link.url.clone(), None)
    }

    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    pub fn has_email(&self) -> bool {
        !self.emails.is_empty()
    }

    /// Emails sorted and joined for a single output cell.
    pub fn joined_emails(&self) -> String {
        let mut sorted = self.emails.clone();
        sorted.sort();
        sorted.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_filters_and_dedups() {
        let result = ExtractionResult::new(
            "Община Банско",
            "",
            vec![
                "b@y.bg".to_string(),
                "not-an-email".to_string(),
                "a@x.bg".to_string(),
                " b@y.bg ".to_string(),
            ],
            "https://x.bg/1",
            Some(Strategy::PageText),
        );

        assert_eq!(result.emails(), ["b@y.bg", "a@x.bg"]);
        assert_eq!(result.joined_emails(), "a@x.bg; b@y.bg");
        assert_eq!(result.matched_by, Some(Strategy::PageText));
    }

    #[test]
    fn test_no_strategy_without_emails() {
        let result = ExtractionResult::new("X", "", Vec::new(), "u", Some(Strategy::PageMailto));
        assert!(!result.has_email());
        assert_eq!(result.matched_by, None);
    }

    #[test]
    fn test_unresolved_uses_display_text() {
        let link = MunicipalityLink::new("Общинска администрация - Белово", "https://x.bg/2");
        let result = ExtractionResult::unresolved(&link);
        assert_eq!(result.municipality_name, "Общинска администрация - Белово");
        assert_eq!(result.source_url, "https://x.bg/2");
        assert!(result.mayor_name.is_empty());
        assert!(!result.has_email());
    }

    #[test]
    fn test_chain_order() {
        assert_eq!(Strategy::CHAIN[0], Strategy::StructuredBlock);
        assert_eq!(Strategy::CHAIN[3], Strategy::PageText);
    }
}
