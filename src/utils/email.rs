// src/utils/email.rs

//! Email address extraction from arbitrary text.
//!
//! Only the address token is constrained to ASCII; the surrounding text may be
//! in any script (the directory is in Cyrillic).

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("valid email pattern")
});

static EMAIL_EXACT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}$").expect("valid email pattern")
});

/// Return every email token in `text`, first-seen order, without duplicates.
pub fn find_all(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|email| seen.insert(*email))
        .map(str::to_string)
        .collect()
}

/// First email token in `text`, if any.
pub fn find_first(text: &str) -> Option<String> {
    EMAIL_RE.find(text).map(|m| m.as_str().to_string())
}

/// Whether the whole string is a single email token.
pub fn is_email(candidate: &str) -> bool {
    EMAIL_EXACT_RE.is_match(candidate)
}

/// Extract addresses from a `mailto:` reference.
///
/// Returns an empty list when `href` is not a mailto link.
pub fn from_mailto(href: &str) -> Vec<String> {
    let href = href.trim();
    let Some(prefix) = href.get(..7) else {
        return Vec::new();
    };
    if !prefix.eq_ignore_ascii_case("mailto:") {
        return Vec::new();
    }

    let target = &href[7..];
    let target = target.split('?').next().unwrap_or_default();
    find_all(target)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_token_in_cyrillic_text() {
        let text = "Кмет на община: Иван Петров, Електронна поща: mayor@sub.domain.bg.";
        assert_eq!(find_all(text), vec!["mayor@sub.domain.bg".to_string()]);
    }

    #[test]
    fn test_no_token_yields_empty() {
        assert!(find_all("Няма електронна поща @ тук").is_empty());
        assert!(find_first("user@localhost").is_none());
    }

    #[test]
    fn test_repeated_address_is_reported_once() {
        let text = "a.b@x.bg, пишете на a.b@x.bg";
        assert_eq!(find_all(text).len(), 1);
    }

    #[test]
    fn test_discovery_order_preserved() {
        let found = find_all("z@z.bg then a@a.bg then z@z.bg");
        assert_eq!(found, vec!["z@z.bg".to_string(), "a@a.bg".to_string()]);
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("user+tag@mail.example.com"));
        assert!(!is_email("user@example"));
        assert!(!is_email(" user@example.com"));
    }

    #[test]
    fn test_from_mailto() {
        assert_eq!(
            from_mailto("mailto:kmet@obshtina.bg?subject=Запитване"),
            vec!["kmet@obshtina.bg".to_string()]
        );
        assert_eq!(
            from_mailto("MAILTO:a@x.bg,b@y.bg"),
            vec!["a@x.bg".to_string(), "b@y.bg".to_string()]
        );
        assert!(from_mailto("https://example.com").is_empty());
        assert!(from_mailto("mail").is_empty());
    }
}
