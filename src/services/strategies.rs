// src/services/strategies.rs

//! Document-only extraction heuristics.
//!
//! Each email strategy reads one parsed document and returns `None` when it
//! finds nothing, so the caller can fall through to the next one. The
//! disclosure strategy needs the browser and lives in the detail extractor.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::browser::dom;
use crate::models::{MarkerConfig, Strategy};
use crate::utils::email;

/// Signature shared by the document-only strategies.
pub type PageStrategy = fn(&Html, &MarkerConfig) -> Option<Vec<String>>;

/// How far past a label an address may start.
const LABEL_REACH: usize = 80;

/// Two or three capitalized words, in any script.
static PERSON_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\p{Lu}\p{Ll}+(?:\s+\p{Lu}\p{Ll}+){1,2}").expect("valid name pattern")
});

/// Document-only implementation of `strategy`, if it has one.
pub fn for_strategy(strategy: Strategy) -> Option<PageStrategy> {
    match strategy {
        Strategy::StructuredBlock => Some(structured_block),
        Strategy::Disclosure => None,
        Strategy::PageMailto => Some(page_mailto),
        Strategy::PageText => Some(page_text),
    }
}

/// Addresses inside the block of the element titled with the official's title.
///
/// Looks for `mailto:` links first, then for an address following the
/// email label. A title without a block of its own yields nothing.
pub fn structured_block(document: &Html, markers: &MarkerConfig) -> Option<Vec<String>> {
    dom::elements_with_own_text(document, &markers.official_title)
        .into_iter()
        .filter_map(Block::of)
        .find_map(|block| {
            let emails = block.mailtos();
            if !emails.is_empty() {
                return Some(emails);
            }
            let emails = after_label(&block.text(), &markers.email_label);
            (!emails.is_empty()).then_some(emails)
        })
}

/// Addresses attached to each email label on the page, in document order.
///
/// Falls back to the text of the label's next sibling when the address is
/// not inside the label element itself. Labels with no address are left out.
pub fn labeled_groups(document: &Html, markers: &MarkerConfig) -> Vec<Vec<String>> {
    dom::elements_containing_own_text(document, &markers.email_label)
        .into_iter()
        .filter_map(|label| {
            let emails = after_label(&dom::element_text(label), &markers.email_label);
            if !emails.is_empty() {
                return Some(emails);
            }
            let sibling = label.next_siblings().find_map(ElementRef::wrap)?;
            let emails = email::find_all(&dom::element_text(sibling));
            (!emails.is_empty()).then_some(emails)
        })
        .collect()
}

/// Every `mailto:` address on the page.
pub fn page_mailto(document: &Html, _markers: &MarkerConfig) -> Option<Vec<String>> {
    let emails = mailto_in(document.root_element());
    (!emails.is_empty()).then_some(emails)
}

/// First address anywhere in the visible text.
pub fn page_text(document: &Html, _markers: &MarkerConfig) -> Option<Vec<String>> {
    email::find_first(&dom::visible_text(document)).map(|e| vec![e])
}

/// First non-empty `h1`/`h2`, in document order.
pub fn page_heading(document: &Html) -> Option<String> {
    let sel = dom::selector("h1, h2")?;
    document
        .select(&sel)
        .map(dom::element_text)
        .find(|text| !text.is_empty())
}

/// Name of the official, recovered from the text near their title.
///
/// Tried in order: the table cell after the title cell, a capitalized name
/// in the title's next sibling, then in any text fragment of the title's
/// block, then inline after the title text.
pub fn official_name(document: &Html, markers: &MarkerConfig) -> Option<String> {
    let title = &markers.official_title;
    let titled = dom::elements_with_own_text(document, title);

    let from_cell = titled.iter().find_map(|el| {
        let cell = table_cell(*el)?;
        let next = cell.next_siblings().find_map(ElementRef::wrap)?;
        let text = dom::element_text(next);
        (!text.is_empty() && email::find_first(&text).is_none()).then_some(text)
    });

    from_cell
        .or_else(|| {
            titled.iter().find_map(|el| {
                let sibling = el.next_siblings().find_map(ElementRef::wrap)?;
                person_name(&dom::element_text(sibling))
            })
        })
        .or_else(|| {
            titled.iter().find_map(|el| {
                Block::of(*el)?
                    .fragments()
                    .map(str::trim)
                    .filter(|fragment| *fragment != title.as_str())
                    .find_map(person_name)
            })
        })
        .or_else(|| {
            dom::elements_containing_own_text(document, title)
                .into_iter()
                .find_map(|el| {
                    let text = dom::own_text(el);
                    let (_, rest) = text.split_once(title.as_str())?;
                    person_name(rest)
                })
        })
}

/// First capitalized two- or three-word name in `text`.
pub fn person_name(text: &str) -> Option<String> {
    PERSON_NAME_RE
        .find(text)
        .map(|m| crate::utils::normalize_whitespace(m.as_str()))
}

/// Tags that mark a title even without a class.
const HEADING_TAGS: [&str; 9] = ["h1", "h2", "h3", "h4", "h5", "h6", "dt", "strong", "b"];

/// Markup scoped to one official: their table row, a container holding no
/// other title, or the run of siblings up to the next title.
struct Block<'a>(Vec<ElementRef<'a>>);

impl<'a> Block<'a> {
    fn of(title: ElementRef<'a>) -> Option<Self> {
        let row = title
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "tr");
        if let Some(row) = row {
            return Some(Self(vec![row]));
        }

        let parent = title.parent().and_then(ElementRef::wrap)?;
        let is_page = matches!(parent.value().name(), "body" | "html");
        if !is_page && !contains_title_like(parent, title) {
            return Some(Self(vec![parent]));
        }

        let run: Vec<ElementRef<'a>> = std::iter::once(title)
            .chain(
                title
                    .next_siblings()
                    .filter_map(ElementRef::wrap)
                    .take_while(|el| !is_title_like(*el, title) && !contains_title_like(*el, title)),
            )
            .collect();
        (run.len() > 1).then_some(Self(run))
    }

    fn text(&self) -> String {
        self.0
            .iter()
            .map(|el| dom::element_text(*el))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn fragments(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.0.iter().flat_map(|el| el.text())
    }

    fn mailtos(&self) -> Vec<String> {
        let mut emails: Vec<String> = Vec::new();
        for address in self.0.iter().flat_map(|el| mailto_in(*el)) {
            if !emails.contains(&address) {
                emails.push(address);
            }
        }
        emails
    }
}

/// Whether `candidate` is another title styled like `title`.
fn is_title_like(candidate: ElementRef, title: ElementRef) -> bool {
    let (c, t) = (candidate.value(), title.value());
    let marked = HEADING_TAGS.contains(&t.name()) || t.attr("class").is_some_and(|cls| !cls.trim().is_empty());
    candidate != title && marked && c.name() == t.name() && c.attr("class") == t.attr("class")
}

fn contains_title_like(scope: ElementRef, title: ElementRef) -> bool {
    scope
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .any(|el| is_title_like(el, title))
}

/// The element itself or its nearest enclosing table cell.
fn table_cell(element: ElementRef) -> Option<ElementRef> {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .find(|el| matches!(el.value().name(), "td" | "th"))
}

/// `mailto:` addresses under `scope`, first-seen order.
fn mailto_in(scope: ElementRef) -> Vec<String> {
    let Some(sel) = dom::selector("a[href]") else {
        return Vec::new();
    };
    let mut emails: Vec<String> = Vec::new();
    for anchor in scope.select(&sel) {
        for address in anchor.value().attr("href").map(email::from_mailto).unwrap_or_default() {
            if !emails.contains(&address) {
                emails.push(address);
            }
        }
    }
    emails
}

/// Addresses starting shortly after each occurrence of `label`.
fn after_label(text: &str, label: &str) -> Vec<String> {
    let label = crate::utils::normalize_whitespace(label);
    let mut emails: Vec<String> = Vec::new();
    for (idx, _) in text.match_indices(label.as_str()) {
        let reach: String = text[idx + label.len()..].chars().take(LABEL_REACH).collect();
        if let Some(address) = email::find_first(&reach) {
            if !emails.contains(&address) {
                emails.push(address);
            }
        }
    }
    emails
}

#[cfg(test)]
mod tests {
    use super::*;

    fn markers() -> MarkerConfig {
        MarkerConfig::default()
    }

    fn doc(body: &str) -> Html {
        Html::parse_document(&format!(
            "<html><head><title>Община</title></head><body>{body}</body></html>"
        ))
    }

    const TABLE_PAGE: &str = r#"
        <h1>Община Банско</h1>
        <table>
          <tr><td>Зам.-кмет</td><td>Петър Петров</td><td><a href="mailto:deputy@bansko.bg">deputy@bansko.bg</a></td></tr>
          <tr><td>Кмет на община</td><td>Иван Иванов</td><td><a href="mailto:kmet@bansko.bg">kmet@bansko.bg</a></td></tr>
        </table>
        <p>Пишете ни: info@bansko.bg</p>
    "#;

    #[test]
    fn test_structured_block_scopes_to_official_row() {
        let document = doc(TABLE_PAGE);
        assert_eq!(
            structured_block(&document, &markers()),
            Some(vec!["kmet@bansko.bg".to_string()])
        );
    }

    const FLAT_PAGE: &str = r#"
        <h1>Община Разлог</h1>
        <h3>Зам.-кмет</h3><p><a href="mailto:deputy@razlog.bg">deputy@razlog.bg</a></p>
        <h3>Кмет на община</h3><p>Иван Иванов</p>
        <p><a href="mailto:kmet@razlog.bg">kmet@razlog.bg</a></p>
        <h3>Секретар</h3><p><a href="mailto:secretary@razlog.bg">secretary@razlog.bg</a></p>
    "#;

    #[test]
    fn test_structured_block_stops_at_next_heading() {
        let document = doc(FLAT_PAGE);
        assert_eq!(
            structured_block(&document, &markers()),
            Some(vec!["kmet@razlog.bg".to_string()])
        );
        assert_eq!(official_name(&document, &markers()).as_deref(), Some("Иван Иванов"));
    }

    #[test]
    fn test_structured_block_without_container_is_none() {
        let document = doc(
            r#"<h3>Кмет на община</h3>
               <h3>Секретар</h3><p><a href="mailto:secretary@razlog.bg">secretary@razlog.bg</a></p>"#,
        );
        assert_eq!(structured_block(&document, &markers()), None);
    }

    #[test]
    fn test_structured_block_skips_shared_wrapper() {
        let document = doc(
            r#"<div class="staff">
                 <h3>Зам.-кмет</h3><p><a href="mailto:deputy@razlog.bg">deputy@razlog.bg</a></p>
                 <h3>Кмет на община</h3><p><a href="mailto:kmet@razlog.bg">kmet@razlog.bg</a></p>
               </div>"#,
        );
        assert_eq!(
            structured_block(&document, &markers()),
            Some(vec!["kmet@razlog.bg".to_string()])
        );
    }

    #[test]
    fn test_structured_block_reads_labeled_text() {
        let document = doc(
            r#"<div class="node">
                 <div class="node-title">Кмет на община</div>
                 <div>Мария Георгиева</div>
                 <div>Електронна поща: mayor@belovo.bg</div>
               </div>"#,
        );
        assert_eq!(
            structured_block(&document, &markers()),
            Some(vec!["mayor@belovo.bg".to_string()])
        );
    }

    #[test]
    fn test_structured_block_none_without_title() {
        let document = doc(r#"<p><a href="mailto:info@x.bg">info</a></p>"#);
        assert_eq!(structured_block(&document, &markers()), None);
    }

    #[test]
    fn test_labeled_groups_use_sibling() {
        let document = doc(
            r#"<p>Електронна поща: kmet@x.bg</p>
               <dl><dt>Електронна поща</dt><dd>obshtina@x.bg</dd></dl>"#,
        );
        assert_eq!(
            labeled_groups(&document, &markers()),
            vec![vec!["kmet@x.bg".to_string()], vec!["obshtina@x.bg".to_string()]]
        );
    }

    #[test]
    fn test_label_without_address_is_left_out() {
        let document = doc(r#"<p>Електронна поща: няма</p>"#);
        assert!(labeled_groups(&document, &markers()).is_empty());
    }

    #[test]
    fn test_page_mailto_collects_all() {
        let document = doc(TABLE_PAGE);
        assert_eq!(
            page_mailto(&document, &markers()),
            Some(vec!["deputy@bansko.bg".to_string(), "kmet@bansko.bg".to_string()])
        );
    }

    #[test]
    fn test_page_text_ignores_scripts() {
        let document = Html::parse_document(
            r#"<html><head><script>var c = "hidden@x.bg";</script></head>
               <body><p>Контакт: visible@x.bg, other@x.bg</p></body></html>"#,
        );
        assert_eq!(
            page_text(&document, &markers()),
            Some(vec!["visible@x.bg".to_string()])
        );
    }

    #[test]
    fn test_disclosure_has_no_document_strategy() {
        assert!(for_strategy(Strategy::Disclosure).is_none());
        assert!(for_strategy(Strategy::PageText).is_some());
    }

    #[test]
    fn test_page_heading() {
        assert_eq!(page_heading(&doc(TABLE_PAGE)), Some("Община Банско".to_string()));
        assert_eq!(page_heading(&doc("<h2> </h2><h2>Община Белово</h2>")), Some("Община Белово".to_string()));
        assert_eq!(page_heading(&doc("<p>без заглавие</p>")), None);
    }

    #[test]
    fn test_official_name_from_table_cell() {
        assert_eq!(
            official_name(&doc(TABLE_PAGE), &markers()),
            Some("Иван Иванов".to_string())
        );
    }

    #[test]
    fn test_official_name_from_block() {
        let document = doc(
            r#"<div class="node">
                 <div class="node-title">Кмет на община</div>
                 <span class="icon"></span>
                 <p>инж. Мария Петрова Георгиева</p>
               </div>"#,
        );
        assert_eq!(
            official_name(&document, &markers()),
            Some("Мария Петрова Георгиева".to_string())
        );
    }

    #[test]
    fn test_official_name_inline() {
        let document = doc("<p>Кмет на община Стефан Стефанов</p>");
        assert_eq!(
            official_name(&document, &markers()),
            Some("Стефан Стефанов".to_string())
        );
    }

    #[test]
    fn test_official_name_absent() {
        assert_eq!(official_name(&doc("<p>Общинска администрация</p>"), &markers()), None);
    }
}
