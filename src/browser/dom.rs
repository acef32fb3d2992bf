// src/browser/dom.rs

//! Locator matching and text helpers over a parsed document.

use scraper::{ElementRef, Html, Selector};

use crate::browser::Locator;
use crate::utils::normalize_whitespace;

/// Elements whose text never renders.
const INVISIBLE: [&str; 5] = ["script", "style", "noscript", "template", "head"];

/// Text of the element's direct text children, whitespace-normalized.
pub fn own_text(element: ElementRef) -> String {
    let joined = element
        .children()
        .filter_map(|child| child.value().as_text().map(|t| t.trim().to_string()))
        .collect::<Vec<_>>()
        .join(" ");
    normalize_whitespace(&joined)
}

/// All descendant text of the element, whitespace-normalized.
pub fn element_text(element: ElementRef) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Text a reader would see on the page (no script, style or head content).
pub fn visible_text(document: &Html) -> String {
    let parts: Vec<&str> = document
        .root_element()
        .descendants()
        .filter_map(|node| {
            let text = node.value().as_text()?;
            let hidden = node.parent().and_then(ElementRef::wrap).is_some_and(is_hidden);
            (!hidden).then_some(&**text)
        })
        .collect();
    normalize_whitespace(&parts.join(" "))
}

/// Parse a selector, returning `None` for invalid input.
pub fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(sel) => Some(sel),
        Err(e) => {
            log::debug!("Ignoring invalid selector '{}': {:?}", css, e);
            None
        }
    }
}

/// Every element whose own text equals `label`, in document order.
pub fn elements_with_own_text<'a>(document: &'a Html, label: &str) -> Vec<ElementRef<'a>> {
    let label = normalize_whitespace(label);
    all_elements(document)
        .filter(|el| own_text(*el) == label)
        .collect()
}

/// Every element whose own text contains `label`, in document order.
pub fn elements_containing_own_text<'a>(document: &'a Html, label: &str) -> Vec<ElementRef<'a>> {
    let label = normalize_whitespace(label);
    all_elements(document)
        .filter(|el| own_text(*el).contains(&label))
        .collect()
}

/// First element matching the locator, in document order.
pub fn locate<'a>(document: &'a Html, locator: &Locator) -> Option<ElementRef<'a>> {
    match locator {
        Locator::Css(css) => {
            let sel = selector(css)?;
            document.select(&sel).next()
        }
        Locator::LinkText(label) => {
            let label = normalize_whitespace(label);
            let sel = selector("a")?;
            document
                .select(&sel)
                .find(|a| element_text(*a) == label)
        }
        Locator::ExactText(label) => elements_with_own_text(document, label).into_iter().next(),
        Locator::Within { title, target } => {
            let sel = selector(target)?;
            elements_with_own_text(document, title)
                .into_iter()
                .filter_map(|el| el.parent().and_then(ElementRef::wrap))
                .find_map(|scope| scope.select(&sel).next())
        }
    }
}

fn all_elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .filter(|el| !is_hidden(*el))
}

/// Whether the element is, or sits inside, a non-rendered element.
fn is_hidden(element: ElementRef) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|el| INVISIBLE.contains(&el.value().name()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <html><head><title>Списък</title><script>var x = "a@x.bg";</script></head>
        <body>
          <div class="node">
            <div class="node-title">Кмет на община</div>
            <div class="show-icon" title="Информация"></div>
          </div>
          <div class="node">
            <div class="node-title">Секретар на община</div>
            <div class="show-icon" title="Информация" id="secretary"></div>
          </div>
          <p>Адрес: <b>ул. Витоша 1</b></p>
          <a href="/next">  Следваща </a>
        </body></html>
    "#;

    #[test]
    fn test_visible_text_skips_script_and_head() {
        let doc = Html::parse_document(PAGE);
        let text = visible_text(&doc);
        assert!(text.contains("Кмет на община"));
        assert!(!text.contains("a@x.bg"));
        assert!(!text.contains("Списък"));
    }

    #[test]
    fn test_own_text_excludes_children() {
        let doc = Html::parse_document(PAGE);
        let p = locate(&doc, &Locator::Css("p".into())).unwrap();
        assert_eq!(own_text(p), "Адрес:");
        assert_eq!(element_text(p), "Адрес: ул. Витоша 1");
    }

    #[test]
    fn test_link_text_matches_normalized() {
        let doc = Html::parse_document(PAGE);
        let a = locate(&doc, &Locator::LinkText("Следваща".into())).unwrap();
        assert_eq!(a.value().attr("href"), Some("/next"));
        assert!(locate(&doc, &Locator::LinkText("Следв".into())).is_none());
    }

    #[test]
    fn test_within_scopes_to_titled_block() {
        let doc = Html::parse_document(PAGE);
        let locator = Locator::Within {
            title: "Секретар на община".into(),
            target: "div.show-icon[title='Информация']".into(),
        };
        let icon = locate(&doc, &locator).unwrap();
        assert_eq!(icon.value().attr("id"), Some("secretary"));
    }

    #[test]
    fn test_exact_and_contains_text() {
        let doc = Html::parse_document(PAGE);
        assert!(locate(&doc, &Locator::ExactText("Кмет на община".into())).is_some());
        assert!(locate(&doc, &Locator::ExactText("Кмет".into())).is_none());
        assert_eq!(elements_containing_own_text(&doc, "Кмет").len(), 1);
    }

    #[test]
    fn test_invalid_css_is_none() {
        let doc = Html::parse_document(PAGE);
        assert!(locate(&doc, &Locator::Css("[[bad".into())).is_none());
    }
}
