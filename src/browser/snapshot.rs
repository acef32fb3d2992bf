// src/browser/snapshot.rs

//! Context and element-handle bookkeeping for backends that hold the page as
//! an HTML string instead of a live DOM.

use crate::browser::{ElementHandle, Locator, RenderedPage, dom};

/// What a backend needs to act on a clicked element.
#[derive(Debug, Clone)]
pub(crate) struct ClickTarget {
    /// URL of the page the element lives on
    pub page_url: String,
    /// Raw `href` attribute, if any
    pub href: Option<String>,
    /// Serialized element
    #[cfg(test)]
    pub outer_html: String,
}

#[derive(Debug, Clone)]
struct HandleEntry {
    context: usize,
    generation: u64,
    locator: Locator,
}

/// Stack of browsing contexts plus the handles issued for them.
///
/// Index 0 is the primary context. A handle stays valid only while its
/// context shows the same document it was issued for.
#[derive(Debug, Default)]
pub(crate) struct SnapshotSession {
    contexts: Vec<(RenderedPage, u64)>,
    active: usize,
    handles: Vec<HandleEntry>,
    generation: u64,
}

impl SnapshotSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the document shown in the active context.
    pub fn load(&mut self, page: RenderedPage) {
        self.generation += 1;
        let generation = self.generation;
        match self.contexts.get_mut(self.active) {
            Some(slot) => *slot = (page, generation),
            None => {
                self.contexts.push((page, generation));
                self.active = self.contexts.len() - 1;
            }
        }
    }

    /// Open another context without switching into it.
    #[cfg(test)]
    pub fn open_context(&mut self, page: RenderedPage) {
        self.generation += 1;
        self.contexts.push((page, self.generation));
    }

    pub fn current(&self) -> Option<&RenderedPage> {
        self.contexts.get(self.active).map(|(page, _)| page)
    }

    pub fn find(&mut self, locator: &Locator) -> Option<ElementHandle> {
        let (page, generation) = self.contexts.get(self.active)?;
        let document = page.document();
        dom::locate(&document, locator)?;

        self.handles.push(HandleEntry {
            context: self.active,
            generation: *generation,
            locator: locator.clone(),
        });
        Some(ElementHandle::new(self.handles.len() as u64 - 1))
    }

    /// Resolve a handle against the page it was issued for.
    ///
    /// Returns `None` for unknown or stale handles.
    pub fn resolve(&self, handle: ElementHandle) -> Option<ClickTarget> {
        let entry = self.handles.get(handle.id() as usize)?;
        if entry.context != self.active {
            return None;
        }
        let (page, generation) = self.contexts.get(entry.context)?;
        if *generation != entry.generation {
            return None;
        }

        let document = page.document();
        let element = dom::locate(&document, &entry.locator)?;
        Some(ClickTarget {
            page_url: page.url.clone(),
            href: element.value().attr("href").map(str::to_string),
            #[cfg(test)]
            outer_html: element.html(),
        })
    }

    /// Activate the newest context other than the active one.
    pub fn switch_latest(&mut self) -> bool {
        let latest = self.contexts.len().saturating_sub(1);
        if latest == self.active || self.contexts.is_empty() {
            return false;
        }
        self.active = latest;
        true
    }

    /// Drop secondary contexts and return to the primary one.
    pub fn restore(&mut self) {
        self.contexts.truncate(1);
        self.active = 0;
    }
}
