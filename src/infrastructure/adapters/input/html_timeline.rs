// src/infrastructure/adapters/input/html_timeline.rs
use ego_tree::{NodeMut, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};

use crate::application::ports::input::timeline_port::{PageMutation, TimelineError, TimelinePort};

/// A parsed timeline page that can grow in place.
///
/// Mutations graft the parsed fragment into the existing tree instead of re-parsing the whole
/// page, so node ids of posts already on the page never change.
pub struct HtmlTimeline {
    document: Html,
    root_selector: Selector,
}

impl HtmlTimeline {
    pub fn parse(html: &str, root_selector: &str) -> Result<Self, TimelineError> {
        let root_selector = Selector::parse(root_selector).map_err(|e| TimelineError::InvalidSelector {
            selector: root_selector.to_string(),
            reason: format!("{:?}", e),
        })?;

        Ok(Self {
            document: Html::parse_document(html),
            root_selector,
        })
    }

    fn insert(&mut self, fragment: &str, at_start: bool) -> Result<(), TimelineError> {
        let root_id = self.content_root().id();
        let parsed = Html::parse_fragment(fragment);
        // Fragment content sits under a synthetic <html> element.
        let source = parsed.root_element();
        let children: Vec<NodeRef<'_, Node>> = source.children().collect();

        let mut target = self
            .document
            .tree
            .get_mut(root_id)
            .ok_or(TimelineError::RootNotFound)?;

        if at_start {
            for child in children.into_iter().rev() {
                let mut copy = target.prepend(child.value().clone());
                graft(&mut copy, child);
            }
        } else {
            for child in children {
                let mut copy = target.append(child.value().clone());
                graft(&mut copy, child);
            }
        }
        Ok(())
    }
}

fn graft(target: &mut NodeMut<'_, Node>, source: NodeRef<'_, Node>) {
    for child in source.children() {
        let mut copy = target.append(child.value().clone());
        graft(&mut copy, child);
    }
}

impl TimelinePort for HtmlTimeline {
    /// Falls back to the document element when the root selector matches nothing.
    fn content_root(&self) -> ElementRef<'_> {
        self.document
            .select(&self.root_selector)
            .next()
            .unwrap_or_else(|| self.document.root_element())
    }

    fn apply_mutation(&mut self, mutation: &PageMutation) -> Result<(), TimelineError> {
        match mutation {
            PageMutation::Append(html) => self.insert(html, false),
            PageMutation::Prepend(html) => self.insert(html, true),
        }
    }
}
