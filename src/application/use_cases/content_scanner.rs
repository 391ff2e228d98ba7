/*
Content Scanner

Finds posts under the content root that have not been looked at yet. Block selectors are tried in
priority order and the first one that produces any new post with text wins the round; the others
are not merged in. Every node a selector touches is remembered, even when it had no text, so a
post is considered at most once for the lifetime of the page.
*/

use ego_tree::NodeId;
use scraper::{ElementRef, Selector};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::config::ScannerSettings;
use crate::domain::entities::content_unit::{ContentUnit, UnitId};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScanError {
    #[error("Invalid selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("No block selectors configured")]
    NoBlockSelectors,
}

fn compile(selector: &str) -> Result<Selector, ScanError> {
    Selector::parse(selector).map_err(|e| ScanError::InvalidSelector {
        selector: selector.to_string(),
        reason: format!("{:?}", e),
    })
}

/// Selectors compiled once from [`ScannerSettings`].
#[derive(Debug, Clone)]
pub struct ScannerProfile {
    blocks: Vec<Selector>,
    texts: Vec<Selector>,
    image: Selector,
}

impl ScannerProfile {
    pub fn compile(settings: &ScannerSettings) -> Result<Self, ScanError> {
        if settings.block_selectors.is_empty() {
            return Err(ScanError::NoBlockSelectors);
        }
        let blocks = settings
            .block_selectors
            .iter()
            .map(|s| compile(s))
            .collect::<Result<Vec<_>, _>>()?;
        let texts = settings
            .text_selectors
            .iter()
            .map(|s| compile(s))
            .collect::<Result<Vec<_>, _>>()?;
        let image = compile(&settings.image_selector)?;

        Ok(Self { blocks, texts, image })
    }
}

/// Maps render-tree nodes to stable unit ids. Once a node is in here it is never scanned again.
#[derive(Debug, Default)]
pub struct SeenRegistry {
    ids: HashMap<NodeId, UnitId>,
    next: u64,
}

impl SeenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the unit id for `node` and whether this is the first time it was seen.
    pub fn mark(&mut self, node: NodeId) -> (UnitId, bool) {
        if let Some(id) = self.ids.get(&node) {
            return (*id, false);
        }
        self.next += 1;
        let id = UnitId::new(self.next);
        self.ids.insert(node, id);
        (id, true)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

pub struct ContentScanner {
    profile: ScannerProfile,
    seen: SeenRegistry,
}

impl ContentScanner {
    pub fn new(profile: ScannerProfile) -> Self {
        Self {
            profile,
            seen: SeenRegistry::new(),
        }
    }

    pub fn from_settings(settings: &ScannerSettings) -> Result<Self, ScanError> {
        Ok(Self::new(ScannerProfile::compile(settings)?))
    }

    pub fn seen(&self) -> &SeenRegistry {
        &self.seen
    }

    pub fn scan(&mut self, root: ElementRef<'_>) -> Vec<ContentUnit> {
        for block in &self.profile.blocks {
            let mut units = Vec::new();
            for element in root.select(block) {
                let (id, first_time) = self.seen.mark(element.id());
                if !first_time {
                    continue;
                }
                let text = extract_text(element, &self.profile.texts);
                if text.is_empty() {
                    continue;
                }
                let has_images = element.select(&self.profile.image).next().is_some();
                units.push(ContentUnit::new(id, text, has_images));
            }
            if !units.is_empty() {
                log::debug!("Scanner found {} new post(s)", units.len());
                return units;
            }
        }
        Vec::new()
    }
}

/// Trimmed text of every element matching one of `selectors`, space-joined. A node matched by
/// several selectors contributes once.
fn extract_text(block: ElementRef<'_>, selectors: &[Selector]) -> String {
    let mut visited = HashSet::new();
    let mut parts = Vec::new();
    for selector in selectors {
        for element in block.select(selector) {
            if !visited.insert(element.id()) {
                continue;
            }
            let text = element.text().collect::<String>();
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
    }
    parts.join(" ")
}
