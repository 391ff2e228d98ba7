use serde::{Deserialize, Serialize};
use std::fmt;

/// A natural-language description of content the user wants hidden.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterRule(String);

impl FilterRule {
    /// Returns `None` for blank input.
    pub fn new(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }
        Some(FilterRule(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase whitespace-separated words of the rule.
    pub fn words(&self) -> Vec<String> {
        self.0
            .to_lowercase()
            .split_whitespace()
            .map(|w| w.to_string())
            .collect()
    }
}

impl fmt::Display for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/*
Rule Set

Ordered set of filter rules. Duplicates are dropped on insert and the first insertion position is
kept, so the list displays in the order the user added rules. Matching never depends on order except
for the heuristic classifier's first-match walk.
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RuleSet {
    rules: Vec<FilterRule>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = RuleSet::new();
        for text in texts {
            set.insert(text.as_ref());
        }
        set
    }

    /// Returns true if the rule was added.
    pub fn insert(&mut self, text: &str) -> bool {
        match FilterRule::new(text) {
            Some(rule) if !self.rules.contains(&rule) => {
                self.rules.push(rule);
                true
            }
            _ => false,
        }
    }

    /// Returns true if a rule was removed.
    pub fn remove(&mut self, text: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|rule| rule.as_str() != text.trim());
        self.rules.len() != before
    }

    pub fn contains(&self, text: &str) -> bool {
        self.rules.iter().any(|rule| rule.as_str() == text.trim())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FilterRule> {
        self.rules.iter()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn texts(&self) -> Vec<String> {
        self.rules.iter().map(|rule| rule.as_str().to_string()).collect()
    }
}

impl From<Vec<String>> for RuleSet {
    fn from(texts: Vec<String>) -> Self {
        RuleSet::from_texts(texts)
    }
}

impl From<RuleSet> for Vec<String> {
    fn from(set: RuleSet) -> Self {
        set.texts()
    }
}

impl<'a> IntoIterator for &'a RuleSet {
    type Item = &'a FilterRule;
    type IntoIter = std::slice::Iter<'a, FilterRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
