/*
Batch Request Builder

Turns a list of content units and the active rules into a single classifier request. Units are
numbered from 1 in collection order and the classifier is told to echo those numbers back as
`tweetIndex`, which is what the response aligner keys on.
*/

use serde::Serialize;
use uuid::Uuid;

use crate::config::BatchSettings;
use crate::domain::entities::content_unit::TweetPayload;
use crate::domain::entities::filter_rule::RuleSet;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    /// Position in the batch, starting at 1.
    pub index: usize,
    pub text: String,
    pub has_images: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchRequest {
    pub id: Uuid,
    pub items: Vec<BatchItem>,
    pub rules: RuleSet,
    pub prompt: String,
    pub max_output_tokens: u32,
    pub temperature: f32,
}

impl BatchRequest {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct BatchRequestBuilder {
    settings: BatchSettings,
}

impl BatchRequestBuilder {
    pub fn new(settings: BatchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Returns `None` when no rules are active; callers must not reach the classifier then.
    pub fn build(&self, units: &[TweetPayload], rules: &RuleSet) -> Option<BatchRequest> {
        if rules.is_empty() {
            return None;
        }

        let items: Vec<BatchItem> = units
            .iter()
            .enumerate()
            .map(|(position, unit)| BatchItem {
                index: position + 1,
                text: self.truncate(&unit.text),
                has_images: unit.has_images,
            })
            .collect();

        let prompt = render_prompt(&items, rules);
        let max_output_tokens = self.output_budget(items.len());

        Some(BatchRequest {
            id: Uuid::new_v4(),
            items,
            rules: rules.clone(),
            prompt,
            max_output_tokens,
            temperature: self.settings.temperature,
        })
    }

    /// Fixed base allowance plus a linear per-unit allowance.
    pub fn output_budget(&self, unit_count: usize) -> u32 {
        let per_unit = self
            .settings
            .per_unit_output_tokens
            .saturating_mul(unit_count as u32);
        self.settings.base_output_tokens.saturating_add(per_unit)
    }

    fn truncate(&self, text: &str) -> String {
        let limit = self.settings.max_text_chars;
        if limit == 0 || text.chars().count() <= limit {
            return text.to_string();
        }
        let mut truncated: String = text.chars().take(limit).collect();
        truncated.push('…');
        truncated
    }
}

fn render_prompt(items: &[BatchItem], rules: &RuleSet) -> String {
    let rule_lines: Vec<String> = rules
        .iter()
        .enumerate()
        .map(|(i, rule)| format!("{}. {}", i + 1, rule))
        .collect();

    let post_lines: Vec<String> = items
        .iter()
        .map(|item| {
            let images = if item.has_images { " (has images)" } else { "" };
            format!("[{}]{} {}", item.index, images, item.text)
        })
        .collect();

    format!(
        "You are a content filter for a social media timeline. For each post decide whether it \
matches any of the user's filter rules. Judge the meaning of the post, not just its keywords.

Filter rules:
{rules}

Posts:
{posts}

Respond with JSON only, no prose and no code fences, in exactly this shape:
{{\"results\":[{{\"tweetIndex\":1,\"shouldFilter\":true,\"matchedFilter\":\"<rule text or null>\",\"confidence\":85,\"reasoning\":\"<one short sentence>\"}}]}}
Return exactly one entry per post ({count} in total) and use the number in brackets as tweetIndex. \
confidence is an integer from 1 to 100. matchedFilter must be null when shouldFilter is false.",
        rules = rule_lines.join("\n"),
        posts = post_lines.join("\n"),
        count = items.len(),
    )
}
