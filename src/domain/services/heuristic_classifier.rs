/*
Heuristic Classifier

Offline keyword matcher used when the semantic classifier cannot be reached. A rule matches a post
when at least half of the rule's words (rounded up) are found in the post, either verbatim, through
the topic synonym table, or through one of the stem patterns for high-value topics.

Everything here is pure: the same text and rules always give the same result.
*/

use regex::Regex;
use std::sync::LazyLock;

use crate::domain::entities::classification::{ClassificationResult, Confidence, Method};
use crate::domain::entities::filter_rule::{FilterRule, RuleSet};

struct Topic {
    /// Rule words that refer to this topic.
    aliases: &'static [&'static str],
    /// Terms that indicate the topic in post text.
    terms: &'static [&'static str],
}

const TOPICS: &[Topic] = &[
    Topic {
        aliases: &[
            "politics", "political", "politician", "politicians", "government", "election",
            "elections", "partisan",
        ],
        terms: &[
            "congress", "senate", "senator", "election", "vote", "voting", "voter", "democrat",
            "republican", "president", "parliament", "legislation", "bill", "campaign", "policy",
            "government", "liberal", "conservative", "white house", "ballot", "governor",
        ],
    },
    Topic {
        aliases: &[
            "crypto", "cryptocurrency", "cryptocurrencies", "bitcoin", "blockchain", "nft",
            "nfts", "web3",
        ],
        terms: &[
            "bitcoin", "btc", "ethereum", "eth", "crypto", "blockchain", "nft", "token",
            "defi", "altcoin", "solana", "dogecoin", "hodl", "wallet", "airdrop", "web3",
        ],
    },
    Topic {
        aliases: &["sports", "sport", "sporting", "athletics", "games"],
        terms: &[
            "football", "soccer", "basketball", "baseball", "hockey", "tennis", "nfl", "nba",
            "mlb", "nhl", "fifa", "match", "goal", "touchdown", "playoffs", "championship",
            "score", "league", "tournament",
        ],
    },
    Topic {
        aliases: &[
            "negative", "negativity", "toxic", "toxicity", "hate", "hateful", "rude",
            "angry", "harassment", "abusive",
        ],
        terms: &[
            "hate", "stupid", "idiot", "terrible", "awful", "worst", "disgusting", "angry",
            "furious", "pathetic", "loser", "trash", "garbage", "shut up", "moron",
        ],
    },
    Topic {
        aliases: &["news", "headlines", "breaking", "journalism"],
        terms: &[
            "breaking", "report", "reports", "reported", "according to", "headline",
            "journalist", "press", "announced", "update",
        ],
    },
    Topic {
        aliases: &["tech", "technology", "ai", "software", "gadgets", "programming"],
        terms: &[
            "ai", "artificial intelligence", "software", "app", "startup", "iphone",
            "android", "google", "apple", "microsoft", "openai", "code", "developer", "gpu",
        ],
    },
    Topic {
        aliases: &[
            "entertainment", "celebrity", "celebrities", "movies", "movie", "tv", "music",
            "gossip",
        ],
        terms: &[
            "movie", "film", "actor", "actress", "celebrity", "album", "concert", "netflix",
            "hollywood", "trailer", "premiere", "singer", "episode", "box office",
        ],
    },
    Topic {
        aliases: &[
            "finance", "financial", "stocks", "stock", "investing", "investment", "money",
            "trading", "market", "markets",
        ],
        terms: &[
            "stock", "stocks", "market", "shares", "invest", "investing", "trading",
            "nasdaq", "dow", "s&p", "earnings", "dividend", "portfolio", "fed", "inflation",
        ],
    },
];

/// Topic terms compiled into a single whole-word alternation.
struct TopicPattern {
    aliases: &'static [&'static str],
    text: Regex,
}

static TOPIC_PATTERNS: LazyLock<Vec<TopicPattern>> = LazyLock::new(|| {
    TOPICS
        .iter()
        .filter_map(|topic| {
            let alternation = topic
                .terms
                .iter()
                .map(|term| regex::escape(term))
                .collect::<Vec<_>>()
                .join("|");
            let text = Regex::new(&format!(r"\b(?:{})\b", alternation)).ok()?;
            Some(TopicPattern {
                aliases: topic.aliases,
                text,
            })
        })
        .collect()
});

struct StemPattern {
    trigger: Regex,
    text: Regex,
}

fn stem_pattern(trigger: &str, text: &str) -> Option<StemPattern> {
    Some(StemPattern {
        trigger: Regex::new(trigger).ok()?,
        text: Regex::new(text).ok()?,
    })
}

static STEM_PATTERNS: LazyLock<Vec<StemPattern>> = LazyLock::new(|| {
    [
        stem_pattern(
            r"^(politic|govern|elect|partisan)",
            r"\b(politic\w*|govern\w*|elect\w*|vot(e|es|ed|ing|ers?)|legislat\w*|congress\w*|senat\w*|president\w*|parliament\w*|campaign\w*|democra\w*|republican\w*)\b",
        ),
        stem_pattern(
            r"^(crypto|bitcoin|blockchain|nft|token|web3)",
            r"\b(crypto\w*|bitcoin\w*|btc|eth(ereum)?|blockchain\w*|nfts?|tokens?|defi|altcoins?|web3|hodl\w*)\b",
        ),
        stem_pattern(
            r"^(sport|athlet|game)",
            r"\b(sport\w*|athlet\w*|football|soccer|basketball|baseball|hockey|tennis|nfl|nba|mlb|nhl|playoffs?|championships?|tournaments?|touchdowns?)\b",
        ),
        stem_pattern(
            r"^(negativ|toxic|hate|hateful|rude|angry|abus|harass)",
            r"\b(hat(e|ed|es|eful|ing)|toxic\w*|stupid\w*|idiot\w*|terribl\w*|awful\w*|disgust\w*|pathetic|furious\w*|angr(y|ier|iest)|moron\w*|losers?|trash)\b",
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        HeuristicClassifier
    }

    /// Test rules in declaration order; the first rule with enough matching words wins.
    pub fn classify(&self, text: &str, rules: &RuleSet) -> ClassificationResult {
        let haystack = text.to_lowercase();

        for rule in rules {
            if let Some(result) = self.match_rule(&haystack, rule) {
                return result;
            }
        }

        ClassificationResult {
            should_filter: false,
            matched_rule: None,
            confidence: Confidence::ZERO,
            method: Method::Keywords,
            reason: "No filter rule matched".to_string(),
            details: format!("Checked {} rule(s) with keyword matching", rules.len()),
        }
    }

    fn match_rule(&self, haystack: &str, rule: &FilterRule) -> Option<ClassificationResult> {
        let words = rule.words();
        if words.is_empty() {
            return None;
        }

        let matched: Vec<&String> = words
            .iter()
            .filter(|word| word_matches(haystack, word))
            .collect();

        let required = (words.len() + 1) / 2;
        if matched.len() < required {
            return None;
        }

        let matched_words: Vec<&str> = matched.iter().map(|w| w.as_str()).collect();
        Some(ClassificationResult {
            should_filter: true,
            matched_rule: Some(rule.as_str().to_string()),
            confidence: Confidence::from_fraction(matched.len(), words.len()),
            method: Method::Keywords,
            reason: format!("Matched filter \"{}\"", rule),
            details: format!(
                "{} of {} rule words matched: {}",
                matched.len(),
                words.len(),
                matched_words.join(", ")
            ),
        })
    }
}

fn word_matches(haystack: &str, word: &str) -> bool {
    if haystack.contains(word) {
        return true;
    }

    let via_synonyms = TOPIC_PATTERNS
        .iter()
        .filter(|topic| topic.aliases.contains(&word))
        .any(|topic| topic.text.is_match(haystack));
    if via_synonyms {
        return true;
    }

    STEM_PATTERNS
        .iter()
        .filter(|pattern| pattern.trigger.is_match(word))
        .any(|pattern| pattern.text.is_match(haystack))
}
