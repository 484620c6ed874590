//! Lexicon-based sentiment scoring for headlines and snippets.
//!
//! Every token is looked up in an AFINN-165 derived lexicon (word -> weight in
//! -5..=5) and the matched weights are summed. A market overlay is applied on
//! top of the general list: it adds trading vocabulary ("bullish", "rug",
//! "liquidations") and re-weights words whose everyday sense misleads on
//! financial headlines ("fine" as a penalty, "greed" as the sentiment index).
//! A negator directly in front of a scored word flips that word's sign
//! ("not bullish" counts as bearish).

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, i32>> = Lazy::new(|| {
    let mut words: HashMap<String, i32> =
        serde_json::from_str(include_str!("../lexicon/general.json"))
            .expect("valid general lexicon");
    let market: HashMap<String, i32> =
        serde_json::from_str(include_str!("../lexicon/market.json"))
            .expect("valid market lexicon");
    words.extend(market);
    words
});

/// Score at or above which an item is labelled bullish.
pub const BULLISH_THRESHOLD: i32 = 2;
/// Score at or below which an item is labelled bearish.
pub const BEARISH_THRESHOLD: i32 = -2;

/// Three-way label derived from a raw lexicon score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Bullish,
    Bearish,
    Neutral,
}

impl Sentiment {
    pub fn from_score(score: i32) -> Self {
        let mut label = Sentiment::Neutral;
        if score >= BULLISH_THRESHOLD {
            label = Sentiment::Bullish;
        }
        if score <= BEARISH_THRESHOLD {
            label = Sentiment::Bearish;
        }
        label
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "bullish",
            Sentiment::Bearish => "bearish",
            Sentiment::Neutral => "neutral",
        }
    }
}

/// Detailed result of scoring one block of text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentScore {
    /// Sum of matched lexicon weights (after negation).
    pub score: i32,
    /// `score` divided by the number of tokens; 0.0 for empty input.
    pub comparative: f32,
    pub tokens: usize,
    /// Words that contributed positively, in text order.
    pub positive: Vec<String>,
    /// Words that contributed negatively, in text order.
    pub negative: Vec<String>,
}

/// Stateless scorer; the lexicon is shared process-wide, so clones are free
/// and one instance can serve concurrent aggregations.
#[derive(Debug, Clone, Default)]
pub struct SentimentAnalyzer;

impl SentimentAnalyzer {
    pub fn new() -> Self {
        Self
    }

    #[inline]
    fn word_score(&self, w: &str) -> i32 {
        *LEXICON.get(w).unwrap_or(&0)
    }

    pub fn score(&self, text: &str) -> SentimentScore {
        let tokens: Vec<String> = tokenize(text).collect();
        let mut score: i32 = 0;
        let mut positive = Vec::new();
        let mut negative = Vec::new();

        for (i, w) in tokens.iter().enumerate() {
            let base = self.word_score(w);
            if base == 0 {
                continue;
            }
            let negated = i > 0 && is_negator(tokens[i - 1].as_str());
            let adj = if negated { -base } else { base };
            if adj > 0 {
                positive.push(w.clone());
            } else {
                negative.push(w.clone());
            }
            score += adj;
        }

        let comparative = if tokens.is_empty() {
            0.0
        } else {
            score as f32 / tokens.len() as f32
        };

        SentimentScore {
            score,
            comparative,
            tokens: tokens.len(),
            positive,
            negative,
        }
    }

    /// Shorthand for `score(text).score`.
    pub fn score_text(&self, text: &str) -> i32 {
        self.score(text).score
    }
}

/// Lower-cased word tokens. Apostrophes and hyphens are kept inside a word
/// ("don't", "all-time") but trimmed from its edges.
fn tokenize(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '-' || c == '\u{2019}'))
        .map(|t| t.trim_matches(|c: char| c == '\'' || c == '-' || c == '\u{2019}'))
        .filter(|t| !t.is_empty())
        .map(|t| t.replace('\u{2019}', "'").to_lowercase())
}

fn is_negator(tok: &str) -> bool {
    matches!(
        tok,
        "not"
            | "no"
            | "never"
            | "isn't"
            | "wasn't"
            | "aren't"
            | "won't"
            | "don't"
            | "doesn't"
            | "didn't"
            | "can't"
            | "cannot"
            | "without"
    )
}
