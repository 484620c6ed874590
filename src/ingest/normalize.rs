// src/ingest/normalize.rs
use chrono::{DateTime, SecondsFormat, Utc};
use once_cell::sync::OnceCell;
use regex::Regex;
use sha2::{Digest, Sha256};

use crate::ingest::types::RawFeedItem;
use crate::news::NewsItem;
use crate::sentiment::{Sentiment, SentimentAnalyzer};

pub const UNKNOWN_SOURCE: &str = "Unknown";

/// Plain text from feed markup: decode entities, strip tags, ASCII quotes,
/// collapse whitespace, cap at 1500 chars.
pub fn plain_text(s: &str) -> String {
    // 1) HTML entity decode
    let mut out = html_escape::decode_html_entities(s).to_string();

    // 2) Strip HTML tags
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[a-z!][^>]*>").expect("tag regex"));
    out = re_tags.replace_all(&out, " ").to_string();

    // 3) Normalize “ ” ‘ ’ « » to ASCII quotes
    out = out
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");

    // 4) Collapse whitespace
    static RE_WS: OnceCell<Regex> = OnceCell::new();
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").expect("ws regex"));
    out = re_ws.replace_all(&out, " ").trim().to_string();

    // 5) Length cap
    if out.chars().count() > 1500 {
        out = out.chars().take(1500).collect();
    }

    out
}

/// Dedup key: hex SHA-256 of `url` followed by `timestamp`.
pub fn make_id(url: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_bytes());
    hasher.update(timestamp.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest.iter() {
        use std::fmt::Write as _;
        let _ = write!(&mut out, "{:02x}", b);
    }
    out
}

/// Map one raw feed item into the canonical record, reading the wall clock
/// only when the item carries no date.
pub fn normalize(raw: &RawFeedItem, source_name: &str, analyzer: &SentimentAnalyzer) -> NewsItem {
    normalize_at(raw, source_name, analyzer, Utc::now())
}

/// `normalize` with an explicit "now" for the missing-date fallback.
pub fn normalize_at(
    raw: &RawFeedItem,
    source_name: &str,
    analyzer: &SentimentAnalyzer,
    now: DateTime<Utc>,
) -> NewsItem {
    let title = raw.title.clone().unwrap_or_default();
    let description = raw
        .content_snippet
        .clone()
        .or_else(|| raw.content.clone())
        .unwrap_or_default();
    let url = raw.link.clone().unwrap_or_default();
    let timestamp = raw
        .iso_date
        .clone()
        .or_else(|| raw.pub_date.clone())
        .unwrap_or_else(|| now.to_rfc3339_opts(SecondsFormat::Millis, true));

    let score = analyzer.score_text(&format!("{}. {}", title, description));
    let sentiment = Sentiment::from_score(score);
    let id = make_id(&url, &timestamp);

    let source = match source_name.trim() {
        "" => UNKNOWN_SOURCE.to_string(),
        s => s.to_string(),
    };

    NewsItem {
        id,
        title,
        description,
        timestamp,
        url,
        source,
        image: raw.enclosure_url.clone().unwrap_or_default(),
        sentiment,
        score,
    }
}
