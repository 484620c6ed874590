// src/news.rs
use serde::{Deserialize, Serialize};

use crate::sentiment::Sentiment;

/// Canonical, client-facing news record produced by one aggregation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Dedup key; a pure function of `url` + `timestamp`.
    pub id: String,
    pub title: String,
    pub description: String,
    /// ISO-8601 instant as reported by the feed, or the normalization time.
    pub timestamp: String,
    pub url: String,
    pub source: String,
    pub image: String,
    pub sentiment: Sentiment,
    pub score: i32,
}

/// Body of `GET /api/news`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsResponse {
    pub success: bool,
    pub news: Vec<NewsItem>,
}

impl NewsResponse {
    pub fn ok(news: Vec<NewsItem>) -> Self {
        Self {
            success: true,
            news,
        }
    }

    pub fn failed() -> Self {
        Self {
            success: false,
            news: Vec::new(),
        }
    }
}
