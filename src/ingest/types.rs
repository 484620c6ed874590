// src/ingest/types.rs
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// One configured feed endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSource {
    pub url: String,
    /// Display name used when the feed itself carries no title.
    #[serde(default)]
    pub name: Option<String>,
}

impl FeedSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: None,
        }
    }

    pub fn named(url: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: Some(name.into()),
        }
    }
}

/// Loosely-typed record parsed from one RSS item / Atom entry.
/// Every field is optional; defaulting happens in `normalize`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFeedItem {
    pub title: Option<String>,
    /// Raw body (may contain HTML).
    pub content: Option<String>,
    /// Plain-text rendition of `content`.
    pub content_snippet: Option<String>,
    pub link: Option<String>,
    /// Date string exactly as published.
    pub pub_date: Option<String>,
    /// `pub_date` re-encoded as RFC 3339 UTC when it could be parsed.
    pub iso_date: Option<String>,
    pub enclosure_url: Option<String>,
}

/// Per-source result of one fetch attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Success {
        source_url: String,
        feed_title: Option<String>,
        items: Vec<RawFeedItem>,
    },
    Failure {
        source_url: String,
        error: anyhow::Error,
    },
}

impl FetchOutcome {
    pub fn source_url(&self) -> &str {
        match self {
            FetchOutcome::Success { source_url, .. } | FetchOutcome::Failure { source_url, .. } => {
                source_url
            }
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success { .. })
    }
}

/// Fan-out retrieval over the whole registry.
///
/// Implementations must return exactly one outcome per source, in registry
/// order, and must settle every source before returning. `Err` is reserved
/// for faults of the orchestration itself, never for a single bad source.
#[async_trait::async_trait]
pub trait FeedFetcher: Send + Sync {
    async fn fetch_all(&self, sources: &[FeedSource]) -> Result<Vec<FetchOutcome>>;
}
