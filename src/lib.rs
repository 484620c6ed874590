// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod api;
pub mod ingest;
pub mod metrics;
pub mod news;
pub mod sentiment;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::ingest::types::{FeedFetcher, FeedSource, FetchOutcome, RawFeedItem};
pub use crate::ingest::Aggregator;
pub use crate::news::{NewsItem, NewsResponse};
pub use crate::sentiment::{Sentiment, SentimentAnalyzer};
