// src/ingest/mod.rs
//! Fan-out fetch → normalize → dedup → newest-first ranking.

pub mod config;
pub mod dates;
pub mod fetcher;
pub mod normalize;
pub mod parser;
pub mod registry;
pub mod types;

use anyhow::{bail, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use crate::ingest::config::AggregatorConfig;
use crate::ingest::fetcher::HttpFeedFetcher;
use crate::ingest::normalize::{normalize, UNKNOWN_SOURCE};
use crate::ingest::types::{FeedFetcher, FeedSource, FetchOutcome};
use crate::news::NewsItem;
use crate::sentiment::SentimentAnalyzer;

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_fetch_total", "Feed fetch attempts by outcome.");
        describe_histogram!("news_fetch_ms", "Per-source fetch + parse time in milliseconds.");
        describe_counter!(
            "news_items_normalized_total",
            "Raw items normalized from successful sources."
        );
        describe_counter!(
            "news_empty_url_dropped_total",
            "Items dropped because they carry no link."
        );
        describe_counter!(
            "news_dedup_dropped_total",
            "Items dropped as duplicates of an earlier (url, timestamp)."
        );
        describe_histogram!("news_aggregate_ms", "Whole aggregation time in milliseconds.");
        describe_gauge!("news_last_run_ts", "Unix ts when aggregation last completed.");
    });
}

/// Counters from one aggregation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
    pub sources_ok: usize,
    pub sources_failed: usize,
    pub normalized: usize,
    pub dropped_empty_url: usize,
    pub dropped_duplicate: usize,
}

/// Drop link-less items and repeated ids (first occurrence wins), then sort
/// newest first. Unparsable timestamps go last, keeping their relative order.
/// Returns (kept, dropped_empty_url, dropped_duplicate).
pub fn dedup_and_sort(items: Vec<NewsItem>) -> (Vec<NewsItem>, usize, usize) {
    let mut seen: HashSet<String> = HashSet::with_capacity(items.len());
    let mut empty_url = 0usize;
    let mut dup = 0usize;
    let mut keyed = Vec::with_capacity(items.len());

    for it in items {
        if it.url.is_empty() {
            empty_url += 1;
            continue;
        }
        if !seen.insert(it.id.clone()) {
            dup += 1;
            continue;
        }
        keyed.push((dates::sort_key(&it.timestamp), it));
    }

    // Stable: equal instants keep flatten order.
    keyed.sort_by(|(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => b.cmp(a),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });

    (keyed.into_iter().map(|(_, it)| it).collect(), empty_url, dup)
}

/// Pick the display name for a successful source.
fn resolve_source_name(feed_title: Option<&str>, source: &FeedSource) -> String {
    feed_title
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .or_else(|| source.name.as_deref().filter(|n| !n.trim().is_empty()))
        .unwrap_or(UNKNOWN_SOURCE)
        .to_string()
}

/// The aggregation pipeline. Holds no mutable state, so one instance can be
/// shared across concurrent requests.
#[derive(Clone)]
pub struct Aggregator {
    sources: Arc<Vec<FeedSource>>,
    fetcher: Arc<dyn FeedFetcher>,
    analyzer: SentimentAnalyzer,
}

impl Aggregator {
    pub fn new(sources: Vec<FeedSource>, fetcher: Arc<dyn FeedFetcher>) -> Self {
        Self {
            sources: Arc::new(sources),
            fetcher,
            analyzer: SentimentAnalyzer::new(),
        }
    }

    /// Production wiring: HTTP fetcher built from `cfg`.
    pub fn from_config(sources: Vec<FeedSource>, cfg: &AggregatorConfig) -> Result<Self> {
        let fetcher = HttpFeedFetcher::new(cfg)?;
        Ok(Self::new(sources, Arc::new(fetcher)))
    }

    pub fn sources(&self) -> &[FeedSource] {
        &self.sources
    }

    /// Run one full aggregation cycle.
    ///
    /// Per-source failures are absorbed; `Err` means the pipeline itself
    /// faulted and no partial result should be served.
    pub async fn aggregate(&self) -> Result<Vec<NewsItem>> {
        self.aggregate_with_stats().await.map(|(news, _)| news)
    }

    pub async fn aggregate_with_stats(&self) -> Result<(Vec<NewsItem>, AggregateStats)> {
        ensure_metrics_described();
        let t0 = Instant::now();

        let outcomes = self.fetcher.fetch_all(&self.sources).await?;
        if outcomes.len() != self.sources.len() {
            bail!(
                "fetcher returned {} outcomes for {} sources",
                outcomes.len(),
                self.sources.len()
            );
        }

        let mut stats = AggregateStats::default();
        let mut flat = Vec::new();
        for (outcome, source) in outcomes.into_iter().zip(self.sources.iter()) {
            if outcome.source_url() != source.url {
                bail!(
                    "outcome for {} arrived in the slot of {}",
                    outcome.source_url(),
                    source.url
                );
            }
            match outcome {
                FetchOutcome::Success {
                    feed_title, items, ..
                } => {
                    stats.sources_ok += 1;
                    let name = resolve_source_name(feed_title.as_deref(), source);
                    flat.extend(items.iter().map(|raw| normalize(raw, &name, &self.analyzer)));
                }
                FetchOutcome::Failure { .. } => stats.sources_failed += 1,
            }
        }
        stats.normalized = flat.len();

        let (news, empty_url, dup) = dedup_and_sort(flat);
        stats.dropped_empty_url = empty_url;
        stats.dropped_duplicate = dup;

        // Telemetry
        counter!("news_items_normalized_total").increment(stats.normalized as u64);
        counter!("news_empty_url_dropped_total").increment(empty_url as u64);
        counter!("news_dedup_dropped_total").increment(dup as u64);
        histogram!("news_aggregate_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        gauge!("news_last_run_ts").set(chrono::Utc::now().timestamp() as f64);

        if stats.sources_ok == 0 && !self.sources.is_empty() {
            tracing::warn!(sources = self.sources.len(), "every feed source failed");
        }
        tracing::info!(
            target: "ingest",
            kept = news.len(),
            ok = stats.sources_ok,
            failed = stats.sources_failed,
            empty_url,
            dedup = dup,
            "aggregation finished"
        );

        Ok((news, stats))
    }
}
