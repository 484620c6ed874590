// src/ingest/fetcher.rs
use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use metrics::{counter, histogram};
use reqwest::Client;
use std::time::{Duration, Instant};

use crate::ingest::config::AggregatorConfig;
use crate::ingest::parser::{parse_feed, ParsedFeed};
use crate::ingest::types::{FeedFetcher, FeedSource, FetchOutcome};

/// Fetches every source over HTTP, one tokio task per source.
#[derive(Clone)]
pub struct HttpFeedFetcher {
    client: Client,
    timeout: Duration,
    max_items: usize,
    max_body_bytes: usize,
}

impl HttpFeedFetcher {
    pub fn new(cfg: &AggregatorConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.clone())
            .build()
            .context("building feed http client")?;
        Ok(Self {
            client,
            timeout: cfg.fetch_timeout,
            max_items: cfg.max_items_per_source,
            max_body_bytes: cfg.max_feed_bytes,
        })
    }

    /// Retrieve and parse one source, folding every error into `Failure`.
    pub async fn fetch_one(&self, source: &FeedSource) -> FetchOutcome {
        let t0 = Instant::now();
        let res = self.fetch_and_parse(&source.url).await;
        histogram!("news_fetch_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);

        match res {
            Ok(mut feed) => {
                feed.items.truncate(self.max_items);
                counter!("news_fetch_total", "outcome" => "success").increment(1);
                tracing::debug!(
                    source = %source.url,
                    items = feed.items.len(),
                    "feed fetched"
                );
                FetchOutcome::Success {
                    source_url: source.url.clone(),
                    feed_title: feed.title,
                    items: feed.items,
                }
            }
            Err(error) => {
                counter!("news_fetch_total", "outcome" => "failure").increment(1);
                tracing::warn!(error = ?error, source = %source.url, "feed fetch failed");
                FetchOutcome::Failure {
                    source_url: source.url.clone(),
                    error,
                }
            }
        }
    }

    async fn fetch_and_parse(&self, url: &str) -> Result<ParsedFeed> {
        let resp = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .context("feed http get()")?;
        let mut resp = resp.error_for_status().context("feed http status")?;

        let limit = self.max_body_bytes;
        if let Some(len) = resp.content_length() {
            if len > limit as u64 {
                bail!("feed body of {len} bytes exceeds the {limit} byte limit");
            }
        }
        // Content-Length may be absent or wrong; enforce while streaming too.
        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await.context("feed http body")? {
            if body.len() + chunk.len() > limit {
                bail!("feed body exceeds the {limit} byte limit");
            }
            body.extend_from_slice(&chunk);
        }

        parse_feed(&String::from_utf8_lossy(&body)).context("parsing feed xml")
    }
}

#[async_trait]
impl FeedFetcher for HttpFeedFetcher {
    async fn fetch_all(&self, sources: &[FeedSource]) -> Result<Vec<FetchOutcome>> {
        let handles: Vec<_> = sources
            .iter()
            .cloned()
            .map(|source| {
                let this = self.clone();
                tokio::spawn(async move { this.fetch_one(&source).await })
            })
            .collect();

        // join_all keeps registry order and waits for every task.
        let mut outcomes = Vec::with_capacity(handles.len());
        for (joined, source) in join_all(handles).await.into_iter().zip(sources) {
            let outcome =
                joined.map_err(|e| anyhow!("fetch task for {} did not complete: {e}", source.url))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }
}
