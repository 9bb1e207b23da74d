//! Headline summaries for the news widget.
//!
//! The feed is re-read at most once per TTL window. Articles are summarised once per GUID and the
//! summaries are kept for the life of the process; only the latest window of the feed is served.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::cache::{lock, Clock, Stamped, TtlSlot};
use crate::error::Result;
use crate::feed::{self, FeedItem, ALLOWED_CATEGORIES};
use crate::llm::Summarizer;

pub const MAX_ITEMS: usize = 5;
pub const PLACEHOLDER: &str = "Summary not available";

pub fn ttl() -> Duration {
    Duration::minutes(30)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Summary {
    pub guid: String,
    pub title: String,
    pub link: String,
    #[serde(rename = "pubDate")]
    pub published_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub summary: String,
}

impl Summary {
    fn new(item: &FeedItem, summary: impl Into<String>) -> Self {
        Summary {
            guid: item.guid.clone(),
            title: item.title.clone(),
            link: item.link.clone(),
            published_at: item.published_at,
            description: item.description.clone(),
            summary: summary.into(),
        }
    }
}

/// Summaries keyed by article GUID.
pub trait SummaryStore: Send + Sync {
    fn get(&self, guid: &str) -> Option<Summary>;
    /// Stores the summary unless its GUID is already present. Returns whether it was stored.
    fn insert(&self, summary: Summary) -> bool;
    fn len(&self) -> usize;
}

#[derive(Default)]
pub struct MemorySummaryStore {
    entries: Mutex<HashMap<String, Summary>>,
}

impl SummaryStore for MemorySummaryStore {
    fn get(&self, guid: &str) -> Option<Summary> {
        lock(&self.entries).get(guid).cloned()
    }

    fn insert(&self, summary: Summary) -> bool {
        let mut entries = lock(&self.entries);
        if entries.contains_key(&summary.guid) {
            return false;
        }
        entries.insert(summary.guid.clone(), summary);
        true
    }

    fn len(&self) -> usize {
        lock(&self.entries).len()
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Cache,
    Fresh,
    None,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewsResponse {
    pub source: Source,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub summaries: Vec<Summary>,
}

impl NewsResponse {
    fn from_batch(batch: Stamped<Vec<Summary>>) -> Self {
        NewsResponse {
            source: Source::Cache,
            cached: false,
            updated: Some(batch.stored_at),
            message: None,
            summaries: batch.value,
        }
    }
}

pub struct NewsService {
    feed_url: String,
    summarizer: Option<Arc<dyn Summarizer>>,
    store: Arc<dyn SummaryStore>,
    batch: TtlSlot<Vec<Summary>>,
}

impl NewsService {
    pub fn new(
        feed_url: impl Into<String>,
        summarizer: Option<Arc<dyn Summarizer>>,
        store: Arc<dyn SummaryStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        NewsService {
            feed_url: feed_url.into(),
            summarizer,
            store,
            batch: TtlSlot::new(clock, ttl()),
        }
    }

    pub async fn get_summaries(&self) -> Result<NewsResponse> {
        let Some(summarizer) = self.summarizer.as_ref() else {
            tracing::warn!("OPENAI_API_KEY not configured, news summaries disabled");
            return Ok(NewsResponse {
                source: Source::None,
                cached: false,
                updated: None,
                message: Some("News summaries not configured".to_string()),
                summaries: Vec::new(),
            });
        };

        if let Some(batch) = self.batch.get_fresh() {
            tracing::debug!(items = batch.value.len(), "news cache hit");
            return Ok(NewsResponse::from_batch(batch));
        }

        let xml = feed::fetch_feed(&self.feed_url).await?;
        let items = feed::parse_feed(&xml)?;
        let selected = feed::select_items(items, &ALLOWED_CATEGORIES, MAX_ITEMS);
        tracing::info!(selected = selected.len(), "news feed fetched");

        Ok(self.refresh(summarizer.as_ref(), selected).await)
    }

    async fn refresh(&self, summarizer: &dyn Summarizer, selected: Vec<FeedItem>) -> NewsResponse {
        let new_items: Vec<&FeedItem> = selected
            .iter()
            .filter(|item| self.store.get(&item.guid).is_none())
            .collect();

        let mut placeholders = HashMap::new();
        for item in &new_items {
            match summarizer.summarize(item).await {
                Ok(text) => {
                    self.store.insert(Summary::new(item, text));
                }
                Err(err) => {
                    tracing::warn!(guid = %item.guid, title = %item.title, error = %err, "failed to summarize article");
                    placeholders.insert(item.guid.clone(), Summary::new(item, PLACEHOLDER));
                }
            }
        }

        let failed = placeholders.len();
        if !new_items.is_empty() && failed == new_items.len() {
            if let Some(previous) = self.batch.get_any() {
                tracing::warn!("summarizer unavailable, serving previous news batch");
                return NewsResponse {
                    cached: true,
                    ..NewsResponse::from_batch(previous)
                };
            }
        }

        let summaries: Vec<Summary> = selected
            .iter()
            .filter_map(|item| {
                self.store
                    .get(&item.guid)
                    .or_else(|| placeholders.remove(&item.guid))
            })
            .collect();

        tracing::info!(
            summarized = new_items.len() - failed,
            reused = selected.len() - new_items.len(),
            "news batch refreshed"
        );

        self.batch.put(summaries.clone());
        NewsResponse {
            source: Source::Fresh,
            cached: false,
            updated: Some(self.batch.now()),
            message: None,
            summaries,
        }
    }
}
