//! Feed snapshot store: fetches the fixed Hacker News feed list and caches
//! the whole fetch cycle as a single unit.
//!
//! A refresh is all-or-nothing: if any single source answers with a
//! non-success status, the whole cycle fails and the previous snapshot stays
//! untouched. Partial snapshots are never written.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::cache::{CacheDir, CacheSlot, SNAPSHOT_SLOT};
use crate::config::{HttpTuning, USER_AGENT};
use crate::error::{RadarError, Result};
use crate::pipeline::SnapshotStore;

/// The fixed set of discussion feeds forming one fetch cycle.
pub const CORE_FEEDS: [&str; 4] = [
    "https://hnrss.org/ask?comments=10",
    "https://hnrss.org/show?points=50",
    "https://hnrss.org/newest?points=50",
    "https://hnrss.org/bestcomments",
];

/// One fetched feed's raw content. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedRecord {
    pub feed: String,
    pub fetched_at: DateTime<Utc>,
    pub payload: String,
}

/// One complete fetch cycle across all configured sources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub generated_at: DateTime<Utc>,
    pub feeds: Vec<FeedRecord>,
}

pub struct FeedStore {
    client: reqwest::Client,
    sources: Vec<String>,
    slot: CacheSlot<FeedSnapshot>,
}

impl FeedStore {
    pub fn new(cache: &CacheDir, tuning: HttpTuning) -> Self {
        Self::with_sources(
            cache,
            tuning,
            CORE_FEEDS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Source list injection for tests (local listeners instead of hnrss.org).
    pub fn with_sources(cache: &CacheDir, tuning: HttpTuning, sources: Vec<String>) -> Self {
        Self {
            client: tuning.client(USER_AGENT),
            sources,
            slot: cache.slot(SNAPSHOT_SLOT),
        }
    }

    async fn fetch_one(&self, feed: &str) -> Result<FeedRecord> {
        info!(feed, "fetching feed");
        let resp = self
            .client
            .get(feed)
            .header("cache-control", "no-cache")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            error!(feed, status = status.as_u16(), "feed fetch failed");
            return Err(RadarError::transport(
                feed,
                status.as_u16(),
                "feed source returned non-success status",
            ));
        }

        let payload = resp.text().await?;
        info!(feed, chars = payload.len(), "feed fetched");
        counter!("feed_fetch_total").increment(1);

        Ok(FeedRecord {
            feed: feed.to_string(),
            fetched_at: Utc::now(),
            payload,
        })
    }
}

#[async_trait]
impl SnapshotStore for FeedStore {
    async fn refresh(&self) -> Result<FeedSnapshot> {
        let mut feeds = Vec::with_capacity(self.sources.len());
        for feed in &self.sources {
            feeds.push(self.fetch_one(feed).await?);
        }

        let snapshot = FeedSnapshot {
            generated_at: Utc::now(),
            feeds,
        };

        self.slot.write(&snapshot)?;
        info!(
            feeds = snapshot.feeds.len(),
            path = %self.slot.path().display(),
            "snapshot saved"
        );
        Ok(snapshot)
    }

    async fn read(&self) -> Option<FeedSnapshot> {
        self.slot.read()
    }

    fn cache_path(&self) -> std::path::PathBuf {
        self.slot.path().to_path_buf()
    }
}
