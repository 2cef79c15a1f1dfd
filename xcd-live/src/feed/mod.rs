//! Live timing feeds
//!
//! A feed source turns a public live-results URL into the full list of
//! timing entries currently reported for a meet. Every fetch is a fresh
//! snapshot; nothing carries over between fetches.

pub mod pttiming;

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use xcd_common::TimingEntry;

pub use pttiming::PtTimingClient;

/// Feed fetch errors
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Invalid live results URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Feed request failed with HTTP {0}")]
    Status(u16),

    #[error("Invalid feed data: {0}")]
    Parse(String),

    #[error("Feed request timed out after {0:?}")]
    Timeout(Duration),
}

/// One fetched feed snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RaceFeed {
    pub race_title: String,
    /// Every entry across every race in the meet, grouped by event
    pub entries: Vec<TimingEntry>,
}

impl RaceFeed {
    pub fn empty(race_title: impl Into<String>) -> Self {
        Self {
            race_title: race_title.into(),
            entries: Vec::new(),
        }
    }
}

/// Source of live timing snapshots
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Reject URLs this source cannot fetch, before any network activity
    fn validate_url(&self, url: &str) -> Result<(), FeedError>;

    /// Fetch and parse the current snapshot behind `url`
    async fn fetch(&self, url: &str) -> Result<RaceFeed, FeedError>;
}
