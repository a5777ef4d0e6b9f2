use std::time::Duration;

pub mod annotation;
pub mod config_file;
pub mod identifiers;
pub mod orchestrator;
pub mod rate_limit;
pub mod source;
pub mod store;

// Re-export for convenience
pub use annotation::{merge_citation_block, parse_citation_block, store_citation_count};
pub use identifiers::extract_arxiv_id;
pub use orchestrator::{estimate_batch_seconds, update_items};
pub use rate_limit::RequestPacer;
pub use source::{CitationRecord, CitationSource, LookupAttempt, Resolution, resolve_citation};
pub use store::{LibraryItem, StoreError};

/// A lookup key derived from an item's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Doi(String),
    Arxiv(String),
    Title(String),
}

impl Identifier {
    /// Short tag for logging and mock bookkeeping.
    pub fn kind(&self) -> &'static str {
        match self {
            Identifier::Doi(_) => "doi",
            Identifier::Arxiv(_) => "arxiv",
            Identifier::Title(_) => "title",
        }
    }
}

/// Terminal outcome for one processed item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// A citation count was fetched and written to the item.
    Updated(u64),
    /// No identifier matched anything (or only transport errors occurred).
    NotFound,
    /// No usable identifier, a storage failure, or a terminal rate limit.
    Failed,
}

/// Aggregate counters for one batch run. Discarded after reporting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub updated: usize,
    pub not_found: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BatchOutcome {
    pub fn total(&self) -> usize {
        self.updated + self.not_found + self.failed + self.skipped
    }
}

/// Progress events emitted during a batch run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Checking {
        index: usize,
        total: usize,
        /// Item title truncated to 50 chars (plus `...` when cut).
        title: String,
    },
    Result {
        index: usize,
        total: usize,
        status: ItemStatus,
    },
    /// A retry pass over rate-limited items is starting.
    RetryPass {
        count: usize,
    },
    /// Waiting out a 429 backoff before retrying an item.
    RetryWait {
        index: usize,
        wait: Duration,
    },
}

/// Configuration for the citation count updater.
#[derive(Clone)]
pub struct Config {
    /// Semantic Scholar API key, sent as `x-api-key` when present.
    pub api_key: Option<String>,
    /// Graph API base, ending in `/paper/`.
    pub base_url: String,
    pub request_timeout: Duration,
    /// Minimum gap between consecutive outbound lookups.
    pub min_request_interval: Duration,
    /// Requeue 429'd items once with backoff instead of failing them outright.
    pub retry_rate_limited: bool,
}

pub const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/";
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(1100);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            min_request_interval: DEFAULT_REQUEST_INTERVAL,
            retry_rate_limited: true,
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("base_url", &self.base_url)
            .field("request_timeout", &self.request_timeout)
            .field("min_request_interval", &self.min_request_interval)
            .field("retry_rate_limited", &self.retry_rate_limited)
            .finish()
    }
}
