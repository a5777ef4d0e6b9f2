//! Citation lookup backends and the per-item resolution chain.

pub mod mock;
pub mod semantic_scholar;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use crate::Identifier;

/// A successful lookup payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CitationRecord {
    pub citation_count: u64,
    pub title: Option<String>,
}

/// Outcome of one lookup attempt against one identifier.
///
/// Kept tagged rather than collapsed to "no result" so callers can tell a
/// retryable 429 and a transport failure apart from a confirmed miss.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupAttempt {
    Found(CitationRecord),
    /// The API answered, but had no citation count for this identifier.
    Miss,
    /// Server returned 429 Too Many Requests.
    RateLimited { retry_after: Option<Duration> },
    /// Timeout, network failure, or malformed JSON.
    TransportError(String),
}

/// A backend that can look up a citation count by identifier.
pub trait CitationSource: Send + Sync {
    /// Canonical name of this source (e.g. "Semantic Scholar").
    fn name(&self) -> &str;

    fn lookup<'a>(
        &'a self,
        id: &'a Identifier,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupAttempt> + Send + 'a>>;
}

/// Outcome of resolving one item through the identifier chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(CitationRecord),
    /// The item carries neither DOI, arXiv id, nor title.
    NoIdentifier,
    /// Every attempted identifier came back empty.
    Miss,
    RateLimited { retry_after: Option<Duration> },
}

/// Try the item's identifiers in strict priority order: DOI, then arXiv id,
/// then title search. The first hit wins and later identifiers are never
/// attempted.
///
/// A miss or transport failure falls through to the next identifier; a 429
/// aborts the chain immediately so the caller can decide whether to requeue
/// the item.
pub async fn resolve_citation(
    doi: Option<&str>,
    arxiv_id: Option<&str>,
    title: Option<&str>,
    source: &dyn CitationSource,
    client: &reqwest::Client,
    timeout: Duration,
) -> Resolution {
    let candidates = [
        doi.map(|d| Identifier::Doi(d.to_string())),
        arxiv_id.map(|a| Identifier::Arxiv(a.to_string())),
        title.map(|t| Identifier::Title(t.to_string())),
    ];

    if candidates.iter().all(Option::is_none) {
        return Resolution::NoIdentifier;
    }

    for id in candidates.into_iter().flatten() {
        match source.lookup(&id, client, timeout).await {
            LookupAttempt::Found(record) => {
                tracing::debug!(kind = id.kind(), count = record.citation_count, "lookup hit");
                return Resolution::Resolved(record);
            }
            LookupAttempt::Miss => {
                tracing::debug!(kind = id.kind(), "lookup miss");
            }
            LookupAttempt::TransportError(err) => {
                // Folded into the miss path; the next identifier may still work.
                tracing::debug!(kind = id.kind(), error = %err, "lookup transport error");
            }
            LookupAttempt::RateLimited { retry_after } => {
                tracing::debug!(kind = id.kind(), "lookup rate limited");
                return Resolution::RateLimited { retry_after };
            }
        }
    }

    Resolution::Miss
}

#[cfg(test)]
mod tests {
    use super::mock::MockSource;
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn record(count: u64) -> CitationRecord {
        CitationRecord {
            citation_count: count,
            title: None,
        }
    }

    #[tokio::test]
    async fn doi_hit_suppresses_later_attempts() {
        let source = MockSource::new()
            .on_doi(LookupAttempt::Found(record(42)))
            .on_arxiv(LookupAttempt::Found(record(1)))
            .on_title(LookupAttempt::Found(record(2)));
        let client = reqwest::Client::new();

        let res = resolve_citation(
            Some("10.1/x"),
            Some("1234.5678"),
            Some("A Paper"),
            &source,
            &client,
            TIMEOUT,
        )
        .await;

        assert_eq!(res, Resolution::Resolved(record(42)));
        assert_eq!(source.calls("doi"), 1);
        assert_eq!(source.calls("arxiv"), 0);
        assert_eq!(source.calls("title"), 0);
    }

    #[tokio::test]
    async fn miss_falls_through_to_arxiv() {
        let source = MockSource::new()
            .on_doi(LookupAttempt::Miss)
            .on_arxiv(LookupAttempt::Found(record(7)));
        let client = reqwest::Client::new();

        let res = resolve_citation(
            Some("10.1/x"),
            Some("1234.5678"),
            Some("A Paper"),
            &source,
            &client,
            TIMEOUT,
        )
        .await;

        assert_eq!(res, Resolution::Resolved(record(7)));
        assert_eq!(source.calls("title"), 0);
    }

    #[tokio::test]
    async fn transport_error_treated_like_miss() {
        let source = MockSource::new()
            .on_doi(LookupAttempt::TransportError("timeout".into()))
            .on_title(LookupAttempt::Found(record(3)));
        let client = reqwest::Client::new();

        let res = resolve_citation(Some("10.1/x"), None, Some("A Paper"), &source, &client, TIMEOUT)
            .await;

        assert_eq!(res, Resolution::Resolved(record(3)));
    }

    #[tokio::test]
    async fn all_attempts_empty_is_miss() {
        let source = MockSource::new()
            .on_doi(LookupAttempt::Miss)
            .on_title(LookupAttempt::Miss);
        let client = reqwest::Client::new();

        let res = resolve_citation(Some("10.1/x"), None, Some("A Paper"), &source, &client, TIMEOUT)
            .await;

        assert_eq!(res, Resolution::Miss);
        assert_eq!(source.calls("doi"), 1);
        assert_eq!(source.calls("title"), 1);
    }

    #[tokio::test]
    async fn rate_limit_aborts_the_chain() {
        let source = MockSource::new()
            .on_doi(LookupAttempt::RateLimited {
                retry_after: Some(Duration::from_secs(3)),
            })
            .on_title(LookupAttempt::Found(record(9)));
        let client = reqwest::Client::new();

        let res = resolve_citation(Some("10.1/x"), None, Some("A Paper"), &source, &client, TIMEOUT)
            .await;

        assert_eq!(
            res,
            Resolution::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
        );
        assert_eq!(source.calls("title"), 0);
    }

    #[tokio::test]
    async fn no_identifiers_short_circuits() {
        let source = MockSource::new();
        let client = reqwest::Client::new();

        let res = resolve_citation(None, None, None, &source, &client, TIMEOUT).await;

        assert_eq!(res, Resolution::NoIdentifier);
        assert_eq!(source.total_calls(), 0);
    }
}
