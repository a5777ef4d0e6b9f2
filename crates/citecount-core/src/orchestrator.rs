//! Sequential batch driver: items in, counters out.
//!
//! One item is fully processed (lookup, write, pacing wait) before the next
//! begins. Per-item failures are tallied, never propagated; nothing aborts
//! the batch except cancellation, which is honored between items only.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::annotation::store_citation_count;
use crate::identifiers::extract_arxiv_id;
use crate::rate_limit::RequestPacer;
use crate::source::{CitationSource, Resolution, resolve_citation};
use crate::store::LibraryItem;
use crate::{BatchOutcome, Config, ItemStatus, ProgressEvent};

/// Result of one pass over one item. Rate limits are not terminal on the
/// first pass; the item goes into the retry queue.
enum ItemAttempt {
    Terminal(ItemStatus),
    RateLimited { retry_after: Option<Duration> },
}

/// Process an ordered batch of items, fetching and storing citation counts.
///
/// Non-regular items (attachments, notes) are skipped without a lookup or a
/// pacing charge. Every regular item charges exactly one
/// [`RequestPacer::wait_turn`] after processing, whatever its outcome.
///
/// Items that hit a 429 are requeued once and retried after a backoff
/// (unless [`Config::retry_rate_limited`] is off, in which case they fail
/// immediately). Cancellation stops the run at the next item boundary;
/// already-queued retries are then counted as failed.
pub async fn update_items(
    items: &mut [Box<dyn LibraryItem>],
    source: &dyn CitationSource,
    client: &reqwest::Client,
    config: &Config,
    pacer: &RequestPacer,
    progress: impl Fn(ProgressEvent) + Send + Sync,
    cancel: CancellationToken,
) -> BatchOutcome {
    let total = items.len();
    let mut outcome = BatchOutcome::default();
    let mut retry_queue: Vec<(usize, Option<Duration>)> = Vec::new();

    for i in 0..total {
        if cancel.is_cancelled() {
            tracing::info!(processed = i, total, "batch cancelled");
            break;
        }

        if !items[i].is_regular() {
            outcome.skipped += 1;
            continue;
        }

        let title = items[i].get_field("title").unwrap_or_default();
        progress(ProgressEvent::Checking {
            index: i,
            total,
            title: truncate_title(&title),
        });

        match process_item(items[i].as_mut(), source, client, config).await {
            ItemAttempt::Terminal(status) => {
                tally(&mut outcome, &status);
                progress(ProgressEvent::Result {
                    index: i,
                    total,
                    status,
                });
            }
            ItemAttempt::RateLimited { retry_after } => {
                if config.retry_rate_limited {
                    retry_queue.push((i, retry_after));
                } else {
                    outcome.failed += 1;
                    progress(ProgressEvent::Result {
                        index: i,
                        total,
                        status: ItemStatus::Failed,
                    });
                }
            }
        }

        pacer.wait_turn().await;
    }

    if !retry_queue.is_empty() {
        progress(ProgressEvent::RetryPass {
            count: retry_queue.len(),
        });

        for (i, retry_after) in retry_queue {
            if cancel.is_cancelled() {
                // This item already failed once; without its retry it stays failed.
                outcome.failed += 1;
                continue;
            }

            let backoff = retry_after
                .unwrap_or_default()
                .max(config.min_request_interval * 2);
            progress(ProgressEvent::RetryWait {
                index: i,
                wait: backoff,
            });
            tokio::time::sleep(backoff).await;

            let status = match process_item(items[i].as_mut(), source, client, config).await {
                ItemAttempt::Terminal(status) => status,
                // Second 429 is terminal.
                ItemAttempt::RateLimited { .. } => ItemStatus::Failed,
            };
            tally(&mut outcome, &status);
            progress(ProgressEvent::Result {
                index: i,
                total,
                status,
            });

            pacer.wait_turn().await;
        }
    }

    tracing::info!(
        updated = outcome.updated,
        not_found = outcome.not_found,
        failed = outcome.failed,
        skipped = outcome.skipped,
        "batch complete"
    );
    outcome
}

async fn process_item(
    item: &mut dyn LibraryItem,
    source: &dyn CitationSource,
    client: &reqwest::Client,
    config: &Config,
) -> ItemAttempt {
    let doi = item.get_field("DOI").filter(|v| !v.trim().is_empty());
    let title = item.get_field("title").filter(|v| !v.trim().is_empty());
    let url = item.get_field("url").unwrap_or_default();
    let extra = item.get_field("extra").unwrap_or_default();
    let arxiv_id = extract_arxiv_id(&url, &extra);

    let resolution = resolve_citation(
        doi.as_deref(),
        arxiv_id.as_deref(),
        title.as_deref(),
        source,
        client,
        config.request_timeout,
    )
    .await;

    match resolution {
        Resolution::Resolved(record) => {
            match store_citation_count(item, record.citation_count).await {
                Ok(()) => ItemAttempt::Terminal(ItemStatus::Updated(record.citation_count)),
                Err(e) => {
                    tracing::debug!(item = item.id(), error = %e, "store failed");
                    ItemAttempt::Terminal(ItemStatus::Failed)
                }
            }
        }
        Resolution::NoIdentifier => {
            tracing::debug!(item = item.id(), "no identifiers for item");
            ItemAttempt::Terminal(ItemStatus::Failed)
        }
        Resolution::Miss => ItemAttempt::Terminal(ItemStatus::NotFound),
        Resolution::RateLimited { retry_after } => ItemAttempt::RateLimited { retry_after },
    }
}

fn tally(outcome: &mut BatchOutcome, status: &ItemStatus) {
    match status {
        ItemStatus::Updated(_) => outcome.updated += 1,
        ItemStatus::NotFound => outcome.not_found += 1,
        ItemStatus::Failed => outcome.failed += 1,
    }
}

/// Progress-trace form of a title: at most 50 chars, `...` marks the cut.
fn truncate_title(title: &str) -> String {
    let short: String = title.chars().take(50).collect();
    if title.chars().count() > 50 {
        format!("{short}...")
    } else {
        short
    }
}

/// Rough wall-clock estimate for a batch of `count` items, in whole seconds.
/// Used for the "this may take a while" confirmation before a full-library run.
pub fn estimate_batch_seconds(count: usize, interval: Duration) -> u64 {
    let total_ms = count as u64 * interval.as_millis() as u64;
    total_ms.div_ceil(1000)
}
