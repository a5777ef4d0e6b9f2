//! Pacing of outbound API requests.
//!
//! The orchestrator charges one [`RequestPacer::wait_turn`] per processed
//! item, not per lookup attempt, so total batch duration stays predictable
//! even when an item tries DOI, arXiv, and title in turn.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::DEFAULT_REQUEST_INTERVAL;

/// Enforces a minimum gap between consecutive dispatches.
///
/// Owned by whoever runs the batch and passed by reference; there is no
/// process-wide singleton. The timestamp lock is held across the sleep, so
/// concurrent callers are serialized and cannot both pass a stale elapsed
/// check.
pub struct RequestPacer {
    min_interval: Duration,
    last_dispatch: Mutex<Option<Instant>>,
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: Mutex::new(None),
        }
    }

    /// Wait until at least `min_interval` has passed since the previous turn,
    /// then record "now" as the new dispatch time.
    ///
    /// The first turn returns immediately. The recorded time is always
    /// updated, even when no sleep was needed.
    pub async fn wait_turn(&self) {
        let mut last = self.last_dispatch.lock().await;
        if let Some(prev) = *last {
            let elapsed = prev.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// Check if an HTTP response is a 429 and extract Retry-After if present.
///
/// Returns `Err(LookupAttempt::RateLimited { .. })` on 429, `Ok(())` otherwise.
pub fn check_rate_limit_response(
    resp: &reqwest::Response,
) -> Result<(), crate::source::LookupAttempt> {
    if resp.status().as_u16() == 429 {
        let retry_after = resp
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(parse_retry_after);
        Err(crate::source::LookupAttempt::RateLimited { retry_after })
    } else {
        Ok(())
    }
}

/// Parse a Retry-After header value (seconds or HTTP-date).
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    // Try parsing as integer seconds first
    if let Ok(secs) = value.trim().parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    // HTTP-date form (e.g. "Wed, 21 Oct 2015 07:28:00 GMT"): conservative
    // fallback rather than a full date parser
    if value.contains(',') || value.contains("GMT") {
        return Some(Duration::from_secs(5));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(1100);

    #[test]
    fn parse_integer_seconds() {
        assert_eq!(parse_retry_after("7"), Some(Duration::from_secs(7)));
    }

    #[test]
    fn parse_http_date_gmt() {
        let val = "Wed, 21 Oct 2015 07:28:00 GMT";
        assert_eq!(parse_retry_after(val), Some(Duration::from_secs(5)));
    }

    #[test]
    fn parse_garbage_none() {
        assert_eq!(parse_retry_after("soon"), None);
    }

    #[test]
    fn ok_on_200() {
        let http_resp = http::Response::builder().status(200).body("").unwrap();
        let resp = reqwest::Response::from(http_resp);
        assert!(check_rate_limit_response(&resp).is_ok());
    }

    #[test]
    fn rate_limited_429_no_header() {
        let http_resp = http::Response::builder().status(429).body("").unwrap();
        let resp = reqwest::Response::from(http_resp);
        match check_rate_limit_response(&resp).unwrap_err() {
            crate::source::LookupAttempt::RateLimited { retry_after } => {
                assert!(retry_after.is_none())
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn rate_limited_429_with_retry_after() {
        let http_resp = http::Response::builder()
            .status(429)
            .header("retry-after", "10")
            .body("")
            .unwrap();
        let resp = reqwest::Response::from(http_resp);
        match check_rate_limit_response(&resp).unwrap_err() {
            crate::source::LookupAttempt::RateLimited { retry_after } => {
                assert_eq!(retry_after, Some(Duration::from_secs(10)));
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn first_turn_is_immediate() {
        let pacer = RequestPacer::new(INTERVAL);
        let start = Instant::now();
        pacer.wait_turn().await;
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_turn_waits_out_the_interval() {
        let pacer = RequestPacer::new(INTERVAL);
        let start = Instant::now();
        pacer.wait_turn().await;
        pacer.wait_turn().await;
        assert!(start.elapsed() >= INTERVAL);
    }

    #[tokio::test(start_paused = true)]
    async fn elapsed_time_is_credited() {
        let pacer = RequestPacer::new(INTERVAL);
        pacer.wait_turn().await;

        // Simulate 600ms of work between turns; only the remainder is slept.
        tokio::time::sleep(Duration::from_millis(600)).await;
        let before = Instant::now();
        pacer.wait_turn().await;
        assert_eq!(before.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn no_sleep_when_interval_already_passed() {
        let pacer = RequestPacer::new(INTERVAL);
        pacer.wait_turn().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        let before = Instant::now();
        pacer.wait_turn().await;
        assert_eq!(before.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_are_spaced() {
        use std::sync::Arc;

        let pacer = Arc::new(RequestPacer::new(INTERVAL));
        let start = Instant::now();

        let mut handles = Vec::new();
        for _ in 0..3 {
            let pacer = Arc::clone(&pacer);
            handles.push(tokio::spawn(async move {
                pacer.wait_turn().await;
                start.elapsed()
            }));
        }

        let mut stamps: Vec<Duration> = Vec::new();
        for h in handles {
            stamps.push(h.await.unwrap());
        }
        stamps.sort();

        for pair in stamps.windows(2) {
            assert!(
                pair[1] - pair[0] >= INTERVAL,
                "dispatch gap {:?} below minimum",
                pair[1] - pair[0]
            );
        }
    }
}
