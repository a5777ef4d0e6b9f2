//! Mock citation source for testing.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use super::{CitationSource, LookupAttempt};
use crate::Identifier;

/// A scripted [`CitationSource`] for tests.
///
/// Responses are configured per identifier kind (`"doi"`, `"arxiv"`,
/// `"title"`). Each configured kind holds a sequence: one response is popped
/// per call, and the last one repeats once the sequence is exhausted.
/// Unconfigured kinds answer [`LookupAttempt::Miss`]. Calls are counted per
/// kind.
pub struct MockSource {
    responses: Mutex<HashMap<&'static str, Vec<LookupAttempt>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
    delay: Option<Duration>,
}

impl Default for MockSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSource {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    pub fn on_doi(self, response: LookupAttempt) -> Self {
        self.script("doi", vec![response])
    }

    pub fn on_arxiv(self, response: LookupAttempt) -> Self {
        self.script("arxiv", vec![response])
    }

    pub fn on_title(self, response: LookupAttempt) -> Self {
        self.script("title", vec![response])
    }

    /// Script a sequence of responses for one identifier kind; the last
    /// response repeats when the sequence runs out.
    pub fn script(self, kind: &'static str, mut responses: Vec<LookupAttempt>) -> Self {
        assert!(!responses.is_empty(), "sequence must have at least one response");
        // Reverse so we can pop() from the front cheaply.
        responses.reverse();
        self.responses.lock().unwrap().insert(kind, responses);
        self
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many lookups were made for the given identifier kind.
    pub fn calls(&self, kind: &str) -> usize {
        self.calls.lock().unwrap().get(kind).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }

    fn next_response(&self, kind: &'static str) -> LookupAttempt {
        let mut responses = self.responses.lock().unwrap();
        match responses.get_mut(kind) {
            Some(seq) if seq.len() > 1 => seq.pop().unwrap(),
            Some(seq) => seq.last().cloned().unwrap(),
            None => LookupAttempt::Miss,
        }
    }
}

impl CitationSource for MockSource {
    fn name(&self) -> &str {
        "Mock"
    }

    fn lookup<'a>(
        &'a self,
        id: &'a Identifier,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupAttempt> + Send + 'a>> {
        let kind = match id {
            Identifier::Doi(_) => "doi",
            Identifier::Arxiv(_) => "arxiv",
            Identifier::Title(_) => "title",
        };
        *self.calls.lock().unwrap().entry(kind).or_insert(0) += 1;
        let response = self.next_response(kind);
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }
            response
        })
    }
}
