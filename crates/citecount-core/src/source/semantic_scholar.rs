//! Semantic Scholar Graph API backend.
//!
//! One GET per lookup attempt: `DOI:` and `ARXIV:` ids hit the paper
//! endpoint directly, titles go through `search?limit=1`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{CitationRecord, CitationSource, LookupAttempt};
use crate::Identifier;
use crate::rate_limit::check_rate_limit_response;

pub struct SemanticScholar {
    pub api_key: Option<String>,
    pub base_url: String,
}

impl SemanticScholar {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key,
            base_url: crate::DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn from_config(config: &crate::Config) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
        }
    }

    fn request_url(&self, id: &Identifier) -> String {
        match id {
            Identifier::Doi(doi) => format!(
                "{}DOI:{}?fields=citationCount,title",
                self.base_url,
                urlencoding::encode(doi)
            ),
            Identifier::Arxiv(arxiv_id) => format!(
                "{}ARXIV:{}?fields=citationCount,title",
                self.base_url,
                urlencoding::encode(arxiv_id)
            ),
            Identifier::Title(title) => format!(
                "{}search?query={}&limit=1&fields=citationCount,title,paperId",
                self.base_url,
                urlencoding::encode(title)
            ),
        }
    }

    /// Pick the citation count out of a 200 payload.
    ///
    /// Search responses are unwrapped to `data[0]` first; an empty `data`
    /// array or an absent `citationCount` is a miss, not an error.
    fn extract_record(id: &Identifier, payload: &serde_json::Value) -> LookupAttempt {
        let paper = match id {
            Identifier::Title(_) => match payload["data"].as_array().and_then(|d| d.first()) {
                Some(first) => first,
                None => return LookupAttempt::Miss,
            },
            _ => payload,
        };

        match paper["citationCount"].as_u64() {
            Some(citation_count) => LookupAttempt::Found(CitationRecord {
                citation_count,
                title: paper["title"].as_str().map(String::from),
            }),
            None => LookupAttempt::Miss,
        }
    }
}

impl CitationSource for SemanticScholar {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn lookup<'a>(
        &'a self,
        id: &'a Identifier,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupAttempt> + Send + 'a>> {
        Box::pin(async move {
            let url = self.request_url(id);

            let mut req = client
                .get(&url)
                .header("Accept", "application/json")
                .timeout(timeout);
            if let Some(ref key) = self.api_key {
                req = req.header("x-api-key", key);
            }

            let resp = match req.send().await {
                Ok(resp) => resp,
                Err(e) => return LookupAttempt::TransportError(e.to_string()),
            };

            if let Err(limited) = check_rate_limit_response(&resp) {
                return limited;
            }
            let status = resp.status();
            if !status.is_success() {
                tracing::debug!(kind = id.kind(), status = %status, "api returned non-success");
                return LookupAttempt::Miss;
            }

            match resp.json::<serde_json::Value>().await {
                Ok(payload) => Self::extract_record(id, &payload),
                Err(e) => LookupAttempt::TransportError(e.to_string()),
            }
        })
    }
}
