//! Best-effort plot enrichment for matching records
//!
//! Lookups are synchronous and gated by a shared [`Budget`]. A failed lookup
//! degrades to empty text for that record; it never stops the pipeline.

use anyhow::{anyhow, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::stats::{stats_add_lookup, stats_add_lookup_failure, stats_add_text_filtered};

pub const DEFAULT_API_URL: &str = "http://www.omdbapi.com/";
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);

/// Shared cap on the number of lookups.
///
/// A limit of zero disables enrichment entirely.
#[derive(Debug)]
pub struct Budget {
    limit: u64,
    remaining: Mutex<u64>,
}

impl Budget {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            remaining: Mutex::new(limit),
        }
    }

    /// Take one request from the budget. Returns `false` once exhausted.
    pub fn try_acquire(&self) -> bool {
        let mut remaining = self
            .remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *remaining == 0 {
            return false;
        }
        *remaining -= 1;
        true
    }

    pub fn remaining(&self) -> u64 {
        *self
            .remaining
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn limit(&self) -> u64 {
        self.limit
    }

    pub fn is_enabled(&self) -> bool {
        self.limit > 0
    }
}

/// External text lookup keyed by title id
pub trait Lookup: Send + Sync {
    fn plot(&self, id: &str) -> Result<String>;
}

#[derive(Debug, Deserialize)]
struct OmdbResponse {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Error")]
    error: Option<String>,
}

/// Decode an OMDb reply into its plot text.
///
/// `"N/A"` plots come back as empty text; `"Response": "False"` is an error.
pub fn parse_omdb_response(body: &str) -> Result<String> {
    let reply: OmdbResponse =
        serde_json::from_str(body).context("failed to decode lookup response")?;

    if reply.response.as_deref() == Some("False") {
        return Err(anyhow!(
            "lookup service refused: {}",
            reply.error.as_deref().unwrap_or("no reason given")
        ));
    }

    Ok(match reply.plot {
        Some(plot) if plot != "N/A" => plot,
        _ => String::new(),
    })
}

/// Blocking client for the OMDb API
pub struct OmdbClient {
    agent: ureq::Agent,
    base_url: String,
    api_key: Option<String>,
}

impl OmdbClient {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into(),
            api_key,
        }
    }
}

impl Lookup for OmdbClient {
    fn plot(&self, id: &str) -> Result<String> {
        let mut request = self.agent.get(&self.base_url).query("i", id);
        if let Some(key) = &self.api_key {
            request = request.query("apikey", key);
        }

        let body = request
            .call()
            .with_context(|| format!("lookup request for {} failed", id))?
            .into_body()
            .read_to_string()
            .with_context(|| format!("failed reading lookup response for {}", id))?;

        parse_omdb_response(&body)
    }
}

impl std::fmt::Debug for OmdbClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OmdbClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// What happens to a record that passed the column filters
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Enrichment {
    Keep(String),
    Drop,
}

pub struct Enricher {
    budget: Budget,
    lookup: Option<Arc<dyn Lookup>>,
    text_filter: Option<Regex>,
}

impl Enricher {
    pub fn new(budget: Budget, lookup: Option<Arc<dyn Lookup>>, text_filter: Option<Regex>) -> Self {
        Self {
            budget,
            lookup,
            text_filter,
        }
    }

    /// No lookups and no text filter
    pub fn disabled() -> Self {
        Self::new(Budget::new(0), None, None)
    }

    pub fn budget(&self) -> &Budget {
        &self.budget
    }

    /// Fetch text for `id` when budget allows, then apply the text filter.
    ///
    /// The filter also runs against empty text, so with enrichment disabled
    /// only patterns that match the empty string let records through.
    pub fn enrich(&self, id: &str) -> Enrichment {
        let text = self.fetch(id);
        match &self.text_filter {
            Some(pattern) if !pattern.is_match(&text) => {
                stats_add_text_filtered();
                Enrichment::Drop
            }
            _ => Enrichment::Keep(text),
        }
    }

    fn fetch(&self, id: &str) -> String {
        let Some(lookup) = &self.lookup else {
            return String::new();
        };
        if !self.budget.try_acquire() {
            return String::new();
        }

        stats_add_lookup();
        match lookup.plot(id) {
            Ok(text) => text,
            Err(e) => {
                stats_add_lookup_failure();
                tracing::warn!(id, error = %format!("{:#}", e), "plot lookup failed");
                String::new()
            }
        }
    }
}

impl std::fmt::Debug for Enricher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Enricher")
            .field("budget", &self.budget)
            .field("lookup", &self.lookup.is_some())
            .field("text_filter", &self.text_filter.as_ref().map(|r| r.as_str()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    struct CountingLookup {
        calls: AtomicUsize,
    }

    impl Lookup for CountingLookup {
        fn plot(&self, id: &str) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("plot of {}", id))
        }
    }

    struct FailingLookup;

    impl Lookup for FailingLookup {
        fn plot(&self, _id: &str) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    #[test]
    fn test_budget_counts_down_to_zero() {
        let budget = Budget::new(2);
        assert!(budget.try_acquire());
        assert!(budget.try_acquire());
        assert!(!budget.try_acquire());
        assert_eq!(budget.remaining(), 0);
        assert_eq!(budget.limit(), 2);
    }

    #[test]
    fn test_zero_budget_is_disabled() {
        let budget = Budget::new(0);
        assert!(!budget.is_enabled());
        assert!(!budget.try_acquire());
    }

    #[test]
    fn test_budget_bound_under_contention() {
        let lookup = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
        });
        let enricher = Arc::new(Enricher::new(
            Budget::new(25),
            Some(lookup.clone() as Arc<dyn Lookup>),
            None,
        ));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let enricher = Arc::clone(&enricher);
                thread::spawn(move || {
                    for i in 0..20 {
                        enricher.enrich(&format!("tt{}{}", t, i));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(lookup.calls.load(Ordering::SeqCst), 25);
        assert_eq!(enricher.budget().remaining(), 0);
    }

    #[test]
    fn test_enrich_returns_lookup_text() {
        let lookup: Arc<dyn Lookup> = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
        });
        let enricher = Enricher::new(Budget::new(1), Some(lookup), None);
        assert_eq!(enricher.enrich("tt1"), Enrichment::Keep("plot of tt1".into()));
        assert_eq!(enricher.enrich("tt2"), Enrichment::Keep(String::new()));
    }

    #[test]
    fn test_lookup_failure_degrades_to_empty_text() {
        let enricher = Enricher::new(Budget::new(3), Some(Arc::new(FailingLookup)), None);
        assert_eq!(enricher.enrich("tt1"), Enrichment::Keep(String::new()));
        // A failed attempt still spends budget
        assert_eq!(enricher.budget().remaining(), 2);
    }

    #[test]
    fn test_text_filter_drops_non_matching() {
        let lookup: Arc<dyn Lookup> = Arc::new(CountingLookup {
            calls: AtomicUsize::new(0),
        });
        let enricher = Enricher::new(
            Budget::new(10),
            Some(lookup),
            Some(Regex::new("tt1$").unwrap()),
        );
        assert_eq!(enricher.enrich("tt1"), Enrichment::Keep("plot of tt1".into()));
        assert_eq!(enricher.enrich("tt2"), Enrichment::Drop);
    }

    #[test]
    fn test_text_filter_applies_to_empty_text_when_disabled() {
        let strict = Enricher::new(Budget::new(0), None, Some(Regex::new("murder").unwrap()));
        assert_eq!(strict.enrich("tt1"), Enrichment::Drop);

        let permissive = Enricher::new(Budget::new(0), None, Some(Regex::new("^$").unwrap()));
        assert_eq!(permissive.enrich("tt1"), Enrichment::Keep(String::new()));
    }

    #[test]
    fn test_parse_omdb_plot() {
        let text = parse_omdb_response(r#"{"Title":"A","Plot":"A short plot.","Response":"True"}"#)
            .unwrap();
        assert_eq!(text, "A short plot.");
    }

    #[test]
    fn test_parse_omdb_not_available_plot() {
        let text = parse_omdb_response(r#"{"Plot":"N/A","Response":"True"}"#).unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_parse_omdb_error_reply() {
        let err = parse_omdb_response(r#"{"Response":"False","Error":"Invalid API key!"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("Invalid API key!"));
    }

    #[test]
    fn test_parse_omdb_garbage() {
        assert!(parse_omdb_response("<html>").is_err());
    }

    #[test]
    fn test_client_debug_redacts_key() {
        let client = OmdbClient::new(DEFAULT_API_URL, Some("secret".into()), DEFAULT_LOOKUP_TIMEOUT);
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_client_transport_error_is_reported() {
        // Port 9 on localhost is the discard service and normally closed
        let client = OmdbClient::new("http://127.0.0.1:9/", None, Duration::from_millis(500));
        assert!(client.plot("tt1").is_err());
    }
}
