//! Etymology lookups behind a persistent cache.
//!
//! [`Gateway::lookup`] serves a word from its [`CacheStore`] and only asks
//! the [`EtymologyProvider`] on a miss. Cached records never expire; the
//! only way out of the cache is an explicit removal.

pub mod cache;
pub mod gemini;
pub mod service;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::{BoundedCache, CacheError, CacheStore, JsonFileCache, MemoryCache, cache_key};
pub use gemini::GeminiProvider;
pub use service::{AnalysisReply, AnalysisService, ChannelError, PendingAnalysis};

/// Structured breakdown of one word.
///
/// Each part field holds the provider's free text, for example
/// `"un- (not)"` or `"none"`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtymologyRecord {
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub root: String,
    #[serde(default)]
    pub suffix: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation: Option<String>,
}

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("API error: {message}")]
    Provider { message: String },

    #[error("No content in response")]
    EmptyResponse,

    #[error("Failed to parse etymology: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error(transparent)]
    Cache(#[from] CacheError),
}

/// Source of etymology records on a cache miss.
pub trait EtymologyProvider {
    fn fetch(&self, word: &str) -> Result<EtymologyRecord, AnalysisError>;
}

impl<P: EtymologyProvider + ?Sized> EtymologyProvider for Box<P> {
    fn fetch(&self, word: &str) -> Result<EtymologyRecord, AnalysisError> {
        (**self).fetch(word)
    }
}

/// Cache-first lookup.
pub struct Gateway<C, P> {
    cache: C,
    provider: P,
}

impl<C: CacheStore, P: EtymologyProvider> Gateway<C, P> {
    pub fn new(cache: C, provider: P) -> Self {
        Self { cache, provider }
    }

    /// The record for `word`, case-insensitively.
    ///
    /// A hit never reaches the provider. A miss makes exactly one provider
    /// call and stores the result; a failed store is logged and the record
    /// is still returned.
    pub fn lookup(&mut self, word: &str) -> Result<EtymologyRecord, AnalysisError> {
        let key = cache_key(word);
        if let Some(record) = self.cache.get(&key) {
            debug!("[cache hit] {key}");
            return Ok(record);
        }

        debug!("[api request] {}", word.trim());
        let record = self.provider.fetch(word.trim())?;
        if let Err(e) = self.cache.put(&key, record.clone()) {
            warn!("Failed to cache etymology for '{}': {e}", word.trim());
        }
        Ok(record)
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut C {
        &mut self.cache
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;

    struct CountingProvider {
        calls: Cell<usize>,
        fail: bool,
    }

    impl EtymologyProvider for CountingProvider {
        fn fetch(&self, word: &str) -> Result<EtymologyRecord, AnalysisError> {
            self.calls.set(self.calls.get() + 1);
            if self.fail {
                return Err(AnalysisError::Provider {
                    message: "quota exceeded".to_string(),
                });
            }
            Ok(EtymologyRecord {
                root: word.to_lowercase(),
                ..EtymologyRecord::default()
            })
        }
    }

    fn provider(fail: bool) -> CountingProvider {
        CountingProvider {
            calls: Cell::new(0),
            fail,
        }
    }

    #[test]
    fn case_insensitive_hit_skips_provider() {
        let mut gateway = Gateway::new(MemoryCache::new(), provider(false));
        let first = gateway.lookup("Run").unwrap();
        let second = gateway.lookup("run").unwrap();
        assert_eq!(first, second);
        assert_eq!(gateway.provider().calls.get(), 1);
        assert_eq!(gateway.cache().len(), 1);
    }

    #[test]
    fn errors_are_not_cached() {
        let mut gateway = Gateway::new(MemoryCache::new(), provider(true));
        let err = gateway.lookup("run").unwrap_err();
        assert_eq!(err.to_string(), "API error: quota exceeded");
        assert!(gateway.lookup("run").is_err());
        assert_eq!(gateway.provider().calls.get(), 2);
        assert!(gateway.cache().is_empty());
    }

    #[test]
    fn record_tolerates_missing_fields() {
        let record: EtymologyRecord =
            serde_json::from_str(r#"{"root": "bene (well)", "desc": "kind"}"#).unwrap();
        assert_eq!(record.root, "bene (well)");
        assert_eq!(record.prefix, "");
        assert_eq!(record.translation, None);
    }
}
