//! Short-lived caches for retrieval and generation results

use std::sync::Arc;

use codeassist_core::monitor::{CODE_GENERATION, SIMILARITY_SEARCH};
use codeassist_core::{AssistError, CacheConfig, CacheStats, PerformanceMonitor, Result, TtlCache};
use tracing::{debug, error};

use crate::components::{HandleId, ModelHandle, StoreHandle};
use crate::config::{GENERATION_LENGTH_FLOOR, GENERATION_LENGTH_MARGIN};
use crate::docs::Document;

/// Identifies one retrieval
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    pub store: HandleId,
    pub query: String,
    pub k: usize,
}

/// Identifies one generation; `max_length` is the caller's requested value
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GenerationKey {
    pub model: HandleId,
    pub prompt: String,
    pub max_length: usize,
}

/// Length actually passed to the model: `max(floor, words(prompt) + margin)`
///
/// The requested length does not take part; the computed value is authoritative.
pub fn effective_length(prompt: &str, floor: usize, margin: usize) -> usize {
    floor.max(prompt.split_whitespace().count() + margin)
}

pub struct QueryResultCache {
    cache: Arc<TtlCache<QueryKey, Arc<Vec<Document>>>>,
    monitor: Arc<PerformanceMonitor>,
}

impl QueryResultCache {
    pub fn new(monitor: Arc<PerformanceMonitor>, config: CacheConfig) -> Result<Self> {
        Ok(Self {
            cache: Arc::new(TtlCache::new("query_results", config)?),
            monitor,
        })
    }

    /// Up to `k` documents for `query`, from cache while the entry is valid
    pub async fn get(
        &self,
        store: &StoreHandle,
        query: &str,
        k: usize,
    ) -> Result<Arc<Vec<Document>>> {
        let key = QueryKey {
            store: store.id(),
            query: query.to_string(),
            k,
        };
        let store = store.clone();
        let monitor = Arc::clone(&self.monitor);
        let query = query.to_string();

        self.cache
            .get_or_try_insert_with(key, move || async move {
                let documents = monitor
                    .track(SIMILARITY_SEARCH, store.similarity_search(&query, k))
                    .await
                    .map_err(|e| {
                        error!("Error during similarity search: {:#}", e);
                        AssistError::RetrievalFailure(format!("{e:#}"))
                    })?;
                debug!(query = %query, k, found = documents.len(), "Retrieved documents");
                Ok(Arc::new(documents))
            })
            .await
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    /// Underlying cache, for maintenance tasks
    pub fn cache(&self) -> Arc<TtlCache<QueryKey, Arc<Vec<Document>>>> {
        Arc::clone(&self.cache)
    }
}

pub struct GenerationResultCache {
    cache: Arc<TtlCache<GenerationKey, String>>,
    monitor: Arc<PerformanceMonitor>,
    floor: usize,
    margin: usize,
}

impl GenerationResultCache {
    pub fn new(monitor: Arc<PerformanceMonitor>, config: CacheConfig) -> Result<Self> {
        Self::with_length_policy(
            monitor,
            config,
            GENERATION_LENGTH_FLOOR,
            GENERATION_LENGTH_MARGIN,
        )
    }

    pub fn with_length_policy(
        monitor: Arc<PerformanceMonitor>,
        config: CacheConfig,
        floor: usize,
        margin: usize,
    ) -> Result<Self> {
        Ok(Self {
            cache: Arc::new(TtlCache::new("generation_results", config)?),
            monitor,
            floor,
            margin,
        })
    }

    /// Generated text for `prompt`, from cache while the entry is valid
    pub async fn get(
        &self,
        model: &ModelHandle,
        prompt: &str,
        max_length: usize,
    ) -> Result<String> {
        let key = GenerationKey {
            model: model.id(),
            prompt: prompt.to_string(),
            max_length,
        };
        let length = effective_length(prompt, self.floor, self.margin);
        let model = model.clone();
        let monitor = Arc::clone(&self.monitor);
        let prompt = prompt.to_string();

        self.cache
            .get_or_try_insert_with(key, move || async move {
                debug!(requested = max_length, effective = length, "Generating");
                monitor
                    .track(CODE_GENERATION, model.generate(&prompt, length))
                    .await
                    .map_err(|e| {
                        error!("Error generating code: {:#}", e);
                        AssistError::GenerationFailure(format!("{e:#}"))
                    })
            })
            .await
    }

    pub async fn stats(&self) -> CacheStats {
        self.cache.stats().await
    }

    pub fn cache(&self) -> Arc<TtlCache<GenerationKey, String>> {
        Arc::clone(&self.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(n: usize) -> String {
        vec!["word"; n].join(" ")
    }

    #[test]
    fn test_effective_length_floor_applies() {
        assert_eq!(effective_length(&words(50), 500, 200), 500);
        assert_eq!(effective_length("", 500, 200), 500);
    }

    #[test]
    fn test_effective_length_grows_with_prompt() {
        assert_eq!(effective_length(&words(400), 500, 200), 600);
        assert_eq!(effective_length(&words(300), 500, 200), 500);
        assert_eq!(effective_length(&words(301), 500, 200), 501);
    }

    #[test]
    fn test_effective_length_counts_whitespace_tokens() {
        assert_eq!(effective_length("a\tb\n\nc   d", 0, 0), 4);
    }
}
