//! Counting collaborators shared by the integration tests

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use codeassist::components::ComponentFactory;
use codeassist::docs::{Document, DocumentStore};
use codeassist::model::GenerationModel;
use codeassist_core::{Accelerator, AssistError, MemoryInfo};

/// Document store returning `k` synthetic documents per query
pub struct MockStore {
    pub calls: Arc<AtomicUsize>,
    pub failing_queries: HashSet<String>,
}

impl MockStore {
    pub fn new(calls: Arc<AtomicUsize>) -> Self {
        Self {
            calls,
            failing_queries: HashSet::new(),
        }
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }
}

#[async_trait]
impl DocumentStore for MockStore {
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_queries.contains(query) {
            bail!("index unavailable for {query:?}");
        }
        Ok((0..k)
            .map(|i| {
                Document::new(format!("doc {i} about {query}")).with_source(format!("ref{i}.md"))
            })
            .collect())
    }
}

/// Model that records every call
#[derive(Default)]
pub struct MockModel {
    pub calls: AtomicUsize,
    pub fail: AtomicBool,
    pub lengths: Mutex<Vec<usize>>,
    pub prompts: Mutex<Vec<String>>,
}

impl MockModel {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_length(&self) -> Option<usize> {
        self.lengths.lock().unwrap().last().copied()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl GenerationModel for MockModel {
    async fn generate(&self, prompt: &str, max_length: usize) -> Result<String> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.lengths.lock().unwrap().push(max_length);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            bail!("model crashed");
        }
        Ok(format!("def solution():\n    # generation {n}\n    pass"))
    }
}

/// Factory counting how often each collaborator is built
pub struct MockFactory {
    pub store_builds: AtomicUsize,
    pub model_builds: AtomicUsize,
    pub search_calls: Arc<AtomicUsize>,
    pub fail_store: AtomicBool,
    pub build_delay: Duration,
    pub failing_queries: HashSet<String>,
    pub model: Arc<MockModel>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self {
            store_builds: AtomicUsize::new(0),
            model_builds: AtomicUsize::new(0),
            search_calls: Arc::new(AtomicUsize::new(0)),
            fail_store: AtomicBool::new(false),
            build_delay: Duration::ZERO,
            failing_queries: HashSet::new(),
            model: Arc::new(MockModel::default()),
        }
    }

    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = delay;
        self
    }

    pub fn failing_on(mut self, query: &str) -> Self {
        self.failing_queries.insert(query.to_string());
        self
    }

    pub fn store_builds(&self) -> usize {
        self.store_builds.load(Ordering::SeqCst)
    }

    pub fn model_builds(&self) -> usize {
        self.model_builds.load(Ordering::SeqCst)
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn set_store_failure(&self, fail: bool) {
        self.fail_store.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ComponentFactory for MockFactory {
    async fn build_store(&self) -> Result<Arc<dyn DocumentStore>> {
        self.store_builds.fetch_add(1, Ordering::SeqCst);
        if !self.build_delay.is_zero() {
            tokio::time::sleep(self.build_delay).await;
        }
        if self.fail_store.load(Ordering::SeqCst) {
            bail!("documentation directory missing");
        }

        let mut store = MockStore::new(Arc::clone(&self.search_calls));
        store.failing_queries = self.failing_queries.clone();
        Ok(Arc::new(store))
    }

    async fn build_model(&self) -> Result<Arc<dyn GenerationModel>> {
        self.model_builds.fetch_add(1, Ordering::SeqCst);
        let model: Arc<dyn GenerationModel> = self.model.clone();
        Ok(model)
    }
}

/// Accelerator that is always present and counts release requests
#[derive(Default)]
pub struct CountingAccelerator {
    pub releases: AtomicUsize,
}

impl CountingAccelerator {
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Accelerator for CountingAccelerator {
    fn backend(&self) -> &'static str {
        "counting"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn device_name(&self) -> codeassist_core::Result<String> {
        Ok("Test Device".to_string())
    }

    fn memory_info(&self) -> codeassist_core::Result<MemoryInfo> {
        Err(AssistError::ResourceQueryFailure("not supported".to_string()))
    }

    fn utilization(&self) -> codeassist_core::Result<f64> {
        Ok(12.0)
    }

    fn release_unused(&self) -> codeassist_core::Result<()> {
        self.releases.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn words(n: usize) -> String {
    vec!["word"; n].join(" ")
}
