//! Document store interface and the reference-documentation index

pub mod keyword;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use keyword::KeywordDocumentStore;

/// A retrieved piece of reference documentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    /// Text handed to the prompt
    pub content: String,
    /// Where the text came from, if known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Similarity search over a document collection
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Return up to `k` documents, best match first
    async fn similarity_search(&self, query: &str, k: usize) -> Result<Vec<Document>>;
}
