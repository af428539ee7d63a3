//! Builds the document store and model from local paths and a command line

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tracing::info;

use crate::components::ComponentFactory;
use crate::docs::{DocumentStore, KeywordDocumentStore};
use crate::model::{CommandModel, GenerationModel};

#[derive(Debug, Clone)]
pub struct LocalFactory {
    docs_dir: PathBuf,
    index_dir: PathBuf,
    model: CommandModel,
}

impl LocalFactory {
    pub fn new(
        docs_dir: impl Into<PathBuf>,
        index_dir: impl Into<PathBuf>,
        model: CommandModel,
    ) -> Self {
        Self {
            docs_dir: docs_dir.into(),
            index_dir: index_dir.into(),
            model,
        }
    }

    pub fn docs_dir(&self) -> &Path {
        &self.docs_dir
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }
}

#[async_trait]
impl ComponentFactory for LocalFactory {
    async fn build_store(&self) -> Result<Arc<dyn DocumentStore>> {
        let docs_dir = self.docs_dir.clone();
        let index_dir = self.index_dir.clone();

        let store = tokio::task::spawn_blocking(move || {
            KeywordDocumentStore::create_or_load(&docs_dir, &index_dir)
        })
        .await
        .context("Index loading task panicked")??;
        Ok(Arc::new(store))
    }

    async fn build_model(&self) -> Result<Arc<dyn GenerationModel>> {
        info!("Using model command {}", self.model.program());
        Ok(Arc::new(self.model.clone()))
    }

    async fn rebuild_store(&self) -> Result<Arc<dyn DocumentStore>> {
        let docs_dir = self.docs_dir.clone();
        let index_dir = self.index_dir.clone();

        let store = tokio::task::spawn_blocking(move || {
            KeywordDocumentStore::rebuild(&docs_dir, &index_dir)
        })
        .await
        .context("Index rebuild task panicked")??;
        Ok(Arc::new(store))
    }
}
