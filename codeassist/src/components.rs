//! Process-wide slot holding the document store and generation model
//!
//! Building either handle is expensive (index load, model start-up), so the
//! pair is constructed once per `COMPONENT_TTL` and shared by every session.
//! Concurrent callers that find the slot empty or expired wait on a single
//! construction and all observe its outcome.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use codeassist_core::monitor::{INIT_COMPONENTS, REFRESH_DATABASE};
use codeassist_core::{
    AssistError, CacheConfig, CacheStats, PerformanceMonitor, ResourceManager, Result, TtlCache,
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::docs::DocumentStore;
use crate::model::GenerationModel;

/// Identity of a constructed handle, assigned once at construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandleId(Uuid);

impl HandleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for HandleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared collaborator plus the identity it was built under
pub struct Handle<T: ?Sized> {
    id: HandleId,
    inner: Arc<T>,
}

impl<T: ?Sized> Handle<T> {
    pub fn new(inner: Arc<T>) -> Self {
        Self {
            id: HandleId::new(),
            inner,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle").field("id", &self.id).finish()
    }
}

pub type StoreHandle = Handle<dyn DocumentStore>;
pub type ModelHandle = Handle<dyn GenerationModel>;

/// The store/model pair handed out by [`ComponentCache`]
#[derive(Debug, Clone)]
pub struct ComponentPair {
    pub store: StoreHandle,
    pub model: ModelHandle,
}

impl ComponentPair {
    pub fn store_id(&self) -> HandleId {
        self.store.id()
    }

    pub fn model_id(&self) -> HandleId {
        self.model.id()
    }
}

/// Builds the collaborators behind the component slot
#[async_trait]
pub trait ComponentFactory: Send + Sync {
    async fn build_store(&self) -> anyhow::Result<Arc<dyn DocumentStore>>;

    async fn build_model(&self) -> anyhow::Result<Arc<dyn GenerationModel>>;

    /// Rebuild the store from current document content
    async fn rebuild_store(&self) -> anyhow::Result<Arc<dyn DocumentStore>> {
        self.build_store().await
    }
}

/// Singleton cache for the store/model pair
pub struct ComponentCache {
    slot: TtlCache<(), ComponentPair>,
    factory: Arc<dyn ComponentFactory>,
    resources: ResourceManager,
    monitor: Arc<PerformanceMonitor>,
    /// Serializes refreshes; never held across `get`'s construction path
    refresh_lock: Mutex<()>,
}

impl ComponentCache {
    pub fn new(
        factory: Arc<dyn ComponentFactory>,
        resources: ResourceManager,
        monitor: Arc<PerformanceMonitor>,
        config: CacheConfig,
    ) -> Result<Self> {
        Ok(Self {
            slot: TtlCache::new("components", config)?,
            factory,
            resources,
            monitor,
            refresh_lock: Mutex::new(()),
        })
    }

    /// Current pair, constructing it if the slot is empty or expired
    pub async fn get(&self) -> Result<ComponentPair> {
        let factory = Arc::clone(&self.factory);
        let resources = self.resources.clone();
        let monitor = Arc::clone(&self.monitor);

        self.slot
            .get_or_try_insert_with((), move || async move {
                resources.release_unused();
                monitor.track(INIT_COMPONENTS, construct(factory.as_ref())).await
            })
            .await
    }

    /// Rebuild the store now, whatever the slot's age, keeping the model
    ///
    /// An empty or expired slot is first filled through [`get`](Self::get),
    /// so the model comes from that construction. On failure the previous
    /// pair stays installed.
    pub async fn force_refresh(&self) -> Result<ComponentPair> {
        let _guard = self.refresh_lock.lock().await;

        let current = self.get().await?;
        self.resources.release_unused();

        let store = self
            .monitor
            .track(REFRESH_DATABASE, self.factory.rebuild_store())
            .await
            .map_err(|e| construction_failure("document store", e))?;

        let pair = ComponentPair {
            store: Handle::new(store),
            model: current.model,
        };
        if let Some(event) = self.slot.refresh((), pair.clone()).await {
            debug!(reason = %event.reason, "Replaced component pair");
        }

        info!(
            store_id = %pair.store_id(),
            model_id = %pair.model_id(),
            "Document store refreshed"
        );
        Ok(pair)
    }

    /// Whether a valid pair is installed
    pub async fn is_initialized(&self) -> bool {
        self.slot.contains_key(&()).await
    }

    pub async fn stats(&self) -> CacheStats {
        self.slot.stats().await
    }
}

async fn construct(factory: &dyn ComponentFactory) -> Result<ComponentPair> {
    let store = factory
        .build_store()
        .await
        .map_err(|e| construction_failure("document store", e))?;
    let model = factory
        .build_model()
        .await
        .map_err(|e| construction_failure("generation model", e))?;

    let pair = ComponentPair {
        store: Handle::new(store),
        model: Handle::new(model),
    };
    info!(
        store_id = %pair.store_id(),
        model_id = %pair.model_id(),
        "Components initialized"
    );
    Ok(pair)
}

fn construction_failure(what: &str, e: anyhow::Error) -> AssistError {
    error!("Error initializing {}: {:#}", what, e);
    AssistError::ConstructionFailure(format!("{what}: {e:#}"))
}
