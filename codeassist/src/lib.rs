pub mod api;
pub mod components;
pub mod config;
pub mod docs;
pub mod factory;
pub mod model;
pub mod orchestrator;
pub mod results;

pub use api::{ApiServer, ApiServerConfig};
pub use components::{
    ComponentCache, ComponentFactory, ComponentPair, Handle, HandleId, ModelHandle, StoreHandle,
};
pub use config::AssistantConfig;
pub use docs::{Document, DocumentStore, KeywordDocumentStore};
pub use factory::LocalFactory;
pub use model::{CommandModel, GenerationModel};
pub use orchestrator::{CodeAssistant, CodeRequest, CodeResponse, Language};
pub use results::{
    effective_length, GenerationKey, GenerationResultCache, QueryKey, QueryResultCache,
};
