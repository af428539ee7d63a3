//! Generation model interface

pub mod command;

use anyhow::Result;
use async_trait::async_trait;

pub use command::CommandModel;

/// A text generator
#[async_trait]
pub trait GenerationModel: Send + Sync {
    /// Produce a completion for `prompt` of at most `max_length` tokens
    async fn generate(&self, prompt: &str, max_length: usize) -> Result<String>;
}
