//! External service clients.
//!
//! The pipeline only ever talks to the outside world through these two
//! traits. Production implementations live in the submodules; tests swap in
//! scripted mocks.

use async_trait::async_trait;

use crate::error::{GenerationError, SearchError};
use crate::models::Passage;

pub mod generation;
pub mod search;

/// A named capability an agent may offer the model, in OpenAI function-tool
/// shape. The set is fixed at agent construction.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub parameters: serde_json::Value,
}

/// A tool invocation the model elected instead of answering in text.
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug)]
pub enum GenerationOutcome {
    Text(String),
    ToolCall(ToolInvocation),
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// One generation call: system instruction plus user payload, with an
    /// optional fixed tool set the model may choose to invoke. Configured
    /// for zero sampling temperature (best-effort determinism only, the
    /// service itself is a black box).
    async fn generate(
        &self,
        system_prompt: &str,
        input: &str,
        tools: &[ToolSpec],
    ) -> Result<GenerationOutcome, GenerationError>;
}

#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Top-k similarity search against the document index. Results come back
    /// in the service's ranking order.
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Passage>, SearchError>;
}
