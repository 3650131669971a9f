//! Stage agents for the multi-agent QA pipeline.
//!
//! All four stages are built through the same `Agent` contract and differ
//! only by configuration: system prompt and offered tool set. Stage code
//! depends on `Agent` alone, never on which concrete stage it holds.

use std::sync::Arc;

use crate::clients::{GenerationClient, GenerationOutcome, ToolSpec};
use crate::error::GenerationError;

pub mod planner;
pub mod prompts;
pub mod retriever;
pub mod summarizer;
pub mod verifier;

pub struct Agent {
    generation: Arc<dyn GenerationClient>,
    tools: Vec<ToolSpec>,
    system_prompt: &'static str,
}

impl Agent {
    pub fn new(
        generation: Arc<dyn GenerationClient>,
        tools: Vec<ToolSpec>,
        system_prompt: &'static str,
    ) -> Self {
        Self {
            generation,
            tools,
            system_prompt,
        }
    }

    /// One generation call with this agent's configuration. The model may
    /// answer in text or elect one of the offered tools.
    pub async fn invoke(&self, input: &str) -> Result<GenerationOutcome, GenerationError> {
        self.generation
            .generate(self.system_prompt, input, &self.tools)
            .await
    }

    /// Like `invoke`, for agents that expect a plain text answer. A tool
    /// request from a tool-less agent is a malformed response.
    pub async fn invoke_text(&self, input: &str) -> Result<String, GenerationError> {
        match self.invoke(input).await? {
            GenerationOutcome::Text(text) => Ok(text),
            GenerationOutcome::ToolCall(_) => Err(GenerationError::UnexpectedToolRequest),
        }
    }
}
