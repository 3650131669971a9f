// Summarization Agent: drafts an answer grounded only in the retrieved
// context.

use std::sync::Arc;

use tracing::info;

use super::{prompts, Agent};
use crate::clients::GenerationClient;
use crate::error::{PipelineError, Stage};

pub struct SummarizationAgent {
    agent: Agent,
}

impl SummarizationAgent {
    pub fn new(generation: Arc<dyn GenerationClient>) -> Self {
        Self {
            agent: Agent::new(generation, Vec::new(), prompts::SUMMARIZATION_PROMPT),
        }
    }

    pub async fn run(&self, question: &str, context: &str) -> Result<String, PipelineError> {
        info!("Summarization: drafting answer");
        let payload = format!("Question: {question}\n\nContext:\n{context}");
        self.agent
            .invoke_text(&payload)
            .await
            .map_err(|source| PipelineError::UpstreamGeneration {
                stage: Stage::Summarization,
                source,
            })
    }
}
