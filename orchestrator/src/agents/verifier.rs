// Verification Agent: cross-checks every claim in the draft answer against
// the retrieved context and returns the corrected final answer.

use std::sync::Arc;

use tracing::info;

use super::{prompts, Agent};
use crate::clients::GenerationClient;
use crate::error::{PipelineError, Stage};

pub struct VerificationAgent {
    agent: Agent,
}

impl VerificationAgent {
    pub fn new(generation: Arc<dyn GenerationClient>) -> Self {
        Self {
            agent: Agent::new(generation, Vec::new(), prompts::VERIFICATION_PROMPT),
        }
    }

    pub async fn run(
        &self,
        question: &str,
        context: &str,
        draft_answer: &str,
    ) -> Result<String, PipelineError> {
        info!("Verification: checking draft answer against context");
        let payload = format!(
            "Question: {question}\n\nContext:\n{context}\n\nDraft Answer:\n{draft_answer}\n\n\
             Please verify and correct the draft answer, removing any unsupported claims."
        );
        self.agent
            .invoke_text(&payload)
            .await
            .map_err(|source| PipelineError::UpstreamGeneration {
                stage: Stage::Verification,
                source,
            })
    }
}
