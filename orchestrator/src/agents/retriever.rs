// Retrieval fan-out coordinator: one concurrent retrieval attempt per
// sub-question, joined before the pipeline continues.

use std::sync::Arc;

use futures::future;
use serde_json::json;
use tracing::info;

use super::{prompts, Agent};
use crate::clients::{GenerationClient, GenerationOutcome, SearchClient, ToolSpec};
use crate::error::{GenerationError, PipelineError, Stage};
use crate::models::Passage;
use crate::serialize::serialize_passages;

pub const SEARCH_TOOL_NAME: &str = "search_passages";

fn search_tool() -> ToolSpec {
    ToolSpec {
        name: SEARCH_TOOL_NAME,
        description: "Search the document index for passages relevant to a query",
        parameters: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "The search query"
                }
            },
            "required": ["query"]
        }),
    }
}

pub struct RetrievalCoordinator {
    agent: Agent,
    search: Arc<dyn SearchClient>,
    top_k: usize,
}

impl RetrievalCoordinator {
    pub fn new(
        generation: Arc<dyn GenerationClient>,
        search: Arc<dyn SearchClient>,
        top_k: usize,
    ) -> Self {
        Self {
            agent: Agent::new(generation, vec![search_tool()], prompts::RETRIEVAL_PROMPT),
            search,
            top_k,
        }
    }

    /// Fan out one retrieval attempt per sub-question, join all of them, and
    /// serialize the merged passages.
    ///
    /// Attempts run concurrently but results are collected in sub-question
    /// order, so the merged context is reproducible regardless of completion
    /// timing. The first failed attempt fails the whole stage and drops the
    /// attempts still in flight (fail-fast; no partial results are consumed).
    pub async fn run(&self, sub_questions: &[String]) -> Result<String, PipelineError> {
        info!("Retrieval: fanning out {} sub-questions", sub_questions.len());

        let attempts = sub_questions.iter().map(|q| self.retrieve_one(q));
        let per_question = future::try_join_all(attempts).await.map_err(|source| {
            PipelineError::RetrievalFanout {
                source: Box::new(source),
            }
        })?;

        // Flat merge in sub-question order, per-attempt ranking preserved.
        // Duplicates across sub-questions are acceptable and kept.
        let merged: Vec<Passage> = per_question.into_iter().flatten().collect();
        Ok(serialize_passages(&merged))
    }

    /// One attempt through the shared agent abstraction: the model may elect
    /// the search tool with its own query formulation, or answer in text, in
    /// which case we search the sub-question directly.
    async fn retrieve_one(&self, sub_question: &str) -> Result<Vec<Passage>, PipelineError> {
        let payload = format!("Retrieve context for: {sub_question}");
        let outcome = self.agent.invoke(&payload).await.map_err(|source| {
            PipelineError::UpstreamGeneration {
                stage: Stage::Retrieval,
                source,
            }
        })?;

        let query = match &outcome {
            GenerationOutcome::ToolCall(call) if call.name == SEARCH_TOOL_NAME => call
                .arguments
                .get("query")
                .and_then(serde_json::Value::as_str)
                .unwrap_or(sub_question),
            GenerationOutcome::ToolCall(call) => {
                return Err(PipelineError::UpstreamGeneration {
                    stage: Stage::Retrieval,
                    source: GenerationError::UnknownTool(call.name.clone()),
                });
            }
            GenerationOutcome::Text(_) => sub_question,
        };

        self.search
            .search(query, self.top_k)
            .await
            .map_err(|source| PipelineError::UpstreamSearch {
                stage: Stage::Retrieval,
                source,
            })
    }
}
