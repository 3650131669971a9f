// Planning Agent: analyzes the question and decomposes it into focused
// sub-questions for retrieval.

use std::sync::Arc;

use tracing::info;

use super::{prompts, Agent};
use crate::clients::GenerationClient;
use crate::error::{PipelineError, Stage};
use crate::state::PlanUpdate;

pub struct PlanningAgent {
    agent: Agent,
}

impl PlanningAgent {
    pub fn new(generation: Arc<dyn GenerationClient>) -> Self {
        Self {
            agent: Agent::new(generation, Vec::new(), prompts::PLANNING_PROMPT),
        }
    }

    pub async fn run(&self, question: &str) -> Result<PlanUpdate, PipelineError> {
        info!("Planning: decomposing question");
        let response = self
            .agent
            .invoke_text(question)
            .await
            .map_err(|source| PipelineError::UpstreamGeneration {
                stage: Stage::Planning,
                source,
            })?;
        Ok(parse_plan(question, &response))
    }
}

/// Parse the `Plan:` / `Sub-questions:` labeled sections out of the model's
/// response. Format drift never fails the stage: absent labels leave the raw
/// response as the plan, and an unparseable sub-question list falls back to
/// the original question verbatim.
fn parse_plan(question: &str, response: &str) -> PlanUpdate {
    let plan = match response.split_once("Plan:") {
        Some((_, rest)) => rest
            .split("Sub-questions:")
            .next()
            .unwrap_or_default()
            .trim()
            .to_string(),
        None => response.trim().to_string(),
    };

    let mut sub_questions: Vec<String> = match response.split_once("Sub-questions:") {
        Some((_, rest)) => rest
            .lines()
            .map(|line| line.trim_matches(|c| c == '-' || c == ' ').trim().to_string())
            .filter(|q| !q.is_empty())
            .collect(),
        None => Vec::new(),
    };

    if sub_questions.is_empty() {
        sub_questions = vec![question.to_string()];
    }

    PlanUpdate {
        plan,
        sub_questions,
    }
}
