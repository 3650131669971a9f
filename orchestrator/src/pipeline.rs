//! The pipeline orchestrator.
//!
//! A fixed, strictly linear state machine: Planning -> Retrieval ->
//! Summarization -> Verification. Each stage's output is fully merged into
//! the per-request `PipelineState` before the next stage starts, and the
//! first failure aborts the run without invoking later stages. The compiled
//! pipeline (the four configured agents) is built once at startup and shared
//! read-only across concurrent requests.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::agents::planner::PlanningAgent;
use crate::agents::retriever::RetrievalCoordinator;
use crate::agents::summarizer::SummarizationAgent;
use crate::agents::verifier::VerificationAgent;
use crate::clients::{GenerationClient, SearchClient};
use crate::error::PipelineError;
use crate::state::PipelineState;

/// Successful pipeline outcome: the verified answer plus the serialized
/// context it was grounded in.
#[derive(Debug)]
pub struct QaOutcome {
    pub answer: String,
    pub context: String,
}

pub struct Orchestrator {
    planner: PlanningAgent,
    retriever: RetrievalCoordinator,
    summarizer: SummarizationAgent,
    verifier: VerificationAgent,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        generation: Arc<dyn GenerationClient>,
        search: Arc<dyn SearchClient>,
        top_k: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            planner: PlanningAgent::new(generation.clone()),
            retriever: RetrievalCoordinator::new(generation.clone(), search, top_k),
            summarizer: SummarizationAgent::new(generation.clone()),
            verifier: VerificationAgent::new(generation),
            timeout,
        }
    }

    /// Run one question through the full pipeline.
    ///
    /// Blank questions are rejected before any stage executes. The whole run
    /// is bounded by the configured deadline; on expiry all in-flight stage
    /// futures (including retrieval fan-out tasks) are dropped and the caller
    /// gets `PipelineError::Cancelled`, never partial state.
    pub async fn run(&self, question: &str) -> Result<QaOutcome, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::Validation);
        }

        match tokio::time::timeout(self.timeout, self.run_stages(question)).await {
            Ok(result) => result,
            Err(_) => Err(PipelineError::Cancelled),
        }
    }

    async fn run_stages(&self, question: &str) -> Result<QaOutcome, PipelineError> {
        let mut state = PipelineState::new(question);

        let plan = self.planner.run(&state.question).await?;
        state.apply_plan(plan);
        debug!(
            "Planned {} sub-questions: {}",
            state.sub_questions().len(),
            state.plan().unwrap_or_default()
        );

        let context = self.retriever.run(state.sub_questions()).await?;
        state.apply_context(context);

        let draft = self.summarizer.run(&state.question, state.context()).await?;
        state.apply_draft(draft);

        let answer = self
            .verifier
            .run(&state.question, state.context(), state.draft_answer())
            .await?;
        state.apply_answer(answer);

        info!("Pipeline completed");
        let (answer, context) = state.into_parts();
        Ok(QaOutcome { answer, context })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use crate::agents::prompts;
    use crate::agents::retriever::SEARCH_TOOL_NAME;
    use crate::clients::{GenerationOutcome, ToolInvocation, ToolSpec};
    use crate::error::{GenerationError, SearchError, Stage};
    use crate::models::Passage;

    #[derive(Default)]
    struct StageCalls {
        planning: AtomicUsize,
        retrieval: AtomicUsize,
        summarization: AtomicUsize,
        verification: AtomicUsize,
    }

    /// Generation mock keyed on the stage prompts. Planning replies with a
    /// scripted response; retrieval either elects the search tool or answers
    /// in text (forcing the direct-search path); summarization echoes the
    /// context portion of its payload; verification echoes the draft answer
    /// unchanged.
    struct ScriptedGeneration {
        planning_response: String,
        retrieval_tool_query: Option<String>,
        calls: StageCalls,
    }

    impl ScriptedGeneration {
        fn new(planning_response: &str) -> Self {
            Self {
                planning_response: planning_response.to_string(),
                retrieval_tool_query: None,
                calls: StageCalls::default(),
            }
        }
    }

    #[async_trait]
    impl GenerationClient for ScriptedGeneration {
        async fn generate(
            &self,
            system_prompt: &str,
            input: &str,
            _tools: &[ToolSpec],
        ) -> Result<GenerationOutcome, GenerationError> {
            if system_prompt == prompts::PLANNING_PROMPT {
                self.calls.planning.fetch_add(1, Ordering::SeqCst);
                Ok(GenerationOutcome::Text(self.planning_response.clone()))
            } else if system_prompt == prompts::RETRIEVAL_PROMPT {
                self.calls.retrieval.fetch_add(1, Ordering::SeqCst);
                match &self.retrieval_tool_query {
                    Some(query) => Ok(GenerationOutcome::ToolCall(ToolInvocation {
                        name: SEARCH_TOOL_NAME.to_string(),
                        arguments: serde_json::json!({ "query": query }),
                    })),
                    None => Ok(GenerationOutcome::Text("ready to search".to_string())),
                }
            } else if system_prompt == prompts::SUMMARIZATION_PROMPT {
                self.calls.summarization.fetch_add(1, Ordering::SeqCst);
                let context = input.split("Context:\n").nth(1).unwrap_or_default();
                Ok(GenerationOutcome::Text(context.to_string()))
            } else if system_prompt == prompts::VERIFICATION_PROMPT {
                self.calls.verification.fetch_add(1, Ordering::SeqCst);
                let draft = input
                    .split("Draft Answer:\n")
                    .nth(1)
                    .unwrap_or_default()
                    .split("\n\nPlease verify")
                    .next()
                    .unwrap_or_default();
                Ok(GenerationOutcome::Text(draft.to_string()))
            } else {
                panic!("unexpected system prompt");
            }
        }
    }

    struct ScriptedSearch {
        results: HashMap<String, Vec<Passage>>,
        delays_ms: HashMap<String, u64>,
        failing: HashSet<String>,
        calls: AtomicUsize,
        queries_seen: Mutex<Vec<String>>,
    }

    impl ScriptedSearch {
        fn new() -> Self {
            Self {
                results: HashMap::new(),
                delays_ms: HashMap::new(),
                failing: HashSet::new(),
                calls: AtomicUsize::new(0),
                queries_seen: Mutex::new(Vec::new()),
            }
        }

        fn with_result(mut self, query: &str, text: &str, page: &str) -> Self {
            let mut metadata = HashMap::new();
            metadata.insert("page".to_string(), page.to_string());
            self.results.insert(
                query.to_string(),
                vec![Passage {
                    text: text.to_string(),
                    metadata,
                }],
            );
            self
        }

        fn with_delay(mut self, query: &str, ms: u64) -> Self {
            self.delays_ms.insert(query.to_string(), ms);
            self
        }

        fn with_failure(mut self, query: &str) -> Self {
            self.failing.insert(query.to_string());
            self
        }
    }

    #[async_trait]
    impl SearchClient for ScriptedSearch {
        async fn search(&self, query: &str, _k: usize) -> Result<Vec<Passage>, SearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.queries_seen.lock().unwrap().push(query.to_string());

            if let Some(ms) = self.delays_ms.get(query) {
                tokio::time::sleep(Duration::from_millis(*ms)).await;
            }
            if self.failing.contains(query) {
                return Err(SearchError::Status(
                    reqwest::StatusCode::INTERNAL_SERVER_ERROR,
                ));
            }
            Ok(self.results.get(query).cloned().unwrap_or_default())
        }
    }

    fn orchestrator(
        generation: Arc<ScriptedGeneration>,
        search: Arc<ScriptedSearch>,
    ) -> Orchestrator {
        Orchestrator::new(generation, search, 4, Duration::from_secs(30))
    }

    const TWO_PART_PLAN: &str =
        "Plan: split the question.\nSub-questions:\n- What is X part 1?\n- What is X part 2?";

    #[tokio::test]
    async fn end_to_end_success_produces_expected_context_and_answer() {
        let generation = Arc::new(ScriptedGeneration::new(TWO_PART_PLAN));
        let search = Arc::new(
            ScriptedSearch::new()
                .with_result("What is X part 1?", "X is a thing.", "1")
                .with_result("What is X part 2?", "X does Y.", "2"),
        );

        let outcome = orchestrator(generation.clone(), search.clone())
            .run("What is X?")
            .await
            .unwrap();

        let expected_context =
            "Chunk 1 (page=1): X is a thing.\n\nChunk 2 (page=2): X does Y.";
        assert_eq!(outcome.context, expected_context);
        assert_eq!(outcome.answer, expected_context);

        assert_eq!(generation.calls.planning.load(Ordering::SeqCst), 1);
        assert_eq!(generation.calls.retrieval.load(Ordering::SeqCst), 2);
        assert_eq!(generation.calls.summarization.load(Ordering::SeqCst), 1);
        assert_eq!(generation.calls.verification.load(Ordering::SeqCst), 1);
        assert_eq!(search.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn blank_question_is_rejected_before_any_stage() {
        let generation = Arc::new(ScriptedGeneration::new(TWO_PART_PLAN));
        let search = Arc::new(ScriptedSearch::new());

        let err = orchestrator(generation.clone(), search.clone())
            .run("   ")
            .await
            .unwrap_err();

        assert!(matches!(err, PipelineError::Validation));
        assert_eq!(generation.calls.planning.load(Ordering::SeqCst), 0);
        assert_eq!(search.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unparseable_plan_retrieves_the_original_question() {
        let generation = Arc::new(ScriptedGeneration::new("no labels in this response"));
        let search =
            Arc::new(ScriptedSearch::new().with_result("What is X?", "X is a thing.", "1"));

        let outcome = orchestrator(generation, search.clone())
            .run("What is X?")
            .await
            .unwrap();

        assert_eq!(
            *search.queries_seen.lock().unwrap(),
            vec!["What is X?".to_string()]
        );
        assert_eq!(outcome.context, "Chunk 1 (page=1): X is a thing.");
    }

    #[tokio::test(start_paused = true)]
    async fn merge_order_follows_sub_questions_not_completion() {
        let plan = "Plan: three parts.\nSub-questions:\n- q1\n- q2\n- q3";
        let generation = Arc::new(ScriptedGeneration::new(plan));
        // Attempts complete in reverse order of issue.
        let search = Arc::new(
            ScriptedSearch::new()
                .with_result("q1", "first", "1")
                .with_delay("q1", 300)
                .with_result("q2", "second", "2")
                .with_delay("q2", 200)
                .with_result("q3", "third", "3")
                .with_delay("q3", 100),
        );

        let outcome = orchestrator(generation, search.clone())
            .run("three part question")
            .await
            .unwrap();

        assert_eq!(search.calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            outcome.context,
            "Chunk 1 (page=1): first\n\nChunk 2 (page=2): second\n\nChunk 3 (page=3): third"
        );
    }

    #[tokio::test]
    async fn failed_attempt_fails_fast_and_skips_later_stages() {
        let generation = Arc::new(ScriptedGeneration::new(TWO_PART_PLAN));
        let search = Arc::new(
            ScriptedSearch::new()
                .with_result("What is X part 1?", "X is a thing.", "1")
                .with_failure("What is X part 2?"),
        );

        let err = orchestrator(generation.clone(), search)
            .run("What is X?")
            .await
            .unwrap_err();

        match err {
            PipelineError::RetrievalFanout { source } => {
                assert!(matches!(
                    *source,
                    PipelineError::UpstreamSearch {
                        stage: Stage::Retrieval,
                        ..
                    }
                ));
            }
            other => panic!("expected RetrievalFanout, got {other:?}"),
        }
        assert_eq!(generation.calls.summarization.load(Ordering::SeqCst), 0);
        assert_eq!(generation.calls.verification.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn tool_elected_search_uses_the_model_query() {
        let mut generation = ScriptedGeneration::new("Plan: direct.\nSub-questions:\n- q1");
        generation.retrieval_tool_query = Some("reformulated q1".to_string());
        let generation = Arc::new(generation);
        let search =
            Arc::new(ScriptedSearch::new().with_result("reformulated q1", "hit", "7"));

        let outcome = orchestrator(generation, search.clone())
            .run("original")
            .await
            .unwrap();

        assert_eq!(
            *search.queries_seen.lock().unwrap(),
            vec!["reformulated q1".to_string()]
        );
        assert_eq!(outcome.context, "Chunk 1 (page=7): hit");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_expiry_yields_cancelled() {
        let generation = Arc::new(ScriptedGeneration::new(TWO_PART_PLAN));
        let search = Arc::new(
            ScriptedSearch::new()
                .with_result("What is X part 1?", "X is a thing.", "1")
                .with_delay("What is X part 1?", 120_000)
                .with_result("What is X part 2?", "X does Y.", "2")
                .with_delay("What is X part 2?", 120_000),
        );

        let orchestrator =
            Orchestrator::new(generation.clone(), search, 4, Duration::from_millis(50));
        let err = orchestrator.run("What is X?").await.unwrap_err();

        assert!(matches!(err, PipelineError::Cancelled));
        assert_eq!(generation.calls.summarization.load(Ordering::SeqCst), 0);
        assert_eq!(generation.calls.verification.load(Ordering::SeqCst), 0);
    }
}
