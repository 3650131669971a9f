//! Per-request pipeline state.
//!
//! One `PipelineState` is created for each inbound question, flows through
//! the four stages in order, and is dropped when the response goes out. Every
//! field is write-once: each stage owns exactly the fields its `apply_*`
//! method sets, and merging the same stage output twice is a programming
//! error, not a runtime condition.

/// Output of the Planning stage.
#[derive(Debug)]
pub struct PlanUpdate {
    pub plan: String,
    pub sub_questions: Vec<String>,
}

#[derive(Debug)]
pub struct PipelineState {
    pub question: String,
    plan: Option<String>,
    sub_questions: Option<Vec<String>>,
    context: Option<String>,
    draft_answer: Option<String>,
    answer: Option<String>,
}

impl PipelineState {
    pub fn new(question: &str) -> Self {
        Self {
            question: question.to_string(),
            plan: None,
            sub_questions: None,
            context: None,
            draft_answer: None,
            answer: None,
        }
    }

    pub fn apply_plan(&mut self, update: PlanUpdate) {
        assert!(
            self.plan.is_none() && self.sub_questions.is_none(),
            "planning output merged twice"
        );
        assert!(
            !update.sub_questions.is_empty(),
            "planning produced zero sub-questions"
        );
        self.plan = Some(update.plan);
        self.sub_questions = Some(update.sub_questions);
    }

    pub fn apply_context(&mut self, context: String) {
        assert!(self.context.is_none(), "retrieval output merged twice");
        self.context = Some(context);
    }

    pub fn apply_draft(&mut self, draft_answer: String) {
        assert!(self.draft_answer.is_none(), "summarization output merged twice");
        self.draft_answer = Some(draft_answer);
    }

    pub fn apply_answer(&mut self, answer: String) {
        assert!(self.answer.is_none(), "verification output merged twice");
        self.answer = Some(answer);
    }

    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    // Stage-input accessors. The strict linear stage order guarantees these
    // fields are set before any later stage reads them.
    pub fn sub_questions(&self) -> &[String] {
        self.sub_questions.as_deref().expect("sub_questions set by planning stage")
    }

    pub fn context(&self) -> &str {
        self.context.as_deref().expect("context set by retrieval stage")
    }

    pub fn draft_answer(&self) -> &str {
        self.draft_answer.as_deref().expect("draft_answer set by summarization stage")
    }

    pub fn into_parts(self) -> (String, String) {
        let answer = self.answer.expect("answer set by verification stage");
        let context = self.context.expect("context set by retrieval stage");
        (answer, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_update() -> PlanUpdate {
        PlanUpdate {
            plan: "look it up".to_string(),
            sub_questions: vec!["what is x".to_string()],
        }
    }

    #[test]
    fn stages_populate_their_fields() {
        let mut state = PipelineState::new("what is x?");
        state.apply_plan(plan_update());
        state.apply_context("Chunk 1 (page=1): x".to_string());
        state.apply_draft("x is a thing".to_string());
        state.apply_answer("x is a thing".to_string());

        assert_eq!(state.sub_questions(), ["what is x".to_string()]);
        let (answer, context) = state.into_parts();
        assert_eq!(answer, "x is a thing");
        assert_eq!(context, "Chunk 1 (page=1): x");
    }

    #[test]
    #[should_panic(expected = "planning output merged twice")]
    fn double_plan_merge_panics() {
        let mut state = PipelineState::new("q");
        state.apply_plan(plan_update());
        state.apply_plan(plan_update());
    }

    #[test]
    #[should_panic(expected = "retrieval output merged twice")]
    fn double_context_merge_panics() {
        let mut state = PipelineState::new("q");
        state.apply_context("ctx".to_string());
        state.apply_context("ctx".to_string());
    }

    #[test]
    #[should_panic(expected = "zero sub-questions")]
    fn empty_sub_questions_panics() {
        let mut state = PipelineState::new("q");
        state.apply_plan(PlanUpdate {
            plan: String::new(),
            sub_questions: vec![],
        });
    }
}
