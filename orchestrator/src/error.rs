use std::fmt;
use thiserror::Error;
use warp::{reject::Reject, Rejection, Reply};

/// The four pipeline stages, in execution order. Used to tag errors with
/// their origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Planning,
    Retrieval,
    Summarization,
    Verification,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Planning => "planning",
            Stage::Retrieval => "retrieval",
            Stage::Summarization => "summarization",
            Stage::Verification => "verification",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("request to generation service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("generation service returned status {0}")]
    Status(reqwest::StatusCode),

    #[error("generation response contained no choices")]
    EmptyResponse,

    #[error("model requested unknown tool '{0}'")]
    UnknownTool(String),

    #[error("tool call arguments were not valid JSON: {0}")]
    MalformedToolArguments(#[source] serde_json::Error),

    #[error("model returned a tool request where text was expected")]
    UnexpectedToolRequest,
}

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("request to search service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("search service returned status {0}")]
    Status(reqwest::StatusCode),
}

/// Tagged failure outcome of one pipeline run. No retries happen inside the
/// core; every failure aborts the run and surfaces here.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("question must not be empty")]
    Validation,

    #[error("{stage} stage: {source}")]
    UpstreamGeneration {
        stage: Stage,
        #[source]
        source: GenerationError,
    },

    #[error("{stage} stage: {source}")]
    UpstreamSearch {
        stage: Stage,
        #[source]
        source: SearchError,
    },

    #[error("retrieval fan-out aborted: {source}")]
    RetrievalFanout {
        #[source]
        source: Box<PipelineError>,
    },

    #[error("pipeline run cancelled before completion")]
    Cancelled,
}

impl PipelineError {
    /// Stage the failure originated in, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::UpstreamGeneration { stage, .. } => Some(*stage),
            PipelineError::UpstreamSearch { stage, .. } => Some(*stage),
            PipelineError::RetrievalFanout { .. } => Some(Stage::Retrieval),
            PipelineError::Validation | PipelineError::Cancelled => None,
        }
    }
}

#[derive(Debug)]
pub struct PipelineRejection(pub PipelineError);

impl Reject for PipelineRejection {}

pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Rejection> {
    if let Some(PipelineRejection(pipeline_err)) = err.find::<PipelineRejection>() {
        let code = match pipeline_err {
            PipelineError::Validation => 400,
            PipelineError::Cancelled => 504,
            _ => 502,
        };

        let json = warp::reply::json(&serde_json::json!({
            "error": pipeline_err.to_string(),
            "stage": pipeline_err.stage().map(|s| s.to_string()),
        }));

        Ok(warp::reply::with_status(
            json,
            warp::http::StatusCode::from_u16(code).unwrap(),
        ))
    } else {
        Err(err)
    }
}
