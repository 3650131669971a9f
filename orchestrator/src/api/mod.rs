use std::sync::Arc;
use warp::{Filter, Rejection, Reply};

use anyhow::Result;
use prometheus::IntCounter;

use crate::pipeline::Orchestrator;

mod qa;

#[derive(Clone)]
pub struct Metrics {
    pub questions_total: IntCounter,
    pub pipeline_failures_total: IntCounter,
}

impl Metrics {
    pub fn register() -> Result<Self> {
        Ok(Self {
            questions_total: prometheus::register_int_counter!(
                "qa_questions_total",
                "Questions received by the QA endpoint"
            )?,
            pipeline_failures_total: prometheus::register_int_counter!(
                "qa_pipeline_failures_total",
                "Pipeline runs that ended in an error"
            )?,
        })
    }
}

pub fn routes(
    orchestrator: Arc<Orchestrator>,
    metrics: Metrics,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let api = warp::path("api").and(warp::path("v1"));

    api.and(warp::path("qa"))
        .and(warp::post())
        .and(warp::body::json())
        .and(with_orchestrator(orchestrator))
        .and(with_metrics(metrics))
        .and_then(qa::handle_qa)
}

fn with_orchestrator(
    orchestrator: Arc<Orchestrator>,
) -> impl Filter<Extract = (Arc<Orchestrator>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || orchestrator.clone())
}

fn with_metrics(
    metrics: Metrics,
) -> impl Filter<Extract = (Metrics,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || metrics.clone())
}
