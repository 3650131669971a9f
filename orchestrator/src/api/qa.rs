use std::sync::Arc;
use warp::{Rejection, Reply};

use tracing::{error, info};
use uuid::Uuid;

use super::Metrics;
use crate::error::PipelineRejection;
use crate::models::{QaRequest, QaResponse};
use crate::pipeline::Orchestrator;

pub async fn handle_qa(
    request: QaRequest,
    orchestrator: Arc<Orchestrator>,
    metrics: Metrics,
) -> Result<impl Reply, Rejection> {
    let request_id = Uuid::new_v4();
    info!("Processing question [{}]", request_id);
    metrics.questions_total.inc();

    match orchestrator.run(&request.question).await {
        Ok(outcome) => Ok(warp::reply::json(&QaResponse {
            request_id,
            answer: outcome.answer,
            context: outcome.context,
        })),
        Err(err) => {
            error!("Pipeline failed [{}]: {}", request_id, err);
            metrics.pipeline_failures_total.inc();
            Err(warp::reject::custom(PipelineRejection(err)))
        }
    }
}
