//! Pipeline evaluation endpoint.

use reqwest::Method;

use crate::client::{CaradocClient, ClientError};
use crate::http::check_status;
use crate::model::{EvaluationMetrics, EvaluationRequest};

impl CaradocClient {
    /// Run a workflow against a collection and return its metrics.
    ///
    /// The run can take minutes; the client timeout applies. Metric names
    /// are returned exactly as the backend sends them.
    pub async fn evaluate(&self, request: &EvaluationRequest) -> Result<EvaluationMetrics, ClientError> {
        log::info!(
            "evaluating workflow {} on collection {}",
            request.workflow,
            request.index
        );
        let request = self.request(Method::POST, "/evaluation/eval").json(request);
        let response = check_status(request.send().await?).await?;
        Ok(response.json().await?)
    }
}
