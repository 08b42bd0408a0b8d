//! Evaluator reached over HTTP.
//!
//! POSTs the [`ChangeContext`] as JSON to a fixed endpoint and expects a
//! JSON score object back. Any HTTP response to the startup probe counts as
//! reachable; only transport errors mark the endpoint unavailable.
//!
//! Only connecting and the startup probe carry their own timeout. A hung
//! evaluation is cut off by [`EvaluatorHandle::assess`](super::EvaluatorHandle::assess),
//! which reports it as a timeout rather than a transport error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use super::{parse_score_bytes, Evaluator};
use crate::domain::{ChangeContext, EvaluationFailure, ScoreSet, UnreachableDependency};

/// Evaluator at a fixed HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpEvaluator {
    client: Client,
    endpoint: Url,
    display: String,
    probe_timeout: Duration,
}

impl HttpEvaluator {
    /// Validate the endpoint. `timeout` bounds connecting and the probe.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, UnreachableDependency> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| UnreachableDependency::Endpoint(format!("{endpoint}: {e}")))?;
        let client = Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| UnreachableDependency::Endpoint(e.to_string()))?;
        Ok(Self {
            client,
            display: endpoint.to_string(),
            endpoint,
            probe_timeout: timeout,
        })
    }
}

#[async_trait]
impl Evaluator for HttpEvaluator {
    fn name(&self) -> &str {
        &self.display
    }

    async fn probe(&self) -> Result<(), UnreachableDependency> {
        self.client
            .get(self.endpoint.clone())
            .timeout(self.probe_timeout)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| UnreachableDependency::Endpoint(e.to_string()))
    }

    async fn evaluate(&self, context: &ChangeContext) -> Result<ScoreSet, EvaluationFailure> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(context)
            .send()
            .await
            .map_err(|e| EvaluationFailure::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| EvaluationFailure::Transport(e.to_string()))?;

        if !status.is_success() {
            return Err(EvaluationFailure::Transport(format!(
                "HTTP {status}: {}",
                String::from_utf8_lossy(&body).trim()
            )));
        }

        parse_score_bytes(&body)
    }
}
