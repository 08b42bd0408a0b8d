//! Scan pipeline: Evaluator Adapter → Verdict Classifier → Feature Gate.
//!
//! [`Scanner::scan`] is total: every request ends in exactly one
//! [`Response`], whatever the evaluator does.

use crate::domain::{ChangeContext, Response, ScanRequest, Tier, Verdict};
use crate::evaluator::{Assessment, EvaluatorHandle};
use crate::feature_gate;

/// Feature that unlocks the per-dimension score breakdown.
pub const BREAKDOWN_FEATURE: &str = "advanced_advisors";

/// Runs one request through gate, evaluator and classifier.
#[derive(Debug, Clone)]
pub struct Scanner {
    evaluator: EvaluatorHandle,
}

impl Scanner {
    /// Scanner backed by an already-probed evaluator.
    pub fn new(evaluator: EvaluatorHandle) -> Self {
        Self { evaluator }
    }

    /// True when the evaluator was unavailable at startup; every scan then
    /// answers with the degraded warning verdict.
    pub fn is_degraded(&self) -> bool {
        self.evaluator.is_degraded()
    }

    /// Answer one request. A requested feature the tier lacks is denied
    /// without calling the evaluator; otherwise the result is a verdict,
    /// with the breakdown stripped when the tier does not grant it.
    ///
    /// ```
    /// use aegis_core::{EvaluatorHandle, Response, ScanRequest, Scanner, Status};
    ///
    /// # tokio::runtime::Runtime::new().unwrap().block_on(async {
    /// let scanner = Scanner::new(EvaluatorHandle::unavailable("offline"));
    /// let request = ScanRequest::new("https://example.test", "<p>hi</p>");
    /// match scanner.scan(&request).await {
    ///     Response::Verdict(v) => assert_eq!(v.status, Status::Warning),
    ///     other => panic!("unexpected {other:?}"),
    /// }
    /// # });
    /// ```
    pub async fn scan(&self, request: &ScanRequest) -> Response {
        // An explicitly requested feature is checked before spending an evaluation.
        let tier = match request.feature.as_deref() {
            Some(feature) => {
                let tier_name = request.tier.as_deref().unwrap_or(Tier::Free.name());
                match feature_gate::authorize(tier_name, Some(feature)) {
                    Ok(tier) => Some(tier),
                    Err(denied) => return Response::denied(denied),
                }
            }
            None => request.tier.as_deref().map(feature_gate::resolve_tier),
        };

        let context = ChangeContext::from(request);
        let mut verdict = match self.evaluator.assess(&context).await {
            Assessment::Scored(scores) => Verdict::classified(scores),
            Assessment::Degraded { reason } => Verdict::degraded(&reason),
            Assessment::Failed(failure) => Verdict::evaluation_failed(&failure),
        };

        // Requests without a tier predate licensing and stay ungated.
        if let Some(tier) = tier {
            if !tier.grants(BREAKDOWN_FEATURE) {
                verdict.breakdown = None;
            }
        }

        Response::Verdict(verdict)
    }
}
