//! Decision response type.

use crate::core::EvaluationContext;
use crate::policy::{Decision, MissingAttributeDetail, Obligation, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The answer to a decision request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    /// Id of the request this answers
    #[serde(default)]
    pub request_id: String,
    /// The combined decision
    pub decision: Decision,
    /// Primary status; `Ok` unless the decision is Indeterminate
    pub status_code: StatusCode,
    /// Every status collected from failing children
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub status_codes: Vec<StatusCode>,
    /// Required attributes that could not be resolved
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_attributes: Vec<MissingAttributeDetail>,
    /// Obligations the enforcement point must discharge
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
    /// Time taken for evaluation in milliseconds
    #[serde(default)]
    pub evaluation_time_ms: f64,
    /// Whether the response was served from the decision cache
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub cached: bool,
}

impl Response {
    /// Build a response from a finished evaluation.
    ///
    /// Only Indeterminate keeps the status the context accumulated; every
    /// other decision reports `Ok` with no fault details.
    pub fn from_context(
        request_id: impl Into<String>,
        decision: Decision,
        ctx: &mut EvaluationContext<'_>,
    ) -> Self {
        let obligations = ctx.take_obligations();
        let (status_code, status_codes, missing_attributes) =
            if decision == Decision::Indeterminate {
                (
                    ctx.status_code(),
                    ctx.status_codes().to_vec(),
                    ctx.missing_attributes().to_vec(),
                )
            } else {
                (StatusCode::Ok, Vec::new(), Vec::new())
            };

        Self {
            request_id: request_id.into(),
            decision,
            status_code,
            status_codes,
            missing_attributes,
            obligations: if decision.effect().is_some() { obligations } else { Vec::new() },
            evaluation_time_ms: 0.0,
            cached: false,
        }
    }

    /// Set the evaluation time.
    pub fn with_evaluation_time(mut self, duration: Duration) -> Self {
        self.evaluation_time_ms = duration.as_secs_f64() * 1000.0;
        self
    }

    /// Whether access is granted.
    pub fn is_permit(&self) -> bool {
        self.decision == Decision::Permit
    }

    /// Ids of the returned obligations, in order.
    pub fn obligation_ids(&self) -> Vec<&str> {
        self.obligations.iter().map(|o| o.id.as_str()).collect()
    }
}
