//! Policy first-applicable.

use super::evaluate_child;
use crate::combining::{
    illegal_state, require_children, CombiningAlgorithm, Faults, ObligationBuffer,
    PolicyCombiningAlgId,
};
use crate::core::{EvaluationContext, Matchers};
use crate::policy::{Decision, Evaluatable, PolicyRef};
use crate::request::Request;

/// The first child that does not return NotApplicable decides, errors
/// included.
#[derive(Debug, Clone)]
pub struct FirstApplicable {
    matchers: Matchers,
}

impl FirstApplicable {
    /// Create the algorithm.
    pub fn new(matchers: Matchers) -> Self {
        Self { matchers }
    }
}

impl CombiningAlgorithm for FirstApplicable {
    type Child = PolicyRef;

    fn id(&self) -> &'static str {
        PolicyCombiningAlgId::FirstApplicable.urn()
    }

    fn evaluate(
        &self,
        request: &Request,
        children: Option<&[Option<PolicyRef>]>,
        ctx: &mut EvaluationContext<'_>,
    ) -> Decision {
        let children = match require_children(children) {
            Ok(children) => children,
            Err(err) => return illegal_state(ctx, self.id(), &err),
        };

        for child in children {
            ctx.reset_status();
            let decision = match evaluate_child(child, request, &self.matchers, ctx) {
                Ok(decision) => decision,
                Err(err) => return illegal_state(ctx, self.id(), &err),
            };

            match decision {
                Decision::NotApplicable => ctx.clear_obligations(),
                Decision::Indeterminate => {
                    let mut faults = Faults::default();
                    faults.record(ctx);
                    return faults.indeterminate(ctx);
                }
                decision => {
                    let mut obligations = ObligationBuffer::default();
                    obligations.harvest(child.obligations(), decision, ctx);
                    return obligations.finish(decision, ctx);
                }
            }
        }

        ObligationBuffer::default().finish(Decision::NotApplicable, ctx)
    }
}
