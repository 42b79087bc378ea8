//! Policy permit-overrides.

use super::evaluate_child;
use crate::combining::{
    illegal_state, require_children, CombiningAlgorithm, Faults, ObligationBuffer,
    PolicyCombiningAlgId,
};
use crate::core::{EvaluationContext, Matchers};
use crate::policy::{Decision, Evaluatable, PolicyRef};
use crate::request::Request;

/// A Permit from any child wins, then a Deny, then an Indeterminate.
///
/// The Indeterminate outcome carries the status codes and missing attributes
/// of every child that failed.
#[derive(Debug, Clone)]
pub struct PermitOverrides {
    id: PolicyCombiningAlgId,
    matchers: Matchers,
    respect_abandoned: bool,
}

impl PermitOverrides {
    /// Create the algorithm under `id` (plain or ordered variant).
    pub fn new(id: PolicyCombiningAlgId, matchers: Matchers, respect_abandoned: bool) -> Self {
        Self {
            id,
            matchers,
            respect_abandoned,
        }
    }
}

impl CombiningAlgorithm for PermitOverrides {
    type Child = PolicyRef;

    fn id(&self) -> &'static str {
        self.id.urn()
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

        let mut obligations = ObligationBuffer::default();
        let mut faults = Faults::default();
        let mut at_least_one_permit = false;
        let mut at_least_one_deny = false;

        for child in children {
            if at_least_one_permit && !child.carries_obligations() {
                tracing::trace!(
                    algorithm = self.id(),
                    evaluatable = child.id(),
                    "Skipping abandoned evaluatable"
                );
                continue;
            }

            ctx.reset_status();
            let decision = match evaluate_child(child, request, &self.matchers, ctx) {
                Ok(decision) => decision,
                Err(err) => return illegal_state(ctx, self.id(), &err),
            };
            obligations.harvest(child.obligations(), decision, ctx);

            match decision {
                Decision::Permit if !self.respect_abandoned => {
                    return obligations.finish(Decision::Permit, ctx)
                }
                Decision::Permit => at_least_one_permit = true,
                Decision::Deny => at_least_one_deny = true,
                Decision::Indeterminate => faults.record(ctx),
                Decision::NotApplicable => {}
            }
        }

        if at_least_one_permit {
            obligations.finish(Decision::Permit, ctx)
        } else if at_least_one_deny {
            obligations.finish(Decision::Deny, ctx)
        } else if !faults.is_empty() {
            faults.indeterminate(ctx)
        } else {
            obligations.finish(Decision::NotApplicable, ctx)
        }
    }
}
