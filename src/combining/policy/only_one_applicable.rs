//! Policy only-one-applicable.

use super::evaluate_child;
use crate::combining::{
    illegal_state, require_children, CombiningAlgorithm, Faults, ObligationBuffer,
    PolicyCombiningAlgId,
};
use crate::core::{EvaluationContext, Matchers};
use crate::policy::{Decision, Evaluatable, PolicyRef, StatusCode};
use crate::request::Request;

/// Exactly one child may have a matching target; its outcome is forwarded.
///
/// Applicability is decided by the target alone: a child whose target
/// matched counts even when its own rules were all inapplicable. Two
/// applicable children make the request ambiguous. A child whose target
/// could not be evaluated makes the whole fold Indeterminate.
#[derive(Debug, Clone)]
pub struct OnlyOneApplicable {
    matchers: Matchers,
}

/// The outcome of the lone applicable child, held until the fold ends.
struct Selected {
    decision: Decision,
    obligations: ObligationBuffer,
    faults: Faults,
}

impl OnlyOneApplicable {
    /// Create the algorithm.
    pub fn new(matchers: Matchers) -> Self {
        Self { matchers }
    }
}

impl CombiningAlgorithm for OnlyOneApplicable {
    type Child = PolicyRef;

    fn id(&self) -> &'static str {
        PolicyCombiningAlgId::OnlyOneApplicable.urn()
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

        let mut selected: Option<Selected> = None;

        for child in children {
            ctx.reset_status();
            let decision = match evaluate_child(child, request, &self.matchers, ctx) {
                Ok(decision) => decision,
                Err(err) => return illegal_state(ctx, self.id(), &err),
            };

            if !ctx.is_target_matched() {
                if decision == Decision::NotApplicable {
                    ctx.clear_obligations();
                    continue;
                }
                let mut faults = Faults::default();
                faults.record(ctx);
                return faults.indeterminate(ctx);
            }

            if selected.is_some() {
                tracing::debug!(
                    algorithm = self.id(),
                    evaluatable = child.id(),
                    "More than one applicable evaluatable"
                );
                ctx.clear_obligations();
                ctx.reset_status();
                ctx.update_status_code(StatusCode::ProcessingError);
                return Decision::Indeterminate;
            }

            let mut obligations = ObligationBuffer::default();
            let mut faults = Faults::default();
            if decision == Decision::Indeterminate {
                faults.record(ctx);
            }
            obligations.harvest(child.obligations(), decision, ctx);
            selected = Some(Selected {
                decision,
                obligations,
                faults,
            });
        }

        match selected {
            None => ObligationBuffer::default().finish(Decision::NotApplicable, ctx),
            Some(Selected {
                decision: Decision::Indeterminate,
                faults,
                ..
            }) => faults.indeterminate(ctx),
            Some(Selected {
                decision,
                obligations,
                ..
            }) => obligations.finish(decision, ctx),
        }
    }
}
