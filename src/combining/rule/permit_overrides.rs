//! Rule permit-overrides.

use super::evaluate_rule;
use crate::combining::{
    illegal_state, require_children, CombiningAlgorithm, Faults, ObligationBuffer,
    RuleCombiningAlgId,
};
use crate::core::{EvaluationContext, Matchers};
use crate::policy::{Decision, Effect, Rule};
use crate::request::Request;

/// A Permit from any rule wins. Mirror image of deny-overrides.
#[derive(Debug, Clone)]
pub struct PermitOverrides {
    id: RuleCombiningAlgId,
    matchers: Matchers,
}

impl PermitOverrides {
    /// Create the algorithm under `id` (plain or ordered variant).
    pub fn new(id: RuleCombiningAlgId, matchers: Matchers) -> Self {
        Self { id, matchers }
    }
}

impl CombiningAlgorithm for PermitOverrides {
    type Child = Rule;

    fn id(&self) -> &'static str {
        self.id.urn()
    }

    fn evaluate(
        &self,
        request: &Request,
        children: Option<&[Option<Rule>]>,
        ctx: &mut EvaluationContext<'_>,
    ) -> Decision {
        let rules = match require_children(children) {
            Ok(rules) => rules,
            Err(err) => return illegal_state(ctx, self.id(), &err),
        };

        let mut obligations = ObligationBuffer::default();
        let mut faults = Faults::default();
        let mut at_least_one_deny = false;
        let mut potential_permit = false;

        for rule in rules {
            ctx.reset_status();
            let decision = evaluate_rule(rule, request, &self.matchers, ctx);
            obligations.harvest(&rule.obligations, decision, ctx);

            match decision {
                Decision::Permit => return obligations.finish(Decision::Permit, ctx),
                Decision::Deny => at_least_one_deny = true,
                Decision::Indeterminate => {
                    faults.record(ctx);
                    potential_permit |= rule.effect == Effect::Permit;
                }
                Decision::NotApplicable => {}
            }
        }

        if potential_permit {
            faults.indeterminate(ctx)
        } else if at_least_one_deny {
            obligations.finish(Decision::Deny, ctx)
        } else if !faults.is_empty() {
            faults.indeterminate(ctx)
        } else {
            obligations.finish(Decision::NotApplicable, ctx)
        }
    }
}
