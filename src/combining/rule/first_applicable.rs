//! Rule first-applicable.

use super::evaluate_rule;
use crate::combining::{
    illegal_state, require_children, CombiningAlgorithm, Faults, ObligationBuffer,
    RuleCombiningAlgId,
};
use crate::core::{EvaluationContext, Matchers};
use crate::policy::{Decision, Rule};
use crate::request::Request;

/// The first rule that does not return NotApplicable decides.
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
    type Child = Rule;

    fn id(&self) -> &'static str {
        RuleCombiningAlgId::FirstApplicable.urn()
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

        for rule in rules {
            ctx.reset_status();
            match evaluate_rule(rule, request, &self.matchers, ctx) {
                Decision::NotApplicable => ctx.clear_obligations(),
                Decision::Indeterminate => {
                    let mut faults = Faults::default();
                    faults.record(ctx);
                    return faults.indeterminate(ctx);
                }
                decision => {
                    let mut obligations = ObligationBuffer::default();
                    obligations.harvest(&rule.obligations, decision, ctx);
                    return obligations.finish(decision, ctx);
                }
            }
        }

        ObligationBuffer::default().finish(Decision::NotApplicable, ctx)
    }
}
