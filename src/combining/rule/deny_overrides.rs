//! Rule deny-overrides.

use super::evaluate_rule;
use crate::combining::{
    illegal_state, require_children, CombiningAlgorithm, Faults, ObligationBuffer,
    RuleCombiningAlgId,
};
use crate::core::{EvaluationContext, Matchers};
use crate::policy::{Decision, Effect, Rule};
use crate::request::Request;

/// A Deny from any rule wins.
///
/// An Indeterminate from a Deny rule blocks a Permit, since the rule might
/// have denied had it been evaluable.
#[derive(Debug, Clone)]
pub struct DenyOverrides {
    id: RuleCombiningAlgId,
    matchers: Matchers,
}

impl DenyOverrides {
    /// Create the algorithm under `id` (plain or ordered variant).
    pub fn new(id: RuleCombiningAlgId, matchers: Matchers) -> Self {
        Self { id, matchers }
    }
}

impl CombiningAlgorithm for DenyOverrides {
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
        let mut at_least_one_permit = false;
        let mut potential_deny = false;

        for rule in rules {
            ctx.reset_status();
            let decision = evaluate_rule(rule, request, &self.matchers, ctx);
            obligations.harvest(&rule.obligations, decision, ctx);

            match decision {
                Decision::Deny => return obligations.finish(Decision::Deny, ctx),
                Decision::Permit => at_least_one_permit = true,
                Decision::Indeterminate => {
                    faults.record(ctx);
                    potential_deny |= rule.effect == Effect::Deny;
                }
                Decision::NotApplicable => {}
            }
        }

        if potential_deny {
            faults.indeterminate(ctx)
        } else if at_least_one_permit {
            obligations.finish(Decision::Permit, ctx)
        } else if !faults.is_empty() {
            faults.indeterminate(ctx)
        } else {
            obligations.finish(Decision::NotApplicable, ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combining::testing::{failing_rule, inapplicable_rule, rule, unreachable_matchers};
    use crate::combining::CombiningAlgorithms;
    use crate::policy::{Obligation, StatusCode};

    fn alg() -> DenyOverrides {
        DenyOverrides::new(RuleCombiningAlgId::DenyOverrides, Matchers::default())
    }

    fn run(rules: Vec<Rule>) -> (Decision, StatusCode, Vec<String>) {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let slots: Vec<_> = rules.into_iter().map(Some).collect();
        let decision = alg().evaluate(&Request::new(), Some(&slots[..]), &mut ctx);
        let ids = ctx.obligations().iter().map(|o| o.id.clone()).collect();
        (decision, ctx.status_code(), ids)
    }

    #[test]
    fn test_deny_wins() {
        let (decision, status, _) = run(vec![rule("p", Effect::Permit), rule("d", Effect::Deny)]);
        assert_eq!(decision, Decision::Deny);
        assert_eq!(status, StatusCode::Ok);

        let (decision, _, _) = run(vec![rule("d", Effect::Deny), inapplicable_rule("n")]);
        assert_eq!(decision, Decision::Deny);
    }

    #[test]
    fn test_all_inapplicable() {
        let (decision, status, _) = run(vec![inapplicable_rule("a"), inapplicable_rule("b")]);
        assert_eq!(decision, Decision::NotApplicable);
        assert_eq!(status, StatusCode::Ok);

        let (decision, _, _) = run(Vec::new());
        assert_eq!(decision, Decision::NotApplicable);
    }

    #[test]
    fn test_failed_deny_rule_blocks_permit() {
        let (decision, status, ids) = run(vec![
            rule("p", Effect::Permit).with_obligation(Obligation::on_permit("log")),
            failing_rule("d", Effect::Deny),
        ]);
        assert_eq!(decision, Decision::Indeterminate);
        assert_eq!(status, StatusCode::MissingAttribute);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_failed_permit_rule_does_not_block_permit() {
        let (decision, status, ids) = run(vec![
            failing_rule("x", Effect::Permit),
            rule("p", Effect::Permit).with_obligation(Obligation::on_permit("log")),
        ]);
        assert_eq!(decision, Decision::Permit);
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(ids, vec!["log"]);

        let (decision, status, _) =
            run(vec![failing_rule("x", Effect::Permit), inapplicable_rule("n")]);
        assert_eq!(decision, Decision::Indeterminate);
        assert_eq!(status, StatusCode::MissingAttribute);
    }

    #[test]
    fn test_deny_carries_only_deny_obligations() {
        let (decision, _, ids) = run(vec![
            rule("p", Effect::Permit).with_obligation(Obligation::on_permit("log")),
            rule("d", Effect::Deny)
                .with_obligation(Obligation::on_deny("alert"))
                .with_obligation(Obligation::on_permit("never")),
        ]);
        assert_eq!(decision, Decision::Deny);
        assert_eq!(ids, vec!["alert"]);
    }

    #[test]
    fn test_empty_slot_is_syntax_error() {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let alg = DenyOverrides::new(RuleCombiningAlgId::DenyOverrides, unreachable_matchers());

        let slots = vec![Some(rule("d", Effect::Deny)), None];
        assert_eq!(
            alg.evaluate(&Request::new(), Some(&slots[..]), &mut ctx),
            Decision::Indeterminate
        );
        assert_eq!(ctx.status_code(), StatusCode::SyntaxError);

        assert_eq!(alg.evaluate(&Request::new(), None, &mut ctx), Decision::Indeterminate);
        assert_eq!(ctx.status_code(), StatusCode::SyntaxError);
    }
}
