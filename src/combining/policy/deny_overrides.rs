//! Policy deny-overrides.

use super::evaluate_child;
use crate::combining::{
    illegal_state, require_children, CombiningAlgorithm, Faults, ObligationBuffer,
    PolicyCombiningAlgId,
};
use crate::core::{EvaluationContext, Matchers};
use crate::policy::{Decision, Evaluatable, PolicyRef};
use crate::request::Request;

/// A Deny from any child wins, then an Indeterminate, then a Permit.
///
/// With `respect_abandoned` set, the fold keeps visiting children after the
/// first Deny so that Deny obligations of later children are collected.
/// Children that cannot contribute an obligation are skipped at that point.
#[derive(Debug, Clone)]
pub struct DenyOverrides {
    id: PolicyCombiningAlgId,
    matchers: Matchers,
    respect_abandoned: bool,
}

impl DenyOverrides {
    /// Create the algorithm under `id` (plain or ordered variant).
    pub fn new(id: PolicyCombiningAlgId, matchers: Matchers, respect_abandoned: bool) -> Self {
        Self {
            id,
            matchers,
            respect_abandoned,
        }
    }
}

impl CombiningAlgorithm for DenyOverrides {
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
        let mut at_least_one_deny = false;
        let mut at_least_one_permit = false;

        for child in children {
            if at_least_one_deny && !child.carries_obligations() {
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
                Decision::Deny if !self.respect_abandoned => {
                    return obligations.finish(Decision::Deny, ctx)
                }
                Decision::Deny => at_least_one_deny = true,
                Decision::Permit => at_least_one_permit = true,
                Decision::Indeterminate => faults.record(ctx),
                Decision::NotApplicable => {}
            }
        }

        if at_least_one_deny {
            obligations.finish(Decision::Deny, ctx)
        } else if !faults.is_empty() {
            faults.indeterminate(ctx)
        } else if at_least_one_permit {
            obligations.finish(Decision::Permit, ctx)
        } else {
            obligations.finish(Decision::NotApplicable, ctx)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combining::testing::{child, policy, unreachable_matchers};
    use crate::combining::{CombiningAlgorithms, RuleCombiningAlgId};
    use crate::config::EngineConfig;
    use crate::policy::{Obligation, Policy, StatusCode};

    fn run(
        respect_abandoned: bool,
        children: Vec<Option<PolicyRef>>,
    ) -> (Decision, StatusCode, Vec<String>) {
        let algorithms = CombiningAlgorithms::default();
        let mut ctx = EvaluationContext::new(&algorithms);
        let alg = DenyOverrides::new(
            PolicyCombiningAlgId::DenyOverrides,
            Matchers::default(),
            respect_abandoned,
        );
        let decision = alg.evaluate(&Request::new(), Some(&children[..]), &mut ctx);
        let ids = ctx.obligations().iter().map(|o| o.id.clone()).collect();
        (decision, ctx.status_code(), ids)
    }

    fn with_obligation(decision: Decision, id: &str, obligation: Obligation) -> Policy {
        let mut p = policy(id, decision);
        p.obligations.push(obligation);
        p
    }

    #[test]
    fn test_basic_outcomes() {
        for respect in [false, true] {
            let (decision, status, _) = run(
                respect,
                vec![
                    child(policy("d", Decision::Deny)),
                    child(policy("n", Decision::NotApplicable)),
                ],
            );
            assert_eq!(decision, Decision::Deny);
            assert_eq!(status, StatusCode::Ok);

            let (decision, _, _) = run(
                respect,
                vec![child(policy("p", Decision::Permit)), child(policy("d", Decision::Deny))],
            );
            assert_eq!(decision, Decision::Deny);

            let (decision, _, _) = run(
                respect,
                vec![
                    child(policy("a", Decision::NotApplicable)),
                    child(policy("b", Decision::NotApplicable)),
                ],
            );
            assert_eq!(decision, Decision::NotApplicable);
        }
    }

    #[test]
    fn test_error_beats_permit() {
        let (decision, status, ids) = run(
            false,
            vec![
                child(with_obligation(Decision::Permit, "p", Obligation::on_permit("log"))),
                child(policy("x", Decision::Indeterminate)),
            ],
        );
        assert_eq!(decision, Decision::Indeterminate);
        assert_eq!(status, StatusCode::MissingAttribute);
        assert!(ids.is_empty());
    }

    #[test]
    fn test_short_circuit_loses_later_deny_obligations() {
        let children = vec![
            child(with_obligation(Decision::Deny, "d1", Obligation::on_deny("first"))),
            child(with_obligation(Decision::Deny, "d2", Obligation::on_deny("second"))),
            child(with_obligation(Decision::Permit, "p", Obligation::on_permit("log"))),
        ];

        let (decision, _, ids) = run(false, children.clone());
        assert_eq!(decision, Decision::Deny);
        assert_eq!(ids, vec!["first"]);

        let (decision, _, ids) = run(true, children);
        assert_eq!(decision, Decision::Deny);
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[test]
    fn test_abandoned_children_without_obligations_are_skipped() {
        let algorithms = CombiningAlgorithms::new(unreachable_matchers(), &EngineConfig::default());
        let mut ctx = EvaluationContext::new(&algorithms);
        let alg =
            DenyOverrides::new(PolicyCombiningAlgId::DenyOverrides, unreachable_matchers(), true);

        // Neither child has a target or a rule condition, so the matchers are
        // never consulted for the Deny; the second child would panic if it
        // were visited.
        let deny = Policy::builder("d")
            .combining_algorithm(RuleCombiningAlgId::FirstApplicable)
            .rule(crate::policy::Rule::deny("r"))
            .build();
        let mut skipped = policy("s", Decision::Permit);
        skipped.target = Some(crate::combining::testing::never());

        let children = vec![child(deny), child(skipped)];
        let decision = alg.evaluate(&Request::new(), Some(&children[..]), &mut ctx);
        assert_eq!(decision, Decision::Deny);
    }

    #[test]
    fn test_child_without_algorithm_fails_the_fold() {
        let (decision, status, _) = run(
            true,
            vec![
                child(policy("p", Decision::Permit)),
                child(Policy::builder("broken").rule(crate::policy::Rule::deny("r")).build()),
            ],
        );
        assert_eq!(decision, Decision::Indeterminate);
        assert_eq!(status, StatusCode::SyntaxError);
    }

    #[test]
    fn test_empty_slot_anywhere() {
        for position in 0..3 {
            let mut children = vec![
                child(policy("d", Decision::Deny)),
                child(policy("p", Decision::Permit)),
            ];
            children.insert(position, None);
            let (decision, status, ids) = run(false, children);
            assert_eq!(decision, Decision::Indeterminate);
            assert_eq!(status, StatusCode::SyntaxError);
            assert!(ids.is_empty());
        }
    }
}
