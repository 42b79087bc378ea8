//! Rule combining algorithms.

mod deny_overrides;
mod first_applicable;
mod permit_overrides;

pub use deny_overrides::DenyOverrides;
pub use first_applicable::FirstApplicable;
pub use permit_overrides::PermitOverrides;

use super::{CombiningAlgorithm, RuleCombiningAlgId};
use crate::core::{EvaluationContext, MatchResult, Matchers};
use crate::policy::{Decision, Rule};
use crate::request::Request;

/// A configured rule combining algorithm.
#[derive(Debug, Clone)]
pub enum RuleCombiningAlgorithm {
    /// Deny-overrides and its ordered variant
    DenyOverrides(DenyOverrides),
    /// Permit-overrides and its ordered variant
    PermitOverrides(PermitOverrides),
    /// First-applicable
    FirstApplicable(FirstApplicable),
}

impl RuleCombiningAlgorithm {
    /// Build the algorithm identified by `id`.
    pub fn new(id: RuleCombiningAlgId, matchers: Matchers) -> Self {
        match id {
            RuleCombiningAlgId::DenyOverrides | RuleCombiningAlgId::OrderedDenyOverrides => {
                RuleCombiningAlgorithm::DenyOverrides(DenyOverrides::new(id, matchers))
            }
            RuleCombiningAlgId::PermitOverrides | RuleCombiningAlgId::OrderedPermitOverrides => {
                RuleCombiningAlgorithm::PermitOverrides(PermitOverrides::new(id, matchers))
            }
            RuleCombiningAlgId::FirstApplicable => {
                RuleCombiningAlgorithm::FirstApplicable(FirstApplicable::new(matchers))
            }
        }
    }
}

impl CombiningAlgorithm for RuleCombiningAlgorithm {
    type Child = Rule;

    fn id(&self) -> &'static str {
        match self {
            RuleCombiningAlgorithm::DenyOverrides(alg) => alg.id(),
            RuleCombiningAlgorithm::PermitOverrides(alg) => alg.id(),
            RuleCombiningAlgorithm::FirstApplicable(alg) => alg.id(),
        }
    }

    fn evaluate(
        &self,
        request: &Request,
        children: Option<&[Option<Rule>]>,
        ctx: &mut EvaluationContext<'_>,
    ) -> Decision {
        let decision = match self {
            RuleCombiningAlgorithm::DenyOverrides(alg) => alg.evaluate(request, children, ctx),
            RuleCombiningAlgorithm::PermitOverrides(alg) => alg.evaluate(request, children, ctx),
            RuleCombiningAlgorithm::FirstApplicable(alg) => alg.evaluate(request, children, ctx),
        };
        tracing::debug!(
            algorithm = self.id(),
            decision = %decision,
            status = %ctx.status_code(),
            "Rules combined"
        );
        decision
    }
}

/// Evaluate one rule: its target, then its condition.
pub(crate) fn evaluate_rule(
    rule: &Rule,
    request: &Request,
    matchers: &Matchers,
    ctx: &mut EvaluationContext<'_>,
) -> Decision {
    if let Some(target) = &rule.target {
        match matchers.target.match_target(target, request, ctx) {
            MatchResult::Match => {}
            MatchResult::NoMatch => return Decision::NotApplicable,
            MatchResult::Indeterminate => return Decision::Indeterminate,
        }
    }

    let decision = match &rule.condition {
        None => Decision::from(rule.effect),
        Some(condition) => match matchers.condition.evaluate_condition(condition, request, ctx) {
            MatchResult::Match => Decision::from(rule.effect),
            MatchResult::NoMatch => Decision::NotApplicable,
            MatchResult::Indeterminate => Decision::Indeterminate,
        },
    };
    tracing::trace!(evaluatable = %rule.id, decision = %decision, "Rule evaluated");
    decision
}
