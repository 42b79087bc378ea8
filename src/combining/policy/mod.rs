//! Policy combining algorithms.
//!
//! Children are policies, policy sets and references to top-level
//! evaluatables. Each child is matched against its target and then evaluated
//! by its own combining algorithm, so recursion happens at this layer.

mod deny_overrides;
mod first_applicable;
mod only_one_applicable;
mod permit_overrides;

pub use deny_overrides::DenyOverrides;
pub use first_applicable::FirstApplicable;
pub use only_one_applicable::OnlyOneApplicable;
pub use permit_overrides::PermitOverrides;

use super::{CombiningAlgorithm, PolicyCombiningAlgId};
use crate::core::{EvaluationContext, MatchResult, Matchers};
use crate::policy::{
    Decision, Evaluatable, PolicyRef, PolicyReference, PolicyTreeNode, StatusCode, Target,
};
use crate::request::Request;

/// A configured policy combining algorithm.
#[derive(Debug, Clone)]
pub enum PolicyCombiningAlgorithm {
    /// Deny-overrides and its ordered variant
    DenyOverrides(DenyOverrides),
    /// Permit-overrides and its ordered variant
    PermitOverrides(PermitOverrides),
    /// First-applicable
    FirstApplicable(FirstApplicable),
    /// Only-one-applicable
    OnlyOneApplicable(OnlyOneApplicable),
}

impl PolicyCombiningAlgorithm {
    /// Build the algorithm identified by `id`.
    ///
    /// `respect_abandoned` only affects the overrides family.
    pub fn new(id: PolicyCombiningAlgId, matchers: Matchers, respect_abandoned: bool) -> Self {
        match id {
            PolicyCombiningAlgId::DenyOverrides | PolicyCombiningAlgId::OrderedDenyOverrides => {
                PolicyCombiningAlgorithm::DenyOverrides(DenyOverrides::new(
                    id,
                    matchers,
                    respect_abandoned,
                ))
            }
            PolicyCombiningAlgId::PermitOverrides
            | PolicyCombiningAlgId::OrderedPermitOverrides => {
                PolicyCombiningAlgorithm::PermitOverrides(PermitOverrides::new(
                    id,
                    matchers,
                    respect_abandoned,
                ))
            }
            PolicyCombiningAlgId::FirstApplicable => {
                PolicyCombiningAlgorithm::FirstApplicable(FirstApplicable::new(matchers))
            }
            PolicyCombiningAlgId::OnlyOneApplicable => {
                PolicyCombiningAlgorithm::OnlyOneApplicable(OnlyOneApplicable::new(matchers))
            }
        }
    }
}

impl CombiningAlgorithm for PolicyCombiningAlgorithm {
    type Child = PolicyRef;

    fn id(&self) -> &'static str {
        match self {
            PolicyCombiningAlgorithm::DenyOverrides(alg) => alg.id(),
            PolicyCombiningAlgorithm::PermitOverrides(alg) => alg.id(),
            PolicyCombiningAlgorithm::FirstApplicable(alg) => alg.id(),
            PolicyCombiningAlgorithm::OnlyOneApplicable(alg) => alg.id(),
        }
    }

    fn evaluate(
        &self,
        request: &Request,
        children: Option<&[Option<PolicyRef>]>,
        ctx: &mut EvaluationContext<'_>,
    ) -> Decision {
        let decision = match self {
            PolicyCombiningAlgorithm::DenyOverrides(alg) => alg.evaluate(request, children, ctx),
            PolicyCombiningAlgorithm::PermitOverrides(alg) => alg.evaluate(request, children, ctx),
            PolicyCombiningAlgorithm::FirstApplicable(alg) => alg.evaluate(request, children, ctx),
            PolicyCombiningAlgorithm::OnlyOneApplicable(alg) => {
                alg.evaluate(request, children, ctx)
            }
        };
        tracing::debug!(
            algorithm = self.id(),
            decision = %decision,
            status = %ctx.status_code(),
            "Policies combined"
        );
        decision
    }
}

/// Evaluate one child of a policy set.
///
/// Leaves `ctx.is_target_matched()` telling whether the child's target
/// matched. A child without a combining algorithm is a contract violation
/// and is returned as an error for the calling fold to report.
pub(crate) fn evaluate_child(
    child: &PolicyTreeNode,
    request: &Request,
    matchers: &Matchers,
    ctx: &mut EvaluationContext<'_>,
) -> crate::Result<Decision> {
    let algorithms = ctx.algorithms();
    let decision = match child {
        PolicyTreeNode::Reference(reference) => {
            return evaluate_reference(reference, request, matchers, ctx)
        }
        PolicyTreeNode::Policy(policy) => {
            if let Some(decision) = screen(policy.target.as_ref(), request, matchers, ctx) {
                return Ok(decision);
            }
            let algorithm = policy
                .combining_algorithm
                .and_then(|id| algorithms.rule(id))
                .ok_or_else(|| {
                    crate::Error::illegal_state(format!(
                        "policy {} has no combining algorithm",
                        policy.id
                    ))
                })?;
            algorithm.evaluate(request, policy.rules.as_deref(), ctx)
        }
        PolicyTreeNode::PolicySet(set) => {
            if let Some(decision) = screen(set.target.as_ref(), request, matchers, ctx) {
                return Ok(decision);
            }
            let algorithm = set
                .combining_algorithm
                .and_then(|id| algorithms.policy(id))
                .ok_or_else(|| {
                    crate::Error::illegal_state(format!(
                        "policy set {} has no combining algorithm",
                        set.id
                    ))
                })?;
            algorithm.evaluate(request, set.children.as_deref(), ctx)
        }
    };

    // Nested folds overwrite the flag with their own children's outcome.
    ctx.set_target_matched(true);
    tracing::trace!(
        evaluatable = child.id(),
        kind = child.kind(),
        decision = %decision,
        "Child evaluated"
    );
    Ok(decision)
}

/// Match a child's target. Returns the child's decision when it does not
/// apply.
fn screen(
    target: Option<&Target>,
    request: &Request,
    matchers: &Matchers,
    ctx: &mut EvaluationContext<'_>,
) -> Option<Decision> {
    let outcome = match target {
        Some(target) => matchers.target.match_target(target, request, ctx),
        None => MatchResult::Match,
    };
    match outcome {
        MatchResult::Match => None,
        MatchResult::NoMatch => {
            ctx.set_target_matched(false);
            Some(Decision::NotApplicable)
        }
        MatchResult::Indeterminate => {
            ctx.set_target_matched(false);
            Some(Decision::Indeterminate)
        }
    }
}

/// Resolve a reference through the evaluatable index and evaluate the target
/// node in its place.
fn evaluate_reference(
    reference: &PolicyReference,
    request: &Request,
    matchers: &Matchers,
    ctx: &mut EvaluationContext<'_>,
) -> crate::Result<Decision> {
    let resolved = ctx.evaluatable_index().and_then(|index| index.resolve(&reference.id));
    let resolved = match resolved {
        Some(node) => node,
        None => {
            tracing::warn!(reference = %reference.id, "Unresolvable policy reference");
            return Ok(reference_fault(ctx));
        }
    };

    if !ctx.enter_reference() {
        tracing::warn!(reference = %reference.id, "Policy reference nesting too deep");
        return Ok(reference_fault(ctx));
    }
    let outcome = evaluate_child(&resolved, request, matchers, ctx);
    ctx.leave_reference();

    let decision = outcome?;
    if let Some(effect) = decision.effect() {
        ctx.add_obligations(resolved.obligations().iter().cloned(), effect);
    }
    Ok(decision)
}

fn reference_fault(ctx: &mut EvaluationContext<'_>) -> Decision {
    ctx.set_target_matched(false);
    ctx.clear_obligations();
    ctx.update_status_code(StatusCode::ProcessingError);
    Decision::Indeterminate
}
