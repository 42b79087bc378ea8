//! Combining algorithms.
//!
//! A combining algorithm folds the decisions of a list of children (rules of
//! a policy, or policies and policy sets of a policy set) into one decision.
//! Algorithm instances are immutable after construction and shared by every
//! request; all per-request state lives in the [`EvaluationContext`].
//!
//! Every algorithm follows the same per-child protocol: the context status is
//! reset before a child is evaluated, and when the child returns Permit or
//! Deny its obligations are buffered together with the decision that
//! produced them. The buffer is filtered once, against the final decision,
//! when the fold returns.

mod id;
pub mod policy;
pub mod rule;

pub use id::{PolicyCombiningAlgId, RuleCombiningAlgId};
pub use policy::PolicyCombiningAlgorithm;
pub use rule::RuleCombiningAlgorithm;

use crate::config::EngineConfig;
use crate::core::{EvaluationContext, Matchers};
use crate::policy::{Decision, MissingAttributeDetail, Obligation, StatusCode};
use crate::request::Request;

use std::collections::HashMap;

/// A strategy folding the decisions of a list of children into one.
pub trait CombiningAlgorithm {
    /// The kind of child the algorithm combines.
    type Child;

    /// URN identifying the algorithm.
    fn id(&self) -> &'static str;

    /// Evaluate `children` against `request`.
    ///
    /// An absent list, or an empty slot anywhere in it, is a contract
    /// violation by whoever built the list: it is logged and answered with
    /// Indeterminate and a SyntaxError status. Faults inside a child never
    /// escape as errors; they surface as Indeterminate with the status and
    /// missing attributes left on `ctx`.
    fn evaluate(
        &self,
        request: &Request,
        children: Option<&[Option<Self::Child>]>,
        ctx: &mut EvaluationContext<'_>,
    ) -> Decision;
}

/// Lookup table of configured combining algorithms for both families.
///
/// Built once at startup and passed by reference to whatever needs to
/// resolve an algorithm identifier.
#[derive(Debug, Clone)]
pub struct CombiningAlgorithms {
    rules: HashMap<RuleCombiningAlgId, RuleCombiningAlgorithm>,
    policies: HashMap<PolicyCombiningAlgId, PolicyCombiningAlgorithm>,
}

impl CombiningAlgorithms {
    /// Build every algorithm with the given matchers and engine settings.
    pub fn new(matchers: Matchers, config: &EngineConfig) -> Self {
        let rules = RuleCombiningAlgId::ALL
            .into_iter()
            .map(|id| (id, RuleCombiningAlgorithm::new(id, matchers.clone())))
            .collect();

        let policies = PolicyCombiningAlgId::ALL
            .into_iter()
            .map(|id| {
                (
                    id,
                    PolicyCombiningAlgorithm::new(
                        id,
                        matchers.clone(),
                        config.respect_abandoned_evaluatables,
                    ),
                )
            })
            .collect();

        Self { rules, policies }
    }

    /// Look up a rule combining algorithm.
    pub fn rule(&self, id: RuleCombiningAlgId) -> Option<&RuleCombiningAlgorithm> {
        self.rules.get(&id)
    }

    /// Look up a policy combining algorithm.
    pub fn policy(&self, id: PolicyCombiningAlgId) -> Option<&PolicyCombiningAlgorithm> {
        self.policies.get(&id)
    }

    /// Look up a rule combining algorithm by URN.
    pub fn rule_by_urn(&self, urn: &str) -> Option<&RuleCombiningAlgorithm> {
        urn.parse().ok().and_then(|id| self.rule(id))
    }

    /// Look up a policy combining algorithm by URN.
    pub fn policy_by_urn(&self, urn: &str) -> Option<&PolicyCombiningAlgorithm> {
        urn.parse().ok().and_then(|id| self.policy(id))
    }
}

impl Default for CombiningAlgorithms {
    fn default() -> Self {
        Self::new(Matchers::default(), &EngineConfig::default())
    }
}

/// Check the child list and borrow its entries.
pub(crate) fn require_children<C>(children: Option<&[Option<C>]>) -> crate::Result<Vec<&C>> {
    let children =
        children.ok_or_else(|| crate::Error::illegal_state("child list is absent"))?;

    children
        .iter()
        .enumerate()
        .map(|(position, child)| {
            child.as_ref().ok_or_else(|| {
                crate::Error::illegal_state(format!(
                    "empty slot at position {} of the child list",
                    position
                ))
            })
        })
        .collect()
}

/// Answer a contract violation with Indeterminate.
pub(crate) fn illegal_state(
    ctx: &mut EvaluationContext<'_>,
    algorithm: &str,
    err: &crate::Error,
) -> Decision {
    tracing::error!(algorithm, error = %err, "Combining algorithm given ill-formed input");
    ctx.clear_obligations();
    ctx.reset_status();
    ctx.update_status_code(err.status_code());
    Decision::Indeterminate
}

/// Obligations collected during a fold, tagged with the decision that
/// produced them.
#[derive(Debug, Default)]
pub(crate) struct ObligationBuffer {
    entries: Vec<(Obligation, Decision)>,
}

impl ObligationBuffer {
    /// Collect the obligations of a child that just returned `decision`.
    ///
    /// Takes the child's declared obligations for that effect and whatever
    /// its own evaluation left on the context. The context is always left
    /// without obligations.
    pub(crate) fn harvest(
        &mut self,
        declared: &[Obligation],
        decision: Decision,
        ctx: &mut EvaluationContext<'_>,
    ) {
        let produced = ctx.take_obligations();
        if let Some(effect) = decision.effect() {
            self.entries.extend(
                declared
                    .iter()
                    .filter(|o| o.applies_to(effect))
                    .cloned()
                    .chain(produced)
                    .map(|o| (o, decision)),
            );
        }
    }

    /// End the fold with a Permit, Deny or NotApplicable decision.
    ///
    /// Status is reset to Ok and only obligations produced by a child with
    /// the same decision reach the caller.
    pub(crate) fn finish(self, decision: Decision, ctx: &mut EvaluationContext<'_>) -> Decision {
        ctx.reset_status();
        ctx.clear_obligations();
        if let Some(effect) = decision.effect() {
            ctx.add_obligations(
                self.entries
                    .into_iter()
                    .filter(|(_, produced_by)| *produced_by == decision)
                    .map(|(obligation, _)| obligation),
                effect,
            );
        }
        decision
    }
}

/// Status codes and missing attributes of the children that returned
/// Indeterminate.
#[derive(Debug, Default)]
pub(crate) struct Faults {
    codes: Vec<StatusCode>,
    missing: Vec<MissingAttributeDetail>,
}

impl Faults {
    /// Record the fault a child just left on the context.
    pub(crate) fn record(&mut self, ctx: &EvaluationContext<'_>) {
        if ctx.status_codes().is_empty() {
            self.codes.push(StatusCode::ProcessingError);
        } else {
            self.codes.extend_from_slice(ctx.status_codes());
        }
        for detail in ctx.missing_attributes() {
            if !self.missing.contains(detail) {
                self.missing.push(detail.clone());
            }
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// End the fold with Indeterminate, carrying every recorded fault.
    pub(crate) fn indeterminate(self, ctx: &mut EvaluationContext<'_>) -> Decision {
        ctx.clear_obligations();
        ctx.reset_status();
        ctx.update_status_codes(&self.codes);
        ctx.set_missing_attributes(self.missing);
        Decision::Indeterminate
    }
}
