//! Policy tree data structures.
//!
//! This module defines the evaluatables a decision is computed from: rules,
//! policies and policy sets, together with the value types shared by every
//! combining algorithm (decisions, status codes, obligations).

mod condition;
mod decision;
mod document;
mod node;
mod obligation;
mod policy_set;
mod rule;
mod status;

pub use condition::{AttributeDesignator, Condition, ConditionOperator, ConditionValue, Target};
pub use decision::{Decision, Effect};
pub use document::PolicyDocument;
pub use node::{Evaluatable, PolicyRef, PolicyReference, PolicyTreeNode};
pub use obligation::{AttributeAssignment, Obligation};
pub use policy_set::{PolicySet, PolicySetBuilder};
pub use rule::Rule;
pub use status::{MissingAttributeDetail, StatusCode};

use crate::combining::RuleCombiningAlgId;
use serde::{Deserialize, Serialize};

/// A policy: a target, a rule combining algorithm and a list of rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Unique identifier for the policy
    pub id: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Policy version
    #[serde(default = "default_version")]
    pub version: String,
    /// Applicability predicate; absent means always applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    /// Algorithm folding the rule decisions
    #[serde(default)]
    pub combining_algorithm: Option<RuleCombiningAlgId>,
    /// Rules in evaluation order. Empty slots are kept so that the combining
    /// algorithm can report them.
    #[serde(default)]
    pub rules: Option<Vec<Option<Rule>>>,
    /// Obligations surfaced with the policy's decision
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
    /// Whether this policy is offered as a candidate
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Candidate priority (higher = evaluated first)
    #[serde(default)]
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Policy {
    /// Create a new policy with the given ID and combining algorithm.
    pub fn new(id: impl Into<String>, combining_algorithm: RuleCombiningAlgId) -> Self {
        Self {
            id: id.into(),
            description: None,
            version: default_version(),
            target: None,
            combining_algorithm: Some(combining_algorithm),
            rules: Some(Vec::new()),
            obligations: Vec::new(),
            enabled: true,
            priority: 0,
        }
    }

    /// Create a policy builder.
    pub fn builder(id: impl Into<String>) -> PolicyBuilder {
        PolicyBuilder::new(id)
    }

    /// Add a rule to this policy.
    pub fn add_rule(&mut self, rule: Rule) {
        self.rules.get_or_insert_with(Vec::new).push(Some(rule));
    }

    /// The rules that are actually present.
    pub fn present_rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().flatten().flatten()
    }

    /// Structural defects that make the policy evaluate to Indeterminate.
    pub fn defects(&self) -> Vec<String> {
        let mut defects = Vec::new();
        if self.combining_algorithm.is_none() {
            defects.push(format!("policy {} has no combining algorithm", self.id));
        }
        match &self.rules {
            None => defects.push(format!("policy {} has no rule list", self.id)),
            Some(rules) => {
                for (position, _) in rules.iter().enumerate().filter(|(_, r)| r.is_none()) {
                    defects.push(format!(
                        "policy {} has an empty rule slot at {}",
                        self.id, position
                    ));
                }
            }
        }
        defects
    }

    /// Check if the policy is valid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.id.is_empty() {
            return Err(crate::Error::validation_field("Policy ID cannot be empty", "id"));
        }

        if let Some(target) = &self.target {
            target.condition.validate()?;
        }

        for (i, rule) in self.present_rules().enumerate() {
            rule.validate().map_err(|e| {
                crate::Error::validation(format!("Rule {} validation failed: {}", i, e))
            })?;
        }

        Ok(())
    }
}

impl Evaluatable for Policy {
    fn id(&self) -> &str {
        &self.id
    }

    fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }

    fn carries_obligations(&self) -> bool {
        !self.obligations.is_empty() || self.present_rules().any(|r| r.carries_obligations())
    }
}

/// Builder for creating policies.
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    id: String,
    description: Option<String>,
    version: Option<String>,
    target: Option<Target>,
    combining_algorithm: Option<RuleCombiningAlgId>,
    rules: Vec<Option<Rule>>,
    obligations: Vec<Obligation>,
    enabled: bool,
    priority: i32,
}

impl PolicyBuilder {
    /// Create a new policy builder with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            ..Default::default()
        }
    }

    /// Set the policy description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the policy version.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Set the policy target.
    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the rule combining algorithm.
    pub fn combining_algorithm(mut self, id: RuleCombiningAlgId) -> Self {
        self.combining_algorithm = Some(id);
        self
    }

    /// Add a rule to the policy.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(Some(rule));
        self
    }

    /// Add a rule slot that may be empty.
    pub fn rule_slot(mut self, rule: Option<Rule>) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add an obligation.
    pub fn obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Set whether the policy is enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the policy priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Build the policy.
    pub fn build(self) -> Policy {
        Policy {
            id: self.id,
            description: self.description,
            version: self.version.unwrap_or_else(default_version),
            target: self.target,
            combining_algorithm: self.combining_algorithm,
            rules: Some(self.rules),
            obligations: self.obligations,
            enabled: self.enabled,
            priority: self.priority,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_creation() {
        let policy = Policy::new("test-policy", RuleCombiningAlgId::DenyOverrides);
        assert_eq!(policy.id, "test-policy");
        assert!(policy.enabled);
        assert!(policy.defects().is_empty());
    }

    #[test]
    fn test_add_rule_creates_list() {
        let mut policy = Policy::builder("p")
            .combining_algorithm(RuleCombiningAlgId::FirstApplicable)
            .build();
        policy.rules = None;

        policy.add_rule(Rule::deny("r1"));
        policy.add_rule(Rule::permit("r2"));
        let ids: Vec<&str> = policy.present_rules().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1", "r2"]);
    }

    #[test]
    fn test_policy_builder() {
        let policy = Policy::builder("test-policy")
            .description("A test policy")
            .version("2.1")
            .combining_algorithm(RuleCombiningAlgId::FirstApplicable)
            .rule(Rule::permit("r1"))
            .obligation(Obligation::on_permit("audit"))
            .priority(10)
            .build();

        assert_eq!(policy.description, Some("A test policy".to_string()));
        assert_eq!(policy.version, "2.1");
        assert_eq!(policy.present_rules().count(), 1);
        assert_eq!(policy.priority, 10);
        assert!(policy.carries_obligations());
    }

    #[test]
    fn test_policy_defects() {
        let policy = Policy::builder("broken")
            .rule(Rule::permit("r1"))
            .rule_slot(None)
            .build();

        let defects = policy.defects();
        assert_eq!(defects.len(), 2);
        assert!(defects[1].contains("empty rule slot at 1"));
    }

    #[test]
    fn test_policy_validation() {
        let policy = Policy::new("test", RuleCombiningAlgId::PermitOverrides);
        assert!(policy.validate().is_ok());

        let invalid_policy = Policy::new("", RuleCombiningAlgId::PermitOverrides);
        assert!(invalid_policy.validate().is_err());
    }

    #[test]
    fn test_obligations_found_in_rules() {
        let policy = Policy::builder("p")
            .combining_algorithm(RuleCombiningAlgId::DenyOverrides)
            .rule(Rule::deny("r").with_obligation(Obligation::on_deny("log")))
            .build();
        assert!(policy.obligations.is_empty());
        assert!(policy.carries_obligations());
    }
}
