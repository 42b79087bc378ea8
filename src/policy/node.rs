//! The evaluatable contract and the policy tree node type.

use super::{Obligation, Policy, PolicySet, Target};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A node of the policy tree: a rule, a policy or a policy set.
pub trait Evaluatable {
    /// Identifier of the evaluatable.
    fn id(&self) -> &str;

    /// Applicability predicate, if any.
    fn target(&self) -> Option<&Target>;

    /// Obligations declared directly on this evaluatable.
    fn obligations(&self) -> &[Obligation];

    /// Whether this evaluatable or anything beneath it declares an obligation.
    ///
    /// Combining algorithms that keep visiting children after the decision is
    /// settled use this to skip children that cannot contribute obligations.
    fn carries_obligations(&self) -> bool {
        !self.obligations().is_empty()
    }
}

/// Shared handle to a policy tree node.
pub type PolicyRef = Arc<PolicyTreeNode>;

/// A child of a policy set, or a top-level candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PolicyTreeNode {
    /// A policy
    Policy(Policy),
    /// A policy set
    PolicySet(PolicySet),
    /// A reference to a top-level policy or policy set
    Reference(PolicyReference),
}

/// Refers to a top-level evaluatable by id; resolved at evaluation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyReference {
    /// Identifier of the referenced evaluatable
    pub id: String,
}

impl PolicyReference {
    /// Create a reference.
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

impl PolicyTreeNode {
    /// Short name of the node kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            PolicyTreeNode::Policy(_) => "policy",
            PolicyTreeNode::PolicySet(_) => "policySet",
            PolicyTreeNode::Reference(_) => "reference",
        }
    }

    /// URN of the node's combining algorithm, if it has one.
    pub fn combining_algorithm_urn(&self) -> Option<&'static str> {
        match self {
            PolicyTreeNode::Policy(p) => p.combining_algorithm.map(|id| id.urn()),
            PolicyTreeNode::PolicySet(s) => s.combining_algorithm.map(|id| id.urn()),
            PolicyTreeNode::Reference(_) => None,
        }
    }

    /// Whether the node is offered as a candidate.
    pub fn is_enabled(&self) -> bool {
        match self {
            PolicyTreeNode::Policy(p) => p.enabled,
            PolicyTreeNode::PolicySet(s) => s.enabled,
            PolicyTreeNode::Reference(_) => true,
        }
    }

    /// Candidate priority.
    pub fn priority(&self) -> i32 {
        match self {
            PolicyTreeNode::Policy(p) => p.priority,
            PolicyTreeNode::PolicySet(s) => s.priority,
            PolicyTreeNode::Reference(_) => 0,
        }
    }

    /// Structural defects that make the node evaluate to Indeterminate.
    pub fn defects(&self) -> Vec<String> {
        match self {
            PolicyTreeNode::Policy(p) => p.defects(),
            PolicyTreeNode::PolicySet(s) => s.defects(),
            PolicyTreeNode::Reference(_) => Vec::new(),
        }
    }

    /// Validate the node.
    pub fn validate(&self) -> crate::Result<()> {
        match self {
            PolicyTreeNode::Policy(p) => p.validate(),
            PolicyTreeNode::PolicySet(s) => s.validate(),
            PolicyTreeNode::Reference(r) if r.id.is_empty() => Err(
                crate::Error::validation_field("Reference ID cannot be empty", "id"),
            ),
            PolicyTreeNode::Reference(_) => Ok(()),
        }
    }
}

impl Evaluatable for PolicyTreeNode {
    fn id(&self) -> &str {
        match self {
            PolicyTreeNode::Policy(p) => &p.id,
            PolicyTreeNode::PolicySet(s) => &s.id,
            PolicyTreeNode::Reference(r) => &r.id,
        }
    }

    fn target(&self) -> Option<&Target> {
        match self {
            PolicyTreeNode::Policy(p) => p.target(),
            PolicyTreeNode::PolicySet(s) => s.target(),
            PolicyTreeNode::Reference(_) => None,
        }
    }

    fn obligations(&self) -> &[Obligation] {
        match self {
            PolicyTreeNode::Policy(p) => p.obligations(),
            PolicyTreeNode::PolicySet(s) => s.obligations(),
            PolicyTreeNode::Reference(_) => &[],
        }
    }

    fn carries_obligations(&self) -> bool {
        match self {
            PolicyTreeNode::Policy(p) => p.carries_obligations(),
            PolicyTreeNode::PolicySet(s) => s.carries_obligations(),
            // The referenced tree is unknown until evaluation.
            PolicyTreeNode::Reference(_) => true,
        }
    }
}

impl From<Policy> for PolicyTreeNode {
    fn from(policy: Policy) -> Self {
        PolicyTreeNode::Policy(policy)
    }
}

impl From<PolicySet> for PolicyTreeNode {
    fn from(set: PolicySet) -> Self {
        PolicyTreeNode::PolicySet(set)
    }
}

impl From<PolicyReference> for PolicyTreeNode {
    fn from(reference: PolicyReference) -> Self {
        PolicyTreeNode::Reference(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combining::{PolicyCombiningAlgId, RuleCombiningAlgId};
    use crate::policy::Rule;

    #[test]
    fn test_node_delegation() {
        let node = PolicyTreeNode::from(
            Policy::builder("p1")
                .combining_algorithm(RuleCombiningAlgId::PermitOverrides)
                .rule(Rule::permit("r"))
                .priority(3)
                .build(),
        );

        assert_eq!(node.id(), "p1");
        assert_eq!(node.kind(), "policy");
        assert_eq!(node.priority(), 3);
        assert_eq!(
            node.combining_algorithm_urn(),
            Some("urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:permit-overrides")
        );
        assert!(!node.carries_obligations());
    }

    #[test]
    fn test_reference_is_conservative() {
        let node = PolicyTreeNode::from(PolicyReference::new("shared"));
        assert!(node.carries_obligations());
        assert!(node.target().is_none());
        assert!(node.defects().is_empty());
    }

    #[test]
    fn test_tagged_yaml() {
        let yaml = r#"
kind: policySet
id: root
combiningAlgorithm: urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable
children:
  - kind: reference
    id: shared
  - ~
"#;
        let node: PolicyTreeNode = serde_yaml::from_str(yaml).unwrap();
        match node {
            PolicyTreeNode::PolicySet(set) => {
                assert_eq!(set.combining_algorithm, Some(PolicyCombiningAlgId::OnlyOneApplicable));
                let children = set.children.unwrap();
                assert_eq!(children.len(), 2);
                assert!(children[1].is_none());
            }
            other => panic!("unexpected node: {:?}", other),
        }
    }
}
