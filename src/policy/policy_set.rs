//! Policy set definitions.

use super::{Evaluatable, Obligation, PolicyRef, PolicyTreeNode, Target};
use crate::combining::PolicyCombiningAlgId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A policy set: a target, a policy combining algorithm and child evaluatables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySet {
    /// Unique identifier for the policy set
    pub id: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Applicability predicate; absent means always applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    /// Algorithm folding the child decisions
    #[serde(default)]
    pub combining_algorithm: Option<PolicyCombiningAlgId>,
    /// Child policies and policy sets in evaluation order
    #[serde(default)]
    pub children: Option<Vec<Option<PolicyRef>>>,
    /// Obligations surfaced with the policy set's decision
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
    /// Whether this policy set is offered as a candidate
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Candidate priority (higher = evaluated first)
    #[serde(default)]
    pub priority: i32,
}

fn default_enabled() -> bool {
    true
}

impl PolicySet {
    /// Create a policy set builder.
    pub fn builder(id: impl Into<String>) -> PolicySetBuilder {
        PolicySetBuilder::new(id)
    }

    /// The children that are actually present.
    pub fn present_children(&self) -> impl Iterator<Item = &PolicyRef> {
        self.children.iter().flatten().flatten()
    }

    /// Structural defects of this set and its descendants.
    pub fn defects(&self) -> Vec<String> {
        let mut defects = Vec::new();
        if self.combining_algorithm.is_none() {
            defects.push(format!("policy set {} has no combining algorithm", self.id));
        }
        match &self.children {
            None => defects.push(format!("policy set {} has no child list", self.id)),
            Some(children) => {
                for (position, child) in children.iter().enumerate() {
                    match child {
                        Some(child) => defects.extend(child.defects()),
                        None => defects.push(format!(
                            "policy set {} has an empty child slot at {}",
                            self.id, position
                        )),
                    }
                }
            }
        }
        defects
    }

    /// Check if the policy set is valid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.id.is_empty() {
            return Err(crate::Error::validation_field(
                "Policy set ID cannot be empty",
                "id",
            ));
        }

        if let Some(target) = &self.target {
            target.condition.validate()?;
        }

        for child in self.present_children() {
            child.validate()?;
        }

        Ok(())
    }
}

impl Evaluatable for PolicySet {
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
        !self.obligations.is_empty() || self.present_children().any(|c| c.carries_obligations())
    }
}

/// Builder for creating policy sets.
#[derive(Debug, Default)]
pub struct PolicySetBuilder {
    id: String,
    description: Option<String>,
    target: Option<Target>,
    combining_algorithm: Option<PolicyCombiningAlgId>,
    children: Vec<Option<PolicyRef>>,
    obligations: Vec<Obligation>,
    enabled: bool,
    priority: i32,
}

impl PolicySetBuilder {
    /// Create a new policy set builder with the given ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            enabled: true,
            ..Default::default()
        }
    }

    /// Set the description.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the target.
    pub fn target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the policy combining algorithm.
    pub fn combining_algorithm(mut self, id: PolicyCombiningAlgId) -> Self {
        self.combining_algorithm = Some(id);
        self
    }

    /// Add a child policy, policy set or reference.
    pub fn child(mut self, child: impl Into<PolicyTreeNode>) -> Self {
        self.children.push(Some(Arc::new(child.into())));
        self
    }

    /// Add a child slot that may be empty.
    pub fn child_slot(mut self, child: Option<PolicyRef>) -> Self {
        self.children.push(child);
        self
    }

    /// Add an obligation.
    pub fn obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Set whether the policy set is enabled.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the priority.
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Build the policy set.
    pub fn build(self) -> PolicySet {
        PolicySet {
            id: self.id,
            description: self.description,
            target: self.target,
            combining_algorithm: self.combining_algorithm,
            children: Some(self.children),
            obligations: self.obligations,
            enabled: self.enabled,
            priority: self.priority,
        }
    }
}
