//! Rule definitions.

use super::{Condition, Effect, Evaluatable, Obligation, Target};
use serde::{Deserialize, Serialize};

/// A rule within a policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    /// Unique identifier for the rule within the policy
    pub id: String,
    /// Optional description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Effect produced when target and condition hold
    pub effect: Effect,
    /// Applicability predicate; absent means always applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    /// Condition guarding the effect
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<Condition>,
    /// Obligations surfaced with the effect
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obligations: Vec<Obligation>,
}

impl Rule {
    /// Create a rule with the given effect and no target or condition.
    pub fn new(id: impl Into<String>, effect: Effect) -> Self {
        Self {
            id: id.into(),
            description: None,
            effect,
            target: None,
            condition: None,
            obligations: Vec::new(),
        }
    }

    /// Create a permit rule.
    pub fn permit(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Permit)
    }

    /// Create a deny rule.
    pub fn deny(id: impl Into<String>) -> Self {
        Self::new(id, Effect::Deny)
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Set the target.
    pub fn with_target(mut self, target: impl Into<Target>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Set the condition.
    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Add an obligation.
    pub fn with_obligation(mut self, obligation: Obligation) -> Self {
        self.obligations.push(obligation);
        self
    }

    /// Validate the rule.
    pub fn validate(&self) -> crate::Result<()> {
        if self.id.is_empty() {
            return Err(crate::Error::validation_field("Rule ID cannot be empty", "id"));
        }

        if let Some(target) = &self.target {
            target.condition.validate()?;
        }
        if let Some(condition) = &self.condition {
            condition.validate()?;
        }

        Ok(())
    }
}

impl Evaluatable for Rule {
    fn id(&self) -> &str {
        &self.id
    }

    fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    fn obligations(&self) -> &[Obligation] {
        &self.obligations
    }
}
