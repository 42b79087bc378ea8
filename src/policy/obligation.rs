//! Obligation definitions.

use super::Effect;
use serde::{Deserialize, Serialize};

/// An action directive attached to a Permit or Deny outcome.
///
/// An obligation only reaches the caller when the final combined decision
/// equals its `fulfill_on` effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obligation {
    /// Obligation identifier
    pub id: String,
    /// Effect the obligation is surfaced on
    pub fulfill_on: Effect,
    /// Attribute assignments handed to the enforcement point
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub assignments: Vec<AttributeAssignment>,
}

impl Obligation {
    /// Create an obligation surfaced on Permit.
    pub fn on_permit(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fulfill_on: Effect::Permit,
            assignments: Vec::new(),
        }
    }

    /// Create an obligation surfaced on Deny.
    pub fn on_deny(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fulfill_on: Effect::Deny,
            assignments: Vec::new(),
        }
    }

    /// Add an attribute assignment.
    pub fn with_assignment(
        mut self,
        attribute_id: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.assignments.push(AttributeAssignment {
            attribute_id: attribute_id.into(),
            value,
        });
        self
    }

    /// Check if the obligation applies to the given effect.
    pub fn applies_to(&self, effect: Effect) -> bool {
        self.fulfill_on == effect
    }
}

/// An opaque attribute assignment carried by an obligation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeAssignment {
    /// Attribute identifier
    pub attribute_id: String,
    /// Assigned value
    pub value: serde_json::Value,
}
