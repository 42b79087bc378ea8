//! Decision and effect types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The outcome of evaluating an evaluatable against a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// Access is granted
    Permit,
    /// Access is refused
    Deny,
    /// Nothing applied to the request
    NotApplicable,
    /// Evaluation failed; see the accompanying status
    Indeterminate,
}

impl Decision {
    /// The effect this decision carries, if it is Permit or Deny.
    pub fn effect(&self) -> Option<Effect> {
        match self {
            Decision::Permit => Some(Effect::Permit),
            Decision::Deny => Some(Effect::Deny),
            Decision::NotApplicable | Decision::Indeterminate => None,
        }
    }

    /// Check if this decision grants access.
    pub fn is_permit(&self) -> bool {
        matches!(self, Decision::Permit)
    }

    /// Check if this decision refuses access.
    pub fn is_deny(&self) -> bool {
        matches!(self, Decision::Deny)
    }

    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::Permit => "Permit",
            Decision::Deny => "Deny",
            Decision::NotApplicable => "NotApplicable",
            Decision::Indeterminate => "Indeterminate",
        }
    }
}

impl Default for Decision {
    fn default() -> Self {
        Decision::NotApplicable
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Decision {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "permit" => Ok(Decision::Permit),
            "deny" => Ok(Decision::Deny),
            "notapplicable" | "not_applicable" => Ok(Decision::NotApplicable),
            "indeterminate" => Ok(Decision::Indeterminate),
            _ => Err(crate::Error::parse(format!("Unknown decision: {}", s))),
        }
    }
}

impl From<Effect> for Decision {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Permit => Decision::Permit,
            Effect::Deny => Decision::Deny,
        }
    }
}

/// The effect a rule produces, or the decision an obligation is tied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    /// Grant
    Permit,
    /// Refuse
    Deny,
}

impl Effect {
    /// Get the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Permit => "Permit",
            Effect::Deny => "Deny",
        }
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
