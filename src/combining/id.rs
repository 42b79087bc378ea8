//! Combining algorithm identifiers.
//!
//! Identifiers serialize as their XACML URNs, which is how policy documents
//! name the algorithm governing a policy or policy set.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a rule combining algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RuleCombiningAlgId {
    /// Any Deny wins
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides")]
    DenyOverrides,
    /// Any Permit wins
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:permit-overrides")]
    PermitOverrides,
    /// The first applicable rule wins
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable")]
    FirstApplicable,
    /// Deny-overrides over rules kept in document order
    #[serde(rename = "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:ordered-deny-overrides")]
    OrderedDenyOverrides,
    /// Permit-overrides over rules kept in document order
    #[serde(rename = "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:ordered-permit-overrides")]
    OrderedPermitOverrides,
}

impl RuleCombiningAlgId {
    /// Every rule combining algorithm.
    pub const ALL: [RuleCombiningAlgId; 5] = [
        RuleCombiningAlgId::DenyOverrides,
        RuleCombiningAlgId::PermitOverrides,
        RuleCombiningAlgId::FirstApplicable,
        RuleCombiningAlgId::OrderedDenyOverrides,
        RuleCombiningAlgId::OrderedPermitOverrides,
    ];

    /// The XACML URN.
    pub fn urn(&self) -> &'static str {
        match self {
            RuleCombiningAlgId::DenyOverrides => {
                "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:deny-overrides"
            }
            RuleCombiningAlgId::PermitOverrides => {
                "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:permit-overrides"
            }
            RuleCombiningAlgId::FirstApplicable => {
                "urn:oasis:names:tc:xacml:1.0:rule-combining-algorithm:first-applicable"
            }
            RuleCombiningAlgId::OrderedDenyOverrides => {
                "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:ordered-deny-overrides"
            }
            RuleCombiningAlgId::OrderedPermitOverrides => {
                "urn:oasis:names:tc:xacml:1.1:rule-combining-algorithm:ordered-permit-overrides"
            }
        }
    }

    /// Whether the algorithm requires the caller to keep rules in order.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            RuleCombiningAlgId::OrderedDenyOverrides | RuleCombiningAlgId::OrderedPermitOverrides
        )
    }
}

impl fmt::Display for RuleCombiningAlgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn())
    }
}

impl std::str::FromStr for RuleCombiningAlgId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.urn() == s)
            .ok_or_else(|| crate::Error::parse(format!("Unknown rule combining algorithm: {}", s)))
    }
}

/// Identifies a policy combining algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PolicyCombiningAlgId {
    /// Any Deny wins
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:deny-overrides")]
    DenyOverrides,
    /// Any Permit wins
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:permit-overrides")]
    PermitOverrides,
    /// The first applicable child wins
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:first-applicable")]
    FirstApplicable,
    /// Exactly one child may apply
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable")]
    OnlyOneApplicable,
    /// Deny-overrides over children kept in document order
    #[serde(rename = "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:ordered-deny-overrides")]
    OrderedDenyOverrides,
    /// Permit-overrides over children kept in document order
    #[serde(rename = "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:ordered-permit-overrides")]
    OrderedPermitOverrides,
}

impl PolicyCombiningAlgId {
    /// Every policy combining algorithm.
    pub const ALL: [PolicyCombiningAlgId; 6] = [
        PolicyCombiningAlgId::DenyOverrides,
        PolicyCombiningAlgId::PermitOverrides,
        PolicyCombiningAlgId::FirstApplicable,
        PolicyCombiningAlgId::OnlyOneApplicable,
        PolicyCombiningAlgId::OrderedDenyOverrides,
        PolicyCombiningAlgId::OrderedPermitOverrides,
    ];

    /// The XACML URN.
    pub fn urn(&self) -> &'static str {
        match self {
            PolicyCombiningAlgId::DenyOverrides => {
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:deny-overrides"
            }
            PolicyCombiningAlgId::PermitOverrides => {
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:permit-overrides"
            }
            PolicyCombiningAlgId::FirstApplicable => {
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:first-applicable"
            }
            PolicyCombiningAlgId::OnlyOneApplicable => {
                "urn:oasis:names:tc:xacml:1.0:policy-combining-algorithm:only-one-applicable"
            }
            PolicyCombiningAlgId::OrderedDenyOverrides => {
                "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:ordered-deny-overrides"
            }
            PolicyCombiningAlgId::OrderedPermitOverrides => {
                "urn:oasis:names:tc:xacml:1.1:policy-combining-algorithm:ordered-permit-overrides"
            }
        }
    }

    /// Whether the algorithm requires the caller to keep children in order.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            PolicyCombiningAlgId::OrderedDenyOverrides
                | PolicyCombiningAlgId::OrderedPermitOverrides
        )
    }
}

impl Default for PolicyCombiningAlgId {
    fn default() -> Self {
        PolicyCombiningAlgId::DenyOverrides
    }
}

impl fmt::Display for PolicyCombiningAlgId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn())
    }
}

impl std::str::FromStr for PolicyCombiningAlgId {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|id| id.urn() == s)
            .ok_or_else(|| {
                crate::Error::parse(format!("Unknown policy combining algorithm: {}", s))
            })
    }
}
