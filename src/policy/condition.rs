//! Targets, conditions and attribute designators.

use crate::request::{data_type, Category};
use serde::{Deserialize, Serialize};

/// Selects a bag of attribute values from the request or an attribute finder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeDesignator {
    /// Category to look in
    pub category: Category,
    /// Attribute identifier
    pub attribute_id: String,
    /// Data type URI
    #[serde(default = "default_data_type")]
    pub data_type: String,
    /// Only accept values from this issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// An empty bag is an error instead of a non-match
    #[serde(default)]
    pub must_be_present: bool,
}

fn default_data_type() -> String {
    data_type::STRING.to_string()
}

impl AttributeDesignator {
    /// Create a designator.
    pub fn new(
        category: Category,
        attribute_id: impl Into<String>,
        data_type: impl Into<String>,
    ) -> Self {
        Self {
            category,
            attribute_id: attribute_id.into(),
            data_type: data_type.into(),
            issuer: None,
            must_be_present: false,
        }
    }

    /// Create a designator for a string attribute.
    pub fn string(category: Category, attribute_id: impl Into<String>) -> Self {
        Self::new(category, attribute_id, data_type::STRING)
    }

    /// Require values from the given issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Treat an empty bag as a missing attribute.
    pub fn required(mut self) -> Self {
        self.must_be_present = true;
        self
    }
}

/// The applicability predicate of a rule, policy or policy set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Target {
    /// Condition the request must satisfy
    pub condition: Condition,
}

impl Target {
    /// Create a target from a condition.
    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }
}

impl From<Condition> for Target {
    fn from(condition: Condition) -> Self {
        Target::new(condition)
    }
}

/// A condition that can be evaluated against a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// The operator to use for comparison
    pub operator: ConditionOperator,
    /// The attribute to evaluate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<AttributeDesignator>,
    /// The value to compare against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ConditionValue>,
    /// Nested conditions for logical operators (AND, OR, NOT)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Condition {
    /// Create a comparison condition.
    pub fn compare(
        operator: ConditionOperator,
        attribute: AttributeDesignator,
        value: impl Into<ConditionValue>,
    ) -> Self {
        Self {
            operator,
            attribute: Some(attribute),
            value: Some(value.into()),
            conditions: Vec::new(),
        }
    }

    /// Create a simple equality condition.
    pub fn equals(attribute: AttributeDesignator, value: impl Into<ConditionValue>) -> Self {
        Self::compare(ConditionOperator::Equals, attribute, value)
    }

    /// Create a "not equals" condition.
    pub fn not_equals(attribute: AttributeDesignator, value: impl Into<ConditionValue>) -> Self {
        Self::compare(ConditionOperator::NotEquals, attribute, value)
    }

    /// Create a "greater than" condition.
    pub fn greater_than(attribute: AttributeDesignator, value: impl Into<ConditionValue>) -> Self {
        Self::compare(ConditionOperator::GreaterThan, attribute, value)
    }

    /// Create a "less than" condition.
    pub fn less_than(attribute: AttributeDesignator, value: impl Into<ConditionValue>) -> Self {
        Self::compare(ConditionOperator::LessThan, attribute, value)
    }

    /// Create an "in" condition (value in list).
    pub fn is_in(attribute: AttributeDesignator, values: Vec<ConditionValue>) -> Self {
        Self::compare(ConditionOperator::In, attribute, ConditionValue::Array(values))
    }

    /// Create a "contains" condition.
    pub fn contains(attribute: AttributeDesignator, value: impl Into<ConditionValue>) -> Self {
        Self::compare(ConditionOperator::Contains, attribute, value)
    }

    /// Create an "exists" condition.
    pub fn exists(attribute: AttributeDesignator) -> Self {
        Self {
            operator: ConditionOperator::Exists,
            attribute: Some(attribute),
            value: None,
            conditions: Vec::new(),
        }
    }

    /// Create a regex match condition.
    pub fn matches(attribute: AttributeDesignator, pattern: impl Into<String>) -> Self {
        Self::compare(
            ConditionOperator::Matches,
            attribute,
            ConditionValue::String(pattern.into()),
        )
    }

    /// Create an AND condition combining multiple conditions.
    pub fn and(conditions: Vec<Condition>) -> Self {
        Self {
            operator: ConditionOperator::And,
            attribute: None,
            value: None,
            conditions,
        }
    }

    /// Create an OR condition combining multiple conditions.
    pub fn or(conditions: Vec<Condition>) -> Self {
        Self {
            operator: ConditionOperator::Or,
            attribute: None,
            value: None,
            conditions,
        }
    }

    /// Create a NOT condition negating another condition.
    pub fn not(condition: Condition) -> Self {
        Self {
            operator: ConditionOperator::Not,
            attribute: None,
            value: None,
            conditions: vec![condition],
        }
    }

    /// Validate the condition structure.
    pub fn validate(&self) -> crate::Result<()> {
        match self.operator {
            ConditionOperator::And | ConditionOperator::Or => {
                if self.conditions.is_empty() {
                    return Err(crate::Error::validation(format!(
                        "{:?} operator requires at least one nested condition",
                        self.operator
                    )));
                }
                for condition in &self.conditions {
                    condition.validate()?;
                }
            }
            ConditionOperator::Not => {
                if self.conditions.len() != 1 {
                    return Err(crate::Error::validation(
                        "NOT operator requires exactly one nested condition",
                    ));
                }
                self.conditions[0].validate()?;
            }
            ConditionOperator::Exists | ConditionOperator::NotExists => {
                if self.attribute.is_none() {
                    return Err(crate::Error::validation(format!(
                        "{:?} operator requires an attribute",
                        self.operator
                    )));
                }
            }
            _ => {
                if self.attribute.is_none() {
                    return Err(crate::Error::validation(format!(
                        "{:?} operator requires an attribute",
                        self.operator
                    )));
                }
                if self.value.is_none() {
                    return Err(crate::Error::validation(format!(
                        "{:?} operator requires a value",
                        self.operator
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Operators for condition evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionOperator {
    /// Equality check
    Equals,
    /// Inequality check
    NotEquals,
    /// Greater than comparison
    GreaterThan,
    /// Greater than or equal comparison
    GreaterThanOrEquals,
    /// Less than comparison
    LessThan,
    /// Less than or equal comparison
    LessThanOrEquals,
    /// Value is in a list
    In,
    /// Value is not in a list
    NotIn,
    /// String/array contains value
    Contains,
    /// String starts with value
    StartsWith,
    /// String ends with value
    EndsWith,
    /// Regex pattern match
    Matches,
    /// Attribute has at least one value
    Exists,
    /// Attribute has no value
    NotExists,
    /// Logical AND
    And,
    /// Logical OR
    Or,
    /// Logical NOT
    Not,
}

/// A value that can be used in conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ConditionValue {
    /// String value
    String(String),
    /// Integer value
    Integer(i64),
    /// Float value
    Float(f64),
    /// Boolean value
    Boolean(bool),
    /// Array of values
    Array(Vec<ConditionValue>),
    /// Null value
    Null,
}

impl From<&str> for ConditionValue {
    fn from(s: &str) -> Self {
        ConditionValue::String(s.to_string())
    }
}

impl From<String> for ConditionValue {
    fn from(s: String) -> Self {
        ConditionValue::String(s)
    }
}

impl From<i64> for ConditionValue {
    fn from(n: i64) -> Self {
        ConditionValue::Integer(n)
    }
}

impl From<i32> for ConditionValue {
    fn from(n: i32) -> Self {
        ConditionValue::Integer(n as i64)
    }
}

impl From<f64> for ConditionValue {
    fn from(n: f64) -> Self {
        ConditionValue::Float(n)
    }
}

impl From<bool> for ConditionValue {
    fn from(b: bool) -> Self {
        ConditionValue::Boolean(b)
    }
}

impl<T: Into<ConditionValue>> From<Vec<T>> for ConditionValue {
    fn from(v: Vec<T>) -> Self {
        ConditionValue::Array(v.into_iter().map(|x| x.into()).collect())
    }
}
