//! Attribute resolution seam (policy information point).

use crate::policy::AttributeDesignator;
use crate::request::Request;
use crate::Result;

use std::collections::HashMap;

/// Resolves attributes the request does not carry.
///
/// Implementations may block on I/O; they are called synchronously from
/// within an evaluation and own any timeout policy.
pub trait AttributeFinder: Send + Sync {
    /// Return the bag of values for `designator`, empty if unknown.
    fn find(
        &self,
        designator: &AttributeDesignator,
        request: &Request,
    ) -> Result<Vec<serde_json::Value>>;
}

/// An attribute finder answering from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct StaticAttributeFinder {
    values: HashMap<AttributeDesignator, Vec<serde_json::Value>>,
}

impl StaticAttributeFinder {
    /// Create an empty finder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value for a designator. `must_be_present` is ignored when
    /// matching.
    pub fn with_value(mut self, designator: AttributeDesignator, value: serde_json::Value) -> Self {
        self.values
            .entry(Self::key(&designator))
            .or_default()
            .push(value);
        self
    }

    fn key(designator: &AttributeDesignator) -> AttributeDesignator {
        AttributeDesignator {
            must_be_present: false,
            ..designator.clone()
        }
    }
}

impl AttributeFinder for StaticAttributeFinder {
    fn find(
        &self,
        designator: &AttributeDesignator,
        _request: &Request,
    ) -> Result<Vec<serde_json::Value>> {
        Ok(self
            .values
            .get(&Self::key(designator))
            .cloned()
            .unwrap_or_default())
    }
}
