//! Policy document parsing and management.

use super::{Evaluatable, PolicyTreeNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// A policy document holding one or more top-level policies and policy sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    /// API version of the policy document format
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Kind of document
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Top-level evaluatables defined in this document
    #[serde(default)]
    pub policies: Vec<PolicyTreeNode>,
}

fn default_api_version() -> String {
    "pdp.xacml.io/v1".to_string()
}

fn default_kind() -> String {
    "PolicyDocument".to_string()
}

impl PolicyDocument {
    /// Create a new empty policy document.
    pub fn new() -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            policies: Vec::new(),
        }
    }

    /// Create a policy document with the given top-level nodes.
    pub fn with_policies(policies: Vec<PolicyTreeNode>) -> Self {
        Self {
            api_version: default_api_version(),
            kind: default_kind(),
            policies,
        }
    }

    /// Add a top-level node to the document.
    pub fn add_policy(&mut self, policy: impl Into<PolicyTreeNode>) {
        self.policies.push(policy.into());
    }

    /// Parse a policy document from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(crate::Error::from)
    }

    /// Parse a policy document from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(crate::Error::from)
    }

    /// Parse a policy document, choosing the format from the file extension.
    pub fn from_str_with_extension(content: &str, extension: &str) -> crate::Result<Self> {
        match extension.to_lowercase().as_str() {
            "yaml" | "yml" => Self::from_yaml(content),
            "json" => Self::from_json(content),
            _ => {
                // Try YAML first, then JSON
                Self::from_yaml(content).or_else(|_| Self::from_json(content))
            }
        }
    }

    /// Load a policy document from a file.
    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Self::from_str_with_extension(&content, extension)
    }

    /// Convert the document to YAML.
    pub fn to_yaml(&self) -> crate::Result<String> {
        serde_yaml::to_string(self).map_err(crate::Error::from)
    }

    /// Convert the document to JSON.
    pub fn to_json(&self) -> crate::Result<String> {
        serde_json::to_string_pretty(self).map_err(crate::Error::from)
    }

    /// Validate all nodes in the document.
    ///
    /// Top-level ids must be unique because references resolve by id.
    /// References are only valid as children.
    /// Structural defects (missing algorithms, empty slots) are not rejected:
    /// they evaluate to Indeterminate and are reported by [`Self::defects`].
    pub fn validate(&self) -> crate::Result<()> {
        let mut seen = HashSet::new();
        for policy in &self.policies {
            if let PolicyTreeNode::Reference(reference) = policy {
                return Err(crate::Error::validation_field(
                    format!("Reference to '{}' cannot be loaded at top level", reference.id),
                    "kind",
                ));
            }
            policy.validate()?;
            if !seen.insert(policy.id()) {
                return Err(crate::Error::validation_field(
                    format!("Duplicate top-level id: {}", policy.id()),
                    "policies",
                ));
            }
        }
        Ok(())
    }

    /// Structural defects across the document.
    pub fn defects(&self) -> Vec<String> {
        self.policies.iter().flat_map(|p| p.defects()).collect()
    }

    /// Find a top-level node by ID.
    pub fn get_policy(&self, id: &str) -> Option<&PolicyTreeNode> {
        self.policies.iter().find(|p| p.id() == id)
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        Self::new()
    }
}
