//! Decision request definitions.
//!
//! A request is a flat list of attributes grouped by category. Targets and
//! conditions look values up through an [`AttributeDesignator`].

use crate::policy::AttributeDesignator;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Attribute identifier of the acting subject.
pub const SUBJECT_ID: &str = "urn:oasis:names:tc:xacml:1.0:subject:subject-id";
/// Attribute identifier of the accessed resource.
pub const RESOURCE_ID: &str = "urn:oasis:names:tc:xacml:1.0:resource:resource-id";
/// Attribute identifier of the requested action.
pub const ACTION_ID: &str = "urn:oasis:names:tc:xacml:1.0:action:action-id";
/// Attribute identifier of the evaluation time.
pub const CURRENT_DATE_TIME: &str = "urn:oasis:names:tc:xacml:1.0:environment:current-dateTime";

/// Well-known data type URIs.
pub mod data_type {
    /// xs:string
    pub const STRING: &str = "http://www.w3.org/2001/XMLSchema#string";
    /// xs:integer
    pub const INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
    /// xs:double
    pub const DOUBLE: &str = "http://www.w3.org/2001/XMLSchema#double";
    /// xs:boolean
    pub const BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";
    /// xs:dateTime
    pub const DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";
}

/// Attribute category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// The acting subject
    Subject,
    /// The accessed resource
    Resource,
    /// The requested action
    Action,
    /// The evaluation environment
    Environment,
}

impl Category {
    /// The XACML category URN.
    pub fn urn(&self) -> &'static str {
        match self {
            Category::Subject => "urn:oasis:names:tc:xacml:1.0:subject-category:access-subject",
            Category::Resource => "urn:oasis:names:tc:xacml:3.0:attribute-category:resource",
            Category::Action => "urn:oasis:names:tc:xacml:3.0:attribute-category:action",
            Category::Environment => "urn:oasis:names:tc:xacml:3.0:attribute-category:environment",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn())
    }
}

/// A single attribute with its bag of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    /// Category the attribute belongs to
    pub category: Category,
    /// Attribute identifier
    pub attribute_id: String,
    /// Data type URI
    #[serde(default = "default_data_type")]
    pub data_type: String,
    /// Issuer of the attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    /// Attribute values
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

fn default_data_type() -> String {
    data_type::STRING.to_string()
}

impl Attribute {
    /// Create an attribute holding one value.
    pub fn new(
        category: Category,
        attribute_id: impl Into<String>,
        data_type: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        Self {
            category,
            attribute_id: attribute_id.into(),
            data_type: data_type.into(),
            issuer: None,
            values: vec![value],
        }
    }

    /// Set the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = Some(issuer.into());
        self
    }

    /// Check if this attribute answers the designator.
    pub fn matches(&self, designator: &AttributeDesignator) -> bool {
        self.category == designator.category
            && self.attribute_id == designator.attribute_id
            && self.data_type == designator.data_type
            && designator
                .issuer
                .as_ref()
                .map_or(true, |issuer| self.issuer.as_ref() == Some(issuer))
    }
}

/// A decision request.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Request identifier
    #[serde(default)]
    pub id: String,
    /// Request attributes
    #[serde(default)]
    pub attributes: Vec<Attribute>,
}

impl Request {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a request builder.
    pub fn builder() -> RequestBuilder {
        RequestBuilder::new()
    }

    /// Collect the bag of values the designator selects.
    pub fn bag(&self, designator: &AttributeDesignator) -> Vec<serde_json::Value> {
        self.attributes
            .iter()
            .filter(|attribute| attribute.matches(designator))
            .flat_map(|attribute| attribute.values.iter().cloned())
            .collect()
    }

    /// Parse a request from JSON.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        serde_json::from_str(json).map_err(crate::Error::from)
    }

    /// Parse a request from YAML.
    pub fn from_yaml(yaml: &str) -> crate::Result<Self> {
        serde_yaml::from_str(yaml).map_err(crate::Error::from)
    }
}

/// Builder for creating requests.
#[derive(Debug, Default)]
pub struct RequestBuilder {
    id: Option<String>,
    attributes: Vec<Attribute>,
}

impl RequestBuilder {
    /// Create a new request builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the request id. A random one is generated otherwise.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the subject identifier.
    pub fn with_subject_id(self, id: impl Into<String>) -> Self {
        self.with_string(Category::Subject, SUBJECT_ID, id)
    }

    /// Set the resource identifier.
    pub fn with_resource_id(self, id: impl Into<String>) -> Self {
        self.with_string(Category::Resource, RESOURCE_ID, id)
    }

    /// Set the action identifier.
    pub fn with_action_id(self, id: impl Into<String>) -> Self {
        self.with_string(Category::Action, ACTION_ID, id)
    }

    /// Add a string attribute.
    pub fn with_string(
        self,
        category: Category,
        attribute_id: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.with_value(
            category,
            attribute_id,
            data_type::STRING,
            serde_json::Value::String(value.into()),
        )
    }

    /// Add an attribute value, merging into an existing bag with the same
    /// category, id and data type.
    pub fn with_value(
        mut self,
        category: Category,
        attribute_id: impl Into<String>,
        data_type: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        let attribute_id = attribute_id.into();
        let data_type = data_type.into();
        let existing = self.attributes.iter_mut().find(|a| {
            a.category == category
                && a.attribute_id == attribute_id
                && a.data_type == data_type
                && a.issuer.is_none()
        });
        match existing {
            Some(attribute) => attribute.values.push(value),
            None => self
                .attributes
                .push(Attribute::new(category, attribute_id, data_type, value)),
        }
        self
    }

    /// Add a fully specified attribute.
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }

    /// Add the environment's current date and time.
    pub fn with_current_time(self) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        self.with_value(
            Category::Environment,
            CURRENT_DATE_TIME,
            data_type::DATE_TIME,
            serde_json::Value::String(now),
        )
    }

    /// Build the request.
    pub fn build(self) -> Request {
        Request {
            id: self
                .id
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
            attributes: self.attributes,
        }
    }
}
