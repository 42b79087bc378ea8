//! Status codes and missing-attribute details.

use crate::request::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status reported alongside a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusCode {
    /// No error
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:status:ok")]
    Ok,
    /// A required attribute could not be resolved
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:status:missing-attribute")]
    MissingAttribute,
    /// Malformed policy or request
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:status:syntax-error")]
    SyntaxError,
    /// Any other evaluation failure
    #[serde(rename = "urn:oasis:names:tc:xacml:1.0:status:processing-error")]
    ProcessingError,
}

impl StatusCode {
    /// The XACML status URN.
    pub fn urn(&self) -> &'static str {
        match self {
            StatusCode::Ok => "urn:oasis:names:tc:xacml:1.0:status:ok",
            StatusCode::MissingAttribute => "urn:oasis:names:tc:xacml:1.0:status:missing-attribute",
            StatusCode::SyntaxError => "urn:oasis:names:tc:xacml:1.0:status:syntax-error",
            StatusCode::ProcessingError => "urn:oasis:names:tc:xacml:1.0:status:processing-error",
        }
    }

    /// Check if this is the Ok status.
    pub fn is_ok(&self) -> bool {
        matches!(self, StatusCode::Ok)
    }
}

impl Default for StatusCode {
    fn default() -> Self {
        StatusCode::Ok
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.urn())
    }
}

/// Describes an attribute that had to be present but could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingAttributeDetail {
    /// Category the attribute was looked up in
    pub category: Category,
    /// Attribute identifier
    pub attribute_id: String,
    /// Data type URI
    pub data_type: String,
    /// Required issuer, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
}

impl MissingAttributeDetail {
    /// Create a new detail.
    pub fn new(
        category: Category,
        attribute_id: impl Into<String>,
        data_type: impl Into<String>,
        issuer: Option<String>,
    ) -> Self {
        Self {
            category,
            attribute_id: attribute_id.into(),
            data_type: data_type.into(),
            issuer,
        }
    }
}

impl fmt::Display for MissingAttributeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ({})", self.category, self.attribute_id, self.data_type)?;
        if let Some(issuer) = &self.issuer {
            write!(f, " issued by {}", issuer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_urn_serialization() {
        let json = serde_json::to_string(&StatusCode::MissingAttribute).unwrap();
        assert_eq!(json, "\"urn:oasis:names:tc:xacml:1.0:status:missing-attribute\"");
        assert_eq!(StatusCode::default(), StatusCode::Ok);
    }

    #[test]
    fn test_missing_attribute_display() {
        let detail = MissingAttributeDetail::new(
            Category::Subject,
            "clearance",
            "http://www.w3.org/2001/XMLSchema#integer",
            Some("hr".to_string()),
        );
        let text = detail.to_string();
        assert!(text.contains("clearance"));
        assert!(text.contains("issued by hr"));
    }
}
