use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::ResourceId;

/// A catalog entry that can be recommended
///
/// Attributes (subject, grade level, type, ...) are opaque strings used only
/// for equality filtering. In JSON they sit next to `id` and `title`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(flatten)]
    pub attributes: BTreeMap<String, String>,
}

impl Resource {
    /// Creates a resource with no title or attributes
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: ResourceId::new(id),
            title: None,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }
}

/// Conjunctive attribute-equality filters applied to hybrid output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filters(BTreeMap<String, String>);

impl Filters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a required attribute value
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every filter must match; a missing attribute never matches
    pub fn matches(&self, resource: &Resource) -> bool {
        self.0
            .iter()
            .all(|(key, value)| resource.attribute(key) == Some(value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn math_video() -> Resource {
        Resource::new("r1")
            .with_title("Fractions in 10 minutes")
            .with_attribute("subject", "Math")
            .with_attribute("type", "video")
    }

    #[test]
    fn test_resource_flattened_attributes() {
        let json = r#"{"id":"r1","title":"Fractions","subject":"Math","gradeLevel":"5"}"#;
        let resource: Resource = serde_json::from_str(json).unwrap();
        assert_eq!(resource.id, ResourceId::new("r1"));
        assert_eq!(resource.title.as_deref(), Some("Fractions"));
        assert_eq!(resource.attribute("subject"), Some("Math"));
        assert_eq!(resource.attribute("gradeLevel"), Some("5"));
        assert_eq!(resource.attributes.len(), 2);
    }

    #[test]
    fn test_resource_without_title() {
        let resource: Resource = serde_json::from_str(r#"{"id":"r9"}"#).unwrap();
        assert_eq!(resource, Resource::new("r9"));
        assert_eq!(serde_json::to_string(&resource).unwrap(), r#"{"id":"r9"}"#);
    }

    #[test]
    fn test_empty_filters_match_everything() {
        assert!(Filters::new().matches(&math_video()));
        assert!(Filters::new().matches(&Resource::new("bare")));
    }

    #[test]
    fn test_filters_are_conjunctive() {
        let resource = math_video();
        assert!(Filters::new().with("subject", "Math").matches(&resource));
        assert!(Filters::new()
            .with("subject", "Math")
            .with("type", "video")
            .matches(&resource));
        assert!(!Filters::new()
            .with("subject", "Math")
            .with("type", "worksheet")
            .matches(&resource));
    }

    #[test]
    fn test_missing_attribute_does_not_match() {
        let filters = Filters::new().with("gradeLevel", "5");
        assert!(!filters.matches(&math_video()));
    }
}
