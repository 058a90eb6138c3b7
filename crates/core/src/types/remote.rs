//! Shapes returned by the remote secret store
//!
//! Only the parts that resolution needs are modelled. Field values are
//! secrets: they are never printed by `Debug` and are wiped on drop.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// A named grouping of items (a vault)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Item as listed inside a container, without fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
}

/// Section grouping fields inside an item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    #[serde(default)]
    pub label: Option<String>,
}

/// Pointer from a field to its section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionRef {
    pub id: String,
}

/// A labelled value inside an item
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteField {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub field_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<SectionRef>,
}

impl RemoteField {
    /// Size of the value in bytes as transferred
    #[must_use]
    pub fn byte_size(&self) -> usize {
        self.value.len()
    }
}

impl fmt::Debug for RemoteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteField")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("value", &"<redacted>")
            .field("field_type", &self.field_type)
            .field("purpose", &self.purpose)
            .field("section", &self.section)
            .finish()
    }
}

impl Drop for RemoteField {
    fn drop(&mut self) {
        self.value.zeroize();
    }
}

/// A fully fetched item including its fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub fields: Vec<RemoteField>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

impl Item {
    /// Find a field by exact label, optionally restricted to a section.
    ///
    /// The section is matched by label first, then by id.
    #[must_use]
    pub fn find_field(&self, section: Option<&str>, label: &str) -> Option<&RemoteField> {
        match section {
            None => self.fields.iter().find(|field| field.label == label),
            Some(wanted) => {
                let section_id = self
                    .sections
                    .iter()
                    .find(|s| s.label.as_deref() == Some(wanted))
                    .or_else(|| self.sections.iter().find(|s| s.id == wanted))
                    .map(|s| s.id.as_str())?;
                self.fields.iter().find(|field| {
                    field.label == label
                        && field.section.as_ref().map(|s| s.id.as_str()) == Some(section_id)
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_item() -> Item {
        serde_json::from_value(serde_json::json!({
            "id": "itm1",
            "title": "database",
            "category": "LOGIN",
            "sections": [{"id": "sec1", "label": "admin"}],
            "fields": [
                {"id": "f1", "label": "password", "value": "user-pass", "type": "CONCEALED"},
                {"id": "f2", "label": "password", "value": "admin-pass", "type": "CONCEALED",
                 "section": {"id": "sec1"}},
                {"id": "f3", "label": "username", "value": "app", "type": "STRING",
                 "purpose": "USERNAME"}
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_find_field_without_section() {
        let item = sample_item();
        assert_eq!(item.find_field(None, "password").unwrap().value, "user-pass");
        assert!(item.find_field(None, "Password").is_none());
    }

    #[test]
    fn test_find_field_by_section_label_or_id() {
        let item = sample_item();
        assert_eq!(
            item.find_field(Some("admin"), "password").unwrap().value,
            "admin-pass"
        );
        assert_eq!(
            item.find_field(Some("sec1"), "password").unwrap().value,
            "admin-pass"
        );
        assert!(item.find_field(Some("missing"), "password").is_none());
    }

    #[test]
    fn test_debug_redacts_value() {
        let item = sample_item();
        let rendered = format!("{item:?}");
        assert!(!rendered.contains("admin-pass"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_container_accepts_missing_description() {
        let container: Container = serde_json::from_value(serde_json::json!({
            "id": "vlt1",
            "name": "infra",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-02-01T00:00:00Z"
        }))
        .unwrap();
        assert_eq!(container.description, None);
    }
}
