//! The label → value mapping produced by every extraction pipeline.

use serde::ser::{Serialize, SerializeMap, Serializer};
use serde::{Deserialize, Serialize as DeriveSerialize};

/// A single extracted value.
#[derive(Debug, Clone, PartialEq, Eq, DeriveSerialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// One line of text.
    Text(String),
    /// Several lines, in reading order.
    List(Vec<String>),
}

impl FieldValue {
    /// Render the value for display; list items are joined with `", "`.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Text(text) => text.clone(),
            FieldValue::List(items) => items.join(", "),
        }
    }

    /// Whether the value carries any text at all.
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Text(text) => text.is_empty(),
            FieldValue::List(items) => items.is_empty(),
        }
    }
}

impl From<String> for FieldValue {
    fn from(text: String) -> Self {
        FieldValue::Text(text)
    }
}

impl From<&str> for FieldValue {
    fn from(text: &str) -> Self {
        FieldValue::Text(text.to_string())
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(items: Vec<String>) -> Self {
        FieldValue::List(items)
    }
}

/// Ordered mapping from field label to an optional value.
///
/// Labels keep insertion order, which is the order the pipeline defines for
/// its document type. A label mapped to `None` was looked for and not found.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    entries: Vec<(String, Option<FieldValue>)>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `label` to `value`, keeping the label's original position if it
    /// was already present.
    pub fn insert(&mut self, label: impl Into<String>, value: Option<FieldValue>) {
        let label = label.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((label, value)),
        }
    }

    /// Value for `label`; `None` both when the label is unknown and when it
    /// was not found.
    pub fn get(&self, label: &str) -> Option<&FieldValue> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .and_then(|(_, v)| v.as_ref())
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(l, _)| l.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&FieldValue>)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of labels holding a non-empty value.
    pub fn found_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|(_, v)| v.as_ref().is_some_and(|v| !v.is_empty()))
            .count()
    }
}

impl Serialize for FieldMapping {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_insert_keeps_position() {
        let mut mapping = FieldMapping::new();
        mapping.insert("b", None);
        mapping.insert("a", Some("1".into()));
        mapping.insert("b", Some("2".into()));

        assert_eq!(mapping.labels().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(mapping.get("b"), Some(&FieldValue::Text("2".to_string())));
    }

    #[test]
    fn test_serializes_in_label_order() {
        let mut mapping = FieldMapping::new();
        mapping.insert("Name", Some("A".into()));
        mapping.insert("Address", Some(vec!["x".to_string(), "y".to_string()].into()));
        mapping.insert("Blood Group", None);

        let json = serde_json::to_string(&mapping).unwrap();
        assert_eq!(
            json,
            r#"{"Name":"A","Address":["x","y"],"Blood Group":null}"#
        );
    }

    #[test]
    fn test_found_count_ignores_empty_values() {
        let mut mapping = FieldMapping::new();
        mapping.insert("a", Some(FieldValue::List(Vec::new())));
        mapping.insert("b", None);
        mapping.insert("c", Some("v".into()));
        assert_eq!(mapping.found_count(), 1);
    }

    #[test]
    fn test_display_joins_lists() {
        let value = FieldValue::List(vec!["123 Main Street".to_string(), "Colombo".to_string()]);
        assert_eq!(value.display(), "123 Main Street, Colombo");
    }
}
