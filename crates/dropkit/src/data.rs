//! Option data model
//!
//! An option set is either a flat list of [`OptionItem`]s or a list of
//! [`OptionGroup`]s, never a mix. Payloads decode from any of
//!
//! ```json
//! {"options": [{"value": "a", "text": "Alpha"}]}
//! {"groups": [{"label": "Fruits", "options": [{"value": "a", "text": "Apple"}]}]}
//! [{"value": 1, "text": "One"}]
//! ```
//!
//! Option values may be JSON strings, numbers or booleans; they are kept as
//! strings since that is what ends up in the form field.

use rustc_hash::FxHashSet;
use serde::{de, Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A single choice
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionItem {
    /// Submitted value, unique within the option set
    #[serde(deserialize_with = "scalar_string")]
    pub value: String,
    /// Display label; falls back to the value when empty
    #[serde(default)]
    pub text: String,
    /// Marked as the initial selection
    #[serde(default)]
    pub selected: bool,
    /// Shown but not selectable
    #[serde(default)]
    pub disabled: bool,
    /// Label of the owning group, filled in for grouped data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

impl OptionItem {
    /// Create an enabled, unselected option
    pub fn new(value: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Mark as the initial selection
    pub fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }

    /// Mark as disabled
    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }
}

/// A labelled run of options
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionGroup {
    /// Group heading; an empty label renders no heading row
    #[serde(default)]
    pub label: String,
    /// Member options in display order
    #[serde(default)]
    pub options: Vec<OptionItem>,
}

impl OptionGroup {
    /// Create a group
    pub fn new(label: impl Into<String>, options: Vec<OptionItem>) -> Self {
        Self {
            label: label.into(),
            options,
        }
    }
}

/// A complete option set
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum OptionData {
    /// Options without grouping
    #[serde(rename = "options")]
    Flat(Vec<OptionItem>),
    /// Options arranged under group headings
    #[serde(rename = "groups")]
    Grouped(Vec<OptionGroup>),
}

impl Default for OptionData {
    fn default() -> Self {
        OptionData::Flat(Vec::new())
    }
}

/// Payload that is not an option set
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// Neither `{options}`, `{groups}` nor an array of options
    #[error("expected {{\"options\": [..]}}, {{\"groups\": [..]}} or an array of options: {0}")]
    Shape(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawData {
    Groups { groups: Vec<OptionGroup> },
    Options { options: Vec<OptionItem> },
    Bare(Vec<OptionItem>),
}

impl<'de> Deserialize<'de> for OptionData {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawData::deserialize(deserializer).map_err(|_| {
            de::Error::custom("expected {\"options\": [..]}, {\"groups\": [..]} or an array of options")
        })?;
        Ok(match raw {
            RawData::Groups { groups } => OptionData::Grouped(groups),
            RawData::Options { options } | RawData::Bare(options) => OptionData::Flat(options),
        })
    }
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Bool(b) => Ok(b.to_string()),
        other => Err(de::Error::custom(format!(
            "option value must be a string, number or boolean, got {other}"
        ))),
    }
}

impl From<Vec<OptionItem>> for OptionData {
    fn from(options: Vec<OptionItem>) -> Self {
        OptionData::Flat(options)
    }
}

impl From<Vec<OptionGroup>> for OptionData {
    fn from(groups: Vec<OptionGroup>) -> Self {
        OptionData::Grouped(groups)
    }
}

impl OptionData {
    /// Decode and normalise a JSON payload
    pub fn from_json(value: serde_json::Value) -> Result<Self, DataError> {
        serde_json::from_value::<OptionData>(value)
            .map(OptionData::normalized)
            .map_err(|e| DataError::Shape(e.to_string()))
    }

    /// Decode and normalise JSON text
    pub fn from_json_str(text: &str) -> Result<Self, DataError> {
        serde_json::from_str::<OptionData>(text)
            .map(OptionData::normalized)
            .map_err(|e| DataError::Shape(e.to_string()))
    }

    /// Whether the set is grouped
    pub fn is_grouped(&self) -> bool {
        matches!(self, OptionData::Grouped(_))
    }

    /// Every option in display order
    pub fn options(&self) -> Vec<&OptionItem> {
        match self {
            OptionData::Flat(options) => options.iter().collect(),
            OptionData::Grouped(groups) => groups.iter().flat_map(|g| g.options.iter()).collect(),
        }
    }

    /// Total number of options
    pub fn len(&self) -> usize {
        match self {
            OptionData::Flat(options) => options.len(),
            OptionData::Grouped(groups) => groups.iter().map(|g| g.options.len()).sum(),
        }
    }

    /// Whether the set has no options
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Option with the given value
    pub fn find(&self, value: &str) -> Option<&OptionItem> {
        self.options().into_iter().find(|o| o.value == value)
    }

    /// Apply the option set invariants
    ///
    /// - an empty `text` takes the value
    /// - entries with neither value nor text are dropped
    /// - later duplicates of a value are dropped
    /// - grouped options record their group label
    pub fn normalized(self) -> Self {
        let mut seen = FxHashSet::default();
        let mut keep = |item: &mut OptionItem| -> bool {
            if item.text.is_empty() {
                item.text = item.value.clone();
            }
            if item.text.is_empty() {
                tracing::debug!("dropping option with empty value and text");
                return false;
            }
            if !seen.insert(item.value.clone()) {
                tracing::warn!(value = %item.value, "duplicate option value, keeping the first");
                return false;
            }
            true
        };

        match self {
            OptionData::Flat(mut options) => {
                options.retain_mut(|item| {
                    item.group = None;
                    keep(item)
                });
                OptionData::Flat(options)
            }
            OptionData::Grouped(mut groups) => {
                for group in &mut groups {
                    let label = (!group.label.is_empty()).then(|| group.label.clone());
                    group.options.retain_mut(|item| {
                        item.group = label.clone();
                        keep(item)
                    });
                }
                OptionData::Grouped(groups)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_accepts_all_shapes() {
        let flat = OptionData::from_json(json!({"options": [{"value": "a", "text": "Alpha"}]})).unwrap();
        assert!(!flat.is_grouped());
        assert_eq!(flat.len(), 1);

        let bare = OptionData::from_json(json!([{"value": "a", "text": "Alpha"}])).unwrap();
        assert_eq!(bare, flat);

        let grouped = OptionData::from_json(json!({
            "groups": [{"label": "Fruits", "options": [{"value": "apple", "text": "Apple"}]}]
        }))
        .unwrap();
        assert!(grouped.is_grouped());
        assert_eq!(grouped.find("apple").unwrap().group.as_deref(), Some("Fruits"));
    }

    #[test]
    fn test_groups_win_over_options() {
        let data = OptionData::from_json(json!({
            "groups": [{"label": "G", "options": [{"value": "g"}]}],
            "options": [{"value": "o"}]
        }))
        .unwrap();
        assert!(data.is_grouped());
        assert!(data.find("o").is_none());
    }

    #[test]
    fn test_scalar_values_and_text_fallback() {
        let data = OptionData::from_json(json!([
            {"value": 7, "text": "Seven"},
            {"value": true},
            {"value": "x", "text": ""}
        ]))
        .unwrap();
        let values: Vec<_> = data.options().iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, vec!["7", "true", "x"]);
        assert_eq!(data.find("true").unwrap().text, "true");
        assert_eq!(data.find("x").unwrap().text, "x");
    }

    #[test]
    fn test_duplicates_and_empty_entries_dropped() {
        let data = OptionData::from_json(json!({"options": [
            {"value": "", "text": ""},
            {"value": "a", "text": "First"},
            {"value": "a", "text": "Second"}
        ]}))
        .unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.find("a").unwrap().text, "First");
    }

    #[test]
    fn test_rejects_unknown_shapes() {
        assert!(matches!(
            OptionData::from_json(json!({"items": []})),
            Err(DataError::Shape(_))
        ));
        assert!(OptionData::from_json(json!([{"value": {"nested": 1}}])).is_err());
        assert!(OptionData::from_json_str("not json").is_err());
    }
}
