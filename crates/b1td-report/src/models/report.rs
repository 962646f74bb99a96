//! Flat report data handed to the document renderer

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Static fields describing who the report is for and who prepared it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaseFields {
    /// Document title
    pub doc_title: String,
    /// Customer name
    pub customer: String,
    /// Customer contact
    pub contact: String,
    /// Contact phone
    pub contact_phone: String,
    /// Contact email
    pub contact_email: String,
    /// Report author
    pub prepared_by: String,
    /// Author email
    pub prepared_email: String,
    /// Report date as `YYYY-MM-DD`
    pub iso_date: String,
}

/// Field name to value mapping, in insertion order.
///
/// Built fresh for every run and passed once to the renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportData(Map<String, Value>);

impl ReportData {
    /// Empty mapping
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field, replacing any previous value
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    /// Merge every field of `other` into this mapping
    pub fn extend(&mut self, other: ReportData) {
        self.0.extend(other.0);
    }

    /// Value of `field`
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Whether `field` is set
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no field is set
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in insertion order
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// View as a JSON object
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl FromIterator<(String, Value)> for ReportData {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Key under which an insight's raw payload is stored
pub fn data_field(insight: &str) -> String {
    format!("data_{insight}")
}
