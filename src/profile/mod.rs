//! The applicant profile: the single long-lived structured record of one
//! intake session, shaped exactly by [`schema::SECTIONS`].

pub mod merge;
pub mod schema;

use serde::Serialize;
use serde_json::{Map, Value};

pub use merge::{MergeAnomaly, MergeReport, merge};
pub use schema::{SectionKind, SectionSpec};

/// Schema-shaped profile record.
///
/// Created once at session start with every scalar field null and every
/// repeatable section empty. The key set never changes afterwards: the merge
/// engine populates values but cannot add or remove keys. Serializes to the
/// full nested schema with `null` for absent fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Profile {
    sections: Map<String, Value>,
}

impl Profile {
    /// Create an empty profile from the schema table.
    pub fn new() -> Self {
        let mut sections = Map::new();
        for spec in schema::SECTIONS {
            let value = match spec.kind {
                SectionKind::Scalar => Value::Object(empty_record(spec)),
                SectionKind::Repeatable => Value::Array(Vec::new()),
            };
            sections.insert(spec.name.to_string(), value);
        }
        Self { sections }
    }

    /// The value of a scalar field, or `None` if absent (null) or the
    /// section/field is not in the schema.
    pub fn scalar(&self, section: &str, field: &str) -> Option<&Value> {
        match self.sections.get(section)?.get(field)? {
            Value::Null => None,
            value => Some(value),
        }
    }

    /// The entries of a repeatable section. Empty for scalar or unknown names.
    pub fn entries(&self, section: &str) -> &[Value] {
        match self.sections.get(section) {
            Some(Value::Array(entries)) => entries,
            _ => &[],
        }
    }

    /// The top-level section names currently present.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// The full profile as a JSON value.
    pub fn to_value(&self) -> Value {
        Value::Object(self.sections.clone())
    }

    /// Pretty-printed JSON, used both in prompts and for persistence.
    pub fn to_json_pretty(&self) -> String {
        // A Map of Values cannot fail to serialize.
        serde_json::to_string_pretty(&self.sections).unwrap_or_else(|_| "{}".to_string())
    }

    pub(crate) fn sections_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.sections
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

/// A record with every schema field present and null.
pub(crate) fn empty_record(spec: &SectionSpec) -> Map<String, Value> {
    spec.fields
        .iter()
        .map(|f| (f.to_string(), Value::Null))
        .collect()
}
