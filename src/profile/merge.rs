//! Profile merge engine.
//!
//! Reconciles one untrusted extraction fragment into the profile. The rules
//! exist because a naive whole-object overwrite loses data in the common
//! case: most utterances touch one or two fields, so the model's fragment is
//! almost always partial, and replacing a section wholesale would erase
//! everything captured on earlier turns.
//!
//! Rules, per top-level key present in the fragment:
//! - scalar section: a field is overwritten only when the fragment supplies a
//!   non-null scalar for it; nulls and absent fields leave the profile alone.
//! - repeatable section: well-shaped entry objects are appended. No identity
//!   resolution across turns — a restated fact appends again — except that an
//!   entry element-wise identical to an existing one is skipped.
//! - anything outside the schema (sections, fields, wrong shapes) is skipped
//!   and surfaced as an anomaly. Never fatal; the rest of the fragment still
//!   applies, and the profile's key set is identical before and after every
//!   merge.

use serde_json::{Map, Value};

use crate::profile::schema::{self, SectionKind, SectionSpec};
use crate::profile::{Profile, empty_record};

/// A non-fatal condition encountered while merging a fragment.
///
/// Anomalies are the visibility channel for model output that doesn't fit the
/// schema. They are reported and logged, never raised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeAnomaly {
    #[error("unknown section `{section}` ignored")]
    UnknownSection { section: String },

    #[error("unknown field `{section}.{field}` ignored")]
    UnknownField { section: String, field: String },

    #[error("section `{section}` skipped: expected {expected}")]
    SectionShape {
        section: String,
        expected: &'static str,
    },

    #[error("field `{section}.{field}` skipped: expected a scalar value")]
    FieldShape { section: String, field: String },

    #[error("entry {index} of `{section}` skipped: expected an object")]
    EntryShape { section: String, index: usize },
}

/// Outcome of merging one fragment.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MergeReport {
    /// Scalar fields overwritten with a new value.
    pub fields_updated: usize,
    /// Entries appended to repeatable sections.
    pub entries_appended: usize,
    /// Candidate entries skipped as exact duplicates of existing ones.
    pub duplicates_skipped: usize,
    pub anomalies: Vec<MergeAnomaly>,
}

impl MergeReport {
    /// True when the fragment applied without any anomaly.
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }

    /// True when the merge changed the profile.
    pub fn changed(&self) -> bool {
        self.fields_updated > 0 || self.entries_appended > 0
    }
}

/// Merge an extraction fragment into the profile.
///
/// The profile is caller-owned and mutated in place; everything observable
/// about the merge is in the returned report. Any fragment, however
/// malformed, leaves the profile schema-shaped.
pub fn merge(profile: &mut Profile, fragment: &Map<String, Value>) -> MergeReport {
    let mut report = MergeReport::default();

    for (key, value) in fragment {
        let Some(spec) = schema::section(key) else {
            report.anomalies.push(MergeAnomaly::UnknownSection {
                section: key.clone(),
            });
            continue;
        };

        match spec.kind {
            SectionKind::Scalar => merge_scalar_section(profile, spec, value, &mut report),
            SectionKind::Repeatable => merge_repeatable_section(profile, spec, value, &mut report),
        }
    }

    report
}

fn merge_scalar_section(
    profile: &mut Profile,
    spec: &SectionSpec,
    value: &Value,
    report: &mut MergeReport,
) {
    let Value::Object(incoming) = value else {
        report.anomalies.push(MergeAnomaly::SectionShape {
            section: spec.name.to_string(),
            expected: "an object of fields",
        });
        return;
    };

    for (field, field_value) in incoming {
        if !spec.fields.contains(&field.as_str()) {
            report.anomalies.push(MergeAnomaly::UnknownField {
                section: spec.name.to_string(),
                field: field.clone(),
            });
            continue;
        }
        match field_value {
            // Null means "nothing extracted for this field", never "clear it".
            Value::Null => {}
            Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                let section = profile
                    .sections_mut()
                    .get_mut(spec.name)
                    .and_then(Value::as_object_mut);
                if let Some(section) = section {
                    let previous = section.insert(field.clone(), field_value.clone());
                    if previous.as_ref() != Some(field_value) {
                        report.fields_updated += 1;
                    }
                }
            }
            Value::Array(_) | Value::Object(_) => {
                report.anomalies.push(MergeAnomaly::FieldShape {
                    section: spec.name.to_string(),
                    field: field.clone(),
                });
            }
        }
    }
}

fn merge_repeatable_section(
    profile: &mut Profile,
    spec: &SectionSpec,
    value: &Value,
    report: &mut MergeReport,
) {
    let Value::Array(candidates) = value else {
        report.anomalies.push(MergeAnomaly::SectionShape {
            section: spec.name.to_string(),
            expected: "a list of entries",
        });
        return;
    };

    for (index, candidate) in candidates.iter().enumerate() {
        let Value::Object(incoming) = candidate else {
            report.anomalies.push(MergeAnomaly::EntryShape {
                section: spec.name.to_string(),
                index,
            });
            continue;
        };

        // Normalize to the full field set so stored entries always share one
        // shape, whatever subset the model returned.
        let mut entry = empty_record(spec);
        for (field, field_value) in incoming {
            if !spec.fields.contains(&field.as_str()) {
                report.anomalies.push(MergeAnomaly::UnknownField {
                    section: spec.name.to_string(),
                    field: field.clone(),
                });
                continue;
            }
            match field_value {
                Value::Null => {}
                Value::String(_) | Value::Number(_) | Value::Bool(_) => {
                    entry.insert(field.clone(), field_value.clone());
                }
                Value::Array(_) | Value::Object(_) => {
                    report.anomalies.push(MergeAnomaly::FieldShape {
                        section: spec.name.to_string(),
                        field: field.clone(),
                    });
                }
            }
        }

        // The model often echoes the all-null entry template from the prompt.
        if entry.values().all(Value::is_null) {
            continue;
        }

        let entry = Value::Object(entry);
        let existing = profile
            .sections_mut()
            .get_mut(spec.name)
            .and_then(Value::as_array_mut);
        if let Some(existing) = existing {
            if existing.contains(&entry) {
                report.duplicates_skipped += 1;
            } else {
                existing.push(entry);
                report.entries_appended += 1;
            }
        }
    }
}
