//! Canonical applicant profile schema.
//!
//! Pure data: a declarative table of sections, section kinds, and field
//! names. The field names are the exact JSON keys the extraction model is
//! instructed to use, including the historically irregular capitalization of
//! `IntendedMajor` and `GraduationYear` — changing them would silently break
//! merging against previously persisted profiles.
//!
//! The merge engine, the extraction prompt, and the empty-profile constructor
//! are all derived from this table; nothing else defines the profile shape.

/// Whether a section holds a single record or an ordered list of records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    /// One fixed-shape record of optional scalar fields.
    Scalar,
    /// Ordered, append-only list of fixed-shape entries.
    Repeatable,
}

/// One top-level section of the profile.
#[derive(Debug, Clone, Copy)]
pub struct SectionSpec {
    pub name: &'static str,
    pub kind: SectionKind,
    pub fields: &'static [&'static str],
}

/// The full profile schema, in display order.
pub const SECTIONS: &[SectionSpec] = &[
    SectionSpec {
        name: "personalInfo",
        kind: SectionKind::Scalar,
        fields: &[
            "gender",
            "nationality",
            "undergradCountry",
            "undergradSchool",
            "undergradMajor",
            "intendGradSchoolCountry",
            "intendedDegree",
            "IntendedMajor",
            "secondUndergradMajor",
            "GraduationYear",
        ],
    },
    SectionSpec {
        name: "standardGrades",
        kind: SectionKind::Scalar,
        fields: &[
            "gpa",
            "gpaTotal",
            "rank",
            "rankTotal",
            "languageTestType",
            "languageTestScore",
            "gre",
            "gmat",
        ],
    },
    SectionSpec {
        name: "professionalExperiences",
        kind: SectionKind::Repeatable,
        fields: &["employer", "companySize", "title", "startDate", "endDate", "jd"],
    },
    SectionSpec {
        name: "academicExperience",
        kind: SectionKind::Repeatable,
        fields: &["category", "projectName", "title", "startDate", "endDate", "outcome"],
    },
    SectionSpec {
        name: "honors",
        kind: SectionKind::Repeatable,
        fields: &["category", "projectName", "name", "pool", "earnDate", "description"],
    },
    SectionSpec {
        name: "activities",
        kind: SectionKind::Repeatable,
        fields: &["name", "organization", "title", "startDate", "endDate", "details"],
    },
    SectionSpec {
        name: "other",
        kind: SectionKind::Scalar,
        fields: &["personalWebsite", "otherInfo"],
    },
    SectionSpec {
        name: "appliedPrograms",
        kind: SectionKind::Repeatable,
        fields: &["programLevel", "program", "school", "result"],
    },
];

/// Look up a section spec by its JSON key.
pub fn section(name: &str) -> Option<&'static SectionSpec> {
    SECTIONS.iter().find(|s| s.name == name)
}
