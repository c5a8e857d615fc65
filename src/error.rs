//! Error types for path evaluation, mapping construction and template expansion.

use thiserror::Error;

use crate::mapping::MappingKind;

/// Failure while walking a dotted path through a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("empty variable path")]
    EmptyPath,

    #[error("empty segment in path `{path}`")]
    EmptySegment { path: String },

    #[error("`{segment}` in `{path}` is null")]
    NullSegment { path: String, segment: String },

    #[error("cannot read `{segment}` of a {found} in `{path}`")]
    NotTraversable {
        path: String,
        segment: String,
        found: &'static str,
    },

    #[error("no field `{segment}` in `{path}`")]
    MissingKey { path: String, segment: String },

    #[error("index {segment} out of range (len {len}) in `{path}`")]
    IndexOutOfRange {
        path: String,
        segment: String,
        len: usize,
    },
}

impl PathError {
    /// The segment that stopped evaluation, when there is one.
    pub fn segment(&self) -> Option<&str> {
        match self {
            PathError::EmptyPath | PathError::EmptySegment { .. } => None,
            PathError::NullSegment { segment, .. }
            | PathError::NotTraversable { segment, .. }
            | PathError::MissingKey { segment, .. }
            | PathError::IndexOutOfRange { segment, .. } => Some(segment),
        }
    }
}

/// Invalid style mapping configuration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("expected a {expected} mapping, found a {found} mapping")]
    KindMismatch {
        expected: MappingKind,
        found: MappingKind,
    },

    #[error("threshold mapping needs at least one breakpoint")]
    EmptyThresholds,

    #[error("threshold breakpoint value must be finite, got {0}")]
    InvalidBreakpoint(f64),

    #[error("scale domain [{min}, {max}] is invalid")]
    InvalidDomain { min: f64, max: f64 },

    #[error("scale range [{from:?}, {to:?}] must be two numbers or two #rrggbb colors")]
    InvalidRange { from: String, to: String },

    #[error("mapping field is empty")]
    EmptyField,

    #[error("invalid mapping field: {0}")]
    InvalidField(#[source] PathError),
}

/// Failure compiling or expanding a template.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template `{template}` reads from unknown data source `{source_name}`")]
    MissingDataSource {
        template: String,
        source_name: String,
    },

    #[error("template `{template}`: invalid mapping for `{property}`: {source}")]
    Mapping {
        template: String,
        property: String,
        #[source]
        source: MappingError,
    },

    #[error("template `{template}`: invalid expression in `{field}`: {source}")]
    Path {
        template: String,
        field: String,
        #[source]
        source: PathError,
    },

    #[error("template `{template}`, record {record}: `{property}`: {source}")]
    Record {
        template: String,
        record: usize,
        property: String,
        #[source]
        source: PathError,
    },
}

/// Failure turning a diagram document into engine values.
#[derive(Error, Debug)]
pub enum DocumentError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("duplicate data source `{0}`")]
    DuplicateSource(String),

    #[error("duplicate template id `{0}`")]
    DuplicateTemplate(String),

    #[error("legend for {property}:{field} does not match any mapping")]
    UnknownLegendMapping { property: String, field: String },

    #[error("unknown legend position `{0}`")]
    InvalidLegendPosition(String),

    #[error("invalid document: {0}")]
    Syntax(#[source] serde_json::Error),

    #[error("invalid JSON5 document: {0}")]
    Json5(#[source] json5::Error),
}
