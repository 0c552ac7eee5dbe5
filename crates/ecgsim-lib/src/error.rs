//! Error types for the synthesis engine.

use thiserror::Error;

/// Errors raised while building the catalog or resolving user-facing names.
///
/// The numeric core itself never fails; every variant here describes either a
/// lookup miss or a defective constant table.
#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    /// No catalog entry carries the requested id.
    #[error("unknown rhythm `{0}`")]
    UnknownRhythm(String),

    /// The lead name does not match any of the 12 standard leads.
    #[error("unknown lead `{0}`")]
    UnknownLead(String),

    /// A vector's shape or timing is unusable.
    #[error("malformed vector: {0}")]
    MalformedVector(&'static str),

    /// A rhythm's timing policy is self-contradictory.
    #[error("invalid rhythm policy: {0}")]
    InvalidPolicy(&'static str),

    /// Two catalog entries share the same id.
    #[error("rhythm `{0}` is registered twice")]
    DuplicateRhythm(String),

    /// A catalog entry failed validation.
    #[error("rhythm `{id}` is misconfigured")]
    InvalidDefinition {
        id: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    /// Wraps a validation failure with the id of the offending definition.
    pub fn in_definition(id: impl Into<String>, source: EngineError) -> Self {
        Self::InvalidDefinition {
            id: id.into(),
            source: Box::new(source),
        }
    }
}
