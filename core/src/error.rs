use crate::value::CastError;
use appschema_filter::error::{EvaluationError, ParseError};
use thiserror::Error;

/// Coarse classification of [`Error`], used by callers to decide whether a failure is
/// a configuration problem, a deliberate scope limit, an environmental failure or a bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    IllegalArgument,
    Unsupported,
    Io,
    IllegalState,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("attribute {path} not found in type {type_name}")]
    AttributeNotFound { path: String, type_name: String },

    #[error("invalid nested attribute {path} in type {type_name}: {reason}")]
    InvalidNestedAttribute { path: String, type_name: String, reason: String },

    #[error("Can't find source expression for: {0}")]
    UnmappedAttribute(String),

    #[error("{step} is not a valid location path for type {type_name}. {step} ns: {namespace}, {type_name} properties: {properties}")]
    InvalidLocationPath { step: String, namespace: String, type_name: String, properties: String },

    #[error("Can't set target type {target} for attribute {attribute}: {reason}")]
    GeometryBindingMismatch { target: String, attribute: String, reason: String },

    #[error("undeclared namespace prefix {prefix} in {xpath}")]
    UnknownPrefix { prefix: String, xpath: String },

    #[error("invalid xpath {xpath}: {reason}")]
    InvalidXPath { xpath: String, reason: String },

    #[error("no feature id mapping for type {0}")]
    MissingFeatureId(String),

    #[error("invalid content for {attribute}: {reason}")]
    InvalidContent { attribute: String, reason: String },

    #[error("cast error: {0}")]
    Cast(#[from] CastError),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("nested type {name} unavailable: {source}")]
    NestedTypeUnavailable { name: String, source: Box<dyn std::error::Error + Send + Sync + 'static> },

    #[error("illegal state: {0}")]
    IllegalState(String),

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Unsupported(_) | Error::Evaluation(EvaluationError::Unsupported(_)) => ErrorKind::Unsupported,
            Error::NestedTypeUnavailable { .. } => ErrorKind::Io,
            Error::IllegalState(_) => ErrorKind::IllegalState,
            _ => ErrorKind::IllegalArgument,
        }
    }

    pub(crate) fn unsupported(what: impl Into<String>) -> Self { Error::Unsupported(what.into()) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(Error::UnmappedAttribute("gml:name".into()).kind(), ErrorKind::IllegalArgument);
        assert_eq!(Error::unsupported("temporal").kind(), ErrorKind::Unsupported);
        assert_eq!(Error::NestedTypeUnavailable { name: "gsml:X".into(), source: "connection refused".into() }.kind(), ErrorKind::Io);
        assert_eq!(Error::IllegalState("fell through".into()).kind(), ErrorKind::IllegalState);
    }

    #[test]
    fn test_unmapped_message() {
        assert_eq!(Error::UnmappedAttribute("gml:name".into()).to_string(), "Can't find source expression for: gml:name");
    }
}
