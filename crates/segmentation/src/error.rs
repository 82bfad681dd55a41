//! Errors raised while parsing or compiling segment rules.

use donor_core::CrmError;
use thiserror::Error;

use crate::fields::FieldKind;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("unknown donor field `{field}`")]
    UnknownField { field: String },

    #[error("unknown operator `{operator}` on field `{field}`")]
    UnknownOperator { field: String, operator: String },

    #[error("operator `{operator}` is not supported on {kind} field `{field}`")]
    IncompatibleOperator {
        field: String,
        operator: String,
        kind: FieldKind,
    },

    #[error("invalid value for `{field}` {operator}: {reason}")]
    InvalidValue {
        field: String,
        operator: String,
        reason: String,
    },

    #[error("`{connective}` group must contain at least one rule")]
    EmptyGroup { connective: &'static str },

    #[error("malformed rule: {0}")]
    Malformed(String),
}

impl From<ValidationError> for CrmError {
    fn from(err: ValidationError) -> Self {
        CrmError::Validation(err.to_string())
    }
}
