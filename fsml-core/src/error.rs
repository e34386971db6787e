//! Core error types.

use crate::expr::{BinOp, Type};
use thiserror::Error;

/// Errors raised while typing or evaluating a single expression.
///
/// The same enum is produced by the evaluator and by the type inferencer, so
/// the two always agree on how a bad expression is classified.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("unbound reference '{name}'")]
    UnboundReference { name: String },

    #[error("'{name}' cannot be referenced by the default value of '{attribute}': it is not declared before it")]
    OutOfScopeReference { name: String, attribute: String },

    #[error("type mismatch in {context}: expected {expected}, found {found}")]
    TypeMismatch {
        context: String,
        expected: Type,
        found: Type,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("operator '{op}' cannot be applied to {operand} operands")]
    UnrecognizedOperator { op: BinOp, operand: Type },

    #[error("integer overflow in '{op}'")]
    IntegerOverflow { op: String },
}

impl ExprError {
    /// Returns a stable error code.
    pub fn error_code(&self) -> &'static str {
        match self {
            ExprError::UnboundReference { .. } => "UNBOUND_REFERENCE",
            ExprError::OutOfScopeReference { .. } => "OUT_OF_SCOPE_REFERENCE",
            ExprError::TypeMismatch { .. } => "TYPE_MISMATCH",
            ExprError::DivisionByZero => "DIVISION_BY_ZERO",
            ExprError::UnrecognizedOperator { .. } => "UNRECOGNIZED_OPERATOR",
            ExprError::IntegerOverflow { .. } => "INTEGER_OVERFLOW",
        }
    }
}

/// Errors from the interpreter and the code generator.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("evaluation failed: {0}")]
    Expr(#[from] ExprError),

    #[error("initial state '{state}' is not declared")]
    UndeclaredInitialState { state: String },

    #[error("guard of transition '{state}' on '{event}' evaluated to {found}, expected bool")]
    GuardNotBoolean {
        state: String,
        event: String,
        found: Type,
    },

    #[error("unsupported attribute type: '{ty}'")]
    UnsupportedAttributeType { ty: String },

    #[error("state not found: {state}")]
    UnknownState { state: String },

    #[error("attribute not found: {attribute}")]
    UnknownAttribute { attribute: String },

    #[error("events not declared by the machine: {}", events.join(", "))]
    UnknownEvents { events: Vec<String> },

    #[error("cannot fold default value of '{attribute}': {source}")]
    Translation {
        attribute: String,
        #[source]
        source: ExprError,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Returns an error code suitable for reporting.
    pub fn error_code(&self) -> &'static str {
        match self {
            CoreError::Expr(e) => e.error_code(),
            CoreError::UndeclaredInitialState { .. } => "UNDECLARED_INITIAL_STATE",
            CoreError::GuardNotBoolean { .. } => "GUARD_NOT_BOOLEAN",
            CoreError::UnsupportedAttributeType { .. } => "UNSUPPORTED_ATTRIBUTE_TYPE",
            CoreError::UnknownState { .. } => "STATE_NOT_FOUND",
            CoreError::UnknownAttribute { .. } => "ATTRIBUTE_NOT_FOUND",
            CoreError::UnknownEvents { .. } => "UNKNOWN_EVENTS",
            CoreError::Translation { .. } => "TRANSLATION_ERROR",
            CoreError::Json(_) => "BAD_REQUEST",
        }
    }
}
