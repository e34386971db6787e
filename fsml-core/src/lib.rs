//! # fsml-core
//!
//! Semantic engine for the fsml state machine language.
//!
//! This crate provides:
//! - The expression model, evaluator and static type inferencer
//! - Attribute environments
//! - Static validation with diagnostics
//! - The event-driven interpreter
//! - C++ code generation
//!
//! Models arrive already parsed and resolved; see `fsml-loader`.

pub mod codegen;
pub mod env;
pub mod error;
pub mod eval;
pub mod expr;
pub mod infer;
pub mod interpreter;
pub mod model;
pub mod session;
pub mod validate;

pub use codegen::{generate, generate_file_name};
pub use env::Environment;
pub use error::{CoreError, ExprError};
pub use eval::{evaluate, GuardEvaluator};
pub use expr::{BinOp, Expr, Type, Value};
pub use infer::{infer_type, Scope};
pub use interpreter::{
    Delay, EntryActions, Interpreter, InterpreterOptions, Outcome, ThreadSleep, TraceLine,
    TraceSink,
};
pub use model::{Action, Attribute, Command, Event, PrintValue, State, Statemachine, Transition};
pub use session::{GateGuard, SessionGate, SessionStatus};
pub use validate::{validate, Diagnostic, DiagnosticCode, Diagnostics, NodeRef, Severity};
