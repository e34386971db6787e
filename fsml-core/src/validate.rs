//! Static validation.
//!
//! `validate` walks the whole model once and never fails: every violation
//! becomes a [`Diagnostic`] and every check runs regardless of what earlier
//! checks found. Attribute defaults are checked in declaration order against
//! a private environment, so a default that references an earlier attribute
//! sees the value that attribute was initialized to.

use crate::env::Environment;
use crate::error::ExprError;
use crate::eval::evaluate;
use crate::expr::{Expr, Type};
use crate::infer::{infer_type, Scope};
use crate::model::{Action, PrintValue, State, Statemachine};
use std::collections::HashSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Stable identifier for each kind of finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    DuplicateIdentifier,
    UndeclaredInitialState,
    StateNameCase,
    TypeMismatch,
    OutOfScopeReference,
    GuardNotBoolean,
    UnresolvedReference,
    UnreachableTransition,
    DivisionByZero,
    UnrecognizedOperator,
    IntegerOverflow,
    ReservedIdentifier,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::DuplicateIdentifier => "DUPLICATE_IDENTIFIER",
            DiagnosticCode::UndeclaredInitialState => "UNDECLARED_INITIAL_STATE",
            DiagnosticCode::StateNameCase => "STATE_NAME_CASE",
            DiagnosticCode::TypeMismatch => "TYPE_MISMATCH",
            DiagnosticCode::OutOfScopeReference => "OUT_OF_SCOPE_REFERENCE",
            DiagnosticCode::GuardNotBoolean => "GUARD_NOT_BOOLEAN",
            DiagnosticCode::UnresolvedReference => "UNRESOLVED_REFERENCE",
            DiagnosticCode::UnreachableTransition => "UNREACHABLE_TRANSITION",
            DiagnosticCode::DivisionByZero => "DIVISION_BY_ZERO",
            DiagnosticCode::UnrecognizedOperator => "UNRECOGNIZED_OPERATOR",
            DiagnosticCode::IntegerOverflow => "INTEGER_OVERFLOW",
            DiagnosticCode::ReservedIdentifier => "RESERVED_IDENTIFIER",
        }
    }
}

impl From<&ExprError> for DiagnosticCode {
    fn from(err: &ExprError) -> Self {
        match err {
            ExprError::UnboundReference { .. } => DiagnosticCode::UnresolvedReference,
            ExprError::OutOfScopeReference { .. } => DiagnosticCode::OutOfScopeReference,
            ExprError::TypeMismatch { .. } => DiagnosticCode::TypeMismatch,
            ExprError::DivisionByZero => DiagnosticCode::DivisionByZero,
            ExprError::UnrecognizedOperator { .. } => DiagnosticCode::UnrecognizedOperator,
            ExprError::IntegerOverflow { .. } => DiagnosticCode::IntegerOverflow,
        }
    }
}

/// The model node a diagnostic is attached to. Indices are zero-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeRef {
    Machine,
    State { state: String },
    Event { event: String },
    Command { command: String },
    Attribute { attribute: String },
    Transition { state: String, transition: usize },
    TransitionAction { state: String, transition: usize, action: usize },
    EntryAction { state: String, action: usize },
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRef::Machine => write!(f, "statemachine"),
            NodeRef::State { state } => write!(f, "state '{}'", state),
            NodeRef::Event { event } => write!(f, "event '{}'", event),
            NodeRef::Command { command } => write!(f, "command '{}'", command),
            NodeRef::Attribute { attribute } => write!(f, "attribute '{}'", attribute),
            NodeRef::Transition { state, transition } => {
                write!(f, "state '{}' transition #{}", state, transition + 1)
            }
            NodeRef::TransitionAction {
                state,
                transition,
                action,
            } => write!(
                f,
                "state '{}' transition #{} action #{}",
                state,
                transition + 1,
                action + 1
            ),
            NodeRef::EntryAction { state, action } => {
                write!(f, "state '{}' entry action #{}", state, action + 1)
            }
        }
    }
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub node: NodeRef,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, node: NodeRef, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            node,
        }
    }

    pub fn warning(code: DiagnosticCode, node: NodeRef, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            node,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[{}] {}: {}",
            self.severity,
            self.code.as_str(),
            self.node,
            self.message
        )
    }
}

/// Every diagnostic produced by one validation run, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn has_errors(&self) -> bool {
        self.items.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Validates a model.
pub fn validate(model: &Statemachine) -> Diagnostics {
    let mut validator = Validator {
        model,
        env: Environment::new(),
        diagnostics: Diagnostics::default(),
    };
    validator.run();
    validator.diagnostics
}

struct Validator<'a> {
    model: &'a Statemachine,
    /// Defaults evaluated so far, in declaration order.
    env: Environment,
    diagnostics: Diagnostics,
}

impl<'a> Validator<'a> {
    fn run(&mut self) {
        self.check_unique_names();
        self.check_generated_names();
        self.check_initial_state();
        self.check_state_names();
        self.check_attributes();
        let model = self.model;
        for state in &model.states {
            self.check_state(state);
        }
        tracing::debug!(
            "validated '{}': {} diagnostic(s)",
            self.model.name,
            self.diagnostics.len()
        );
    }

    fn check_unique_names(&mut self) {
        let model = self.model;
        let mut seen: HashSet<&str> = HashSet::new();

        let declared = model
            .attributes
            .iter()
            .map(|a| (a.name.as_str(), NodeRef::Attribute { attribute: a.name.clone() }))
            .chain(
                model
                    .events
                    .iter()
                    .map(|e| (e.name.as_str(), NodeRef::Event { event: e.name.clone() })),
            )
            .chain(
                model
                    .states
                    .iter()
                    .map(|s| (s.name.as_str(), NodeRef::State { state: s.name.clone() })),
            );

        for (name, node) in declared {
            if !seen.insert(name) {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::DuplicateIdentifier,
                    node,
                    format!("Duplicate identifier name: {}", name),
                ));
            }
        }

        let mut commands: HashSet<&str> = HashSet::new();
        for command in &model.commands {
            if !commands.insert(&command.name) {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::DuplicateIdentifier,
                    NodeRef::Command {
                        command: command.name.clone(),
                    },
                    format!("Duplicate command name: {}", command.name),
                ));
            }
        }
    }

    /// Warns about names the generated C++ cannot use as identifiers.
    fn check_generated_names(&mut self) {
        let model = self.model;

        if is_reserved(&model.name) {
            self.warn_reserved(NodeRef::Machine, &model.name);
        }
        for attribute in &model.attributes {
            if is_reserved(&attribute.name) {
                let node = NodeRef::Attribute {
                    attribute: attribute.name.clone(),
                };
                self.warn_reserved(node, &attribute.name);
            }
        }
        for event in &model.events {
            if is_reserved(&event.name) {
                let node = NodeRef::Event {
                    event: event.name.clone(),
                };
                self.warn_reserved(node, &event.name);
            }
        }
        for state in &model.states {
            let node = NodeRef::State {
                state: state.name.clone(),
            };
            if is_reserved(&state.name) {
                self.warn_reserved(node, &state.name);
            } else if state.name == model.name {
                self.diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::ReservedIdentifier,
                    node,
                    format!(
                        "State '{}' has the same name as the statemachine; the generated classes will clash.",
                        state.name
                    ),
                ));
            }
        }
    }

    fn warn_reserved(&mut self, node: NodeRef, name: &str) {
        self.diagnostics.push(Diagnostic::warning(
            DiagnosticCode::ReservedIdentifier,
            node,
            format!(
                "Name '{}' is a C++ keyword or an identifier used by the generated code.",
                name
            ),
        ));
    }

    fn check_initial_state(&mut self) {
        if self.model.state(&self.model.initial).is_none() {
            self.diagnostics.push(Diagnostic::error(
                DiagnosticCode::UndeclaredInitialState,
                NodeRef::Machine,
                format!("Initial state '{}' is not declared.", self.model.initial),
            ));
        }
    }

    fn check_state_names(&mut self) {
        let model = self.model;
        for state in &model.states {
            let capitalized = state
                .name
                .chars()
                .next()
                .is_some_and(|c| c.is_uppercase());
            if !capitalized {
                self.diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::StateNameCase,
                    NodeRef::State {
                        state: state.name.clone(),
                    },
                    "State name should start with a capital letter.",
                ));
            }
        }
    }

    fn check_attributes(&mut self) {
        let model = self.model;
        let attributes = &model.attributes[..];
        for attribute in attributes {
            let node = NodeRef::Attribute {
                attribute: attribute.name.clone(),
            };
            let mut value = attribute.ty.zero_value();

            if let Some(default) = &attribute.default {
                let scope = Scope::for_default(attributes, &attribute.name);
                match infer_type(default, &scope) {
                    Ok(ty) if ty != attribute.ty => {
                        self.diagnostics.push(Diagnostic::error(
                            DiagnosticCode::TypeMismatch,
                            node,
                            format!(
                                "Default value '{}' has type {}, but '{}' is declared {}.",
                                default, ty, attribute.name, attribute.ty
                            ),
                        ));
                    }
                    Ok(_) => match evaluate(default, &self.env) {
                        Ok(v) => value = v,
                        Err(e) => self.push_expr_error(node, &e),
                    },
                    Err(e) => self.push_expr_error(node, &e),
                }
            }

            self.env.set(&attribute.name, value);
        }
    }

    fn check_state(&mut self, state: &'a State) {
        for (index, transition) in state.transitions.iter().enumerate() {
            let node = NodeRef::Transition {
                state: state.name.clone(),
                transition: index,
            };

            if !self.model.has_event(&transition.event) {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UnresolvedReference,
                    node.clone(),
                    format!("Event '{}' is not declared.", transition.event),
                ));
            }
            if self.model.state(&transition.target).is_none() {
                self.diagnostics.push(Diagnostic::error(
                    DiagnosticCode::UnresolvedReference,
                    node.clone(),
                    format!("Target state '{}' is not declared.", transition.target),
                ));
            }

            let shadowed = state.transitions[..index]
                .iter()
                .any(|t| t.event == transition.event);
            if shadowed {
                self.diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::UnreachableTransition,
                    node.clone(),
                    format!(
                        "An earlier transition of '{}' already handles '{}'; this one never fires.",
                        state.name, transition.event
                    ),
                ));
            }

            if let Some(guard) = &transition.guard {
                match self.infer(guard) {
                    Ok(Type::Bool) => {}
                    Ok(found) => self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::GuardNotBoolean,
                        node.clone(),
                        format!("Guard '{}' has type {}, expected bool.", guard, found),
                    )),
                    Err(e) => self.push_expr_error(node.clone(), &e),
                }
            }

            for (action_index, action) in transition.actions.iter().enumerate() {
                let node = NodeRef::TransitionAction {
                    state: state.name.clone(),
                    transition: index,
                    action: action_index,
                };
                self.check_action(action, node);
            }
        }

        for (index, action) in state.actions.iter().enumerate() {
            let node = NodeRef::EntryAction {
                state: state.name.clone(),
                action: index,
            };
            self.check_action(action, node);
        }
    }

    fn check_action(&mut self, action: &Action, node: NodeRef) {
        match action {
            Action::Assign { attribute, value } => {
                let declared = match self.model.attribute(attribute) {
                    Some(a) => Some(a.ty),
                    None => {
                        self.diagnostics.push(Diagnostic::error(
                            DiagnosticCode::UnresolvedReference,
                            node.clone(),
                            format!("Attribute '{}' is not declared.", attribute),
                        ));
                        None
                    }
                };
                match self.infer(value) {
                    Ok(ty) => {
                        if let Some(declared) = declared.filter(|d| *d != ty) {
                            self.diagnostics.push(Diagnostic::error(
                                DiagnosticCode::TypeMismatch,
                                node,
                                format!(
                                    "Cannot assign {} value '{}' to {} attribute '{}'.",
                                    ty, value, declared, attribute
                                ),
                            ));
                        }
                    }
                    Err(e) => self.push_expr_error(node, &e),
                }
            }
            Action::Print { values } => {
                for value in values {
                    if let PrintValue::Expr(expr) = value {
                        if let Err(e) = self.infer(expr) {
                            self.push_expr_error(node.clone(), &e);
                        }
                    }
                }
            }
            Action::Timeout { .. } => {}
            Action::Run { command } => {
                if !self.model.has_command(command) {
                    self.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::UnresolvedReference,
                        node,
                        format!("Command '{}' is not declared.", command),
                    ));
                }
            }
        }
    }

    fn infer(&self, expr: &Expr) -> Result<Type, ExprError> {
        infer_type(expr, &Scope::new(&self.model.attributes))
    }

    fn push_expr_error(&mut self, node: NodeRef, err: &ExprError) {
        self.diagnostics
            .push(Diagnostic::error(DiagnosticCode::from(err), node, err.to_string()));
    }
}

/// C++ keywords plus the identifiers `codegen` declares itself.
const RESERVED_NAMES: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bitand", "bitor", "bool", "break", "case",
    "catch", "char", "class", "compl", "const", "constexpr", "const_cast", "continue",
    "decltype", "default", "delete", "do", "double", "dynamic_cast", "else", "enum",
    "explicit", "export", "extern", "false", "float", "for", "friend", "goto", "if", "inline",
    "int", "long", "mutable", "namespace", "new", "noexcept", "not", "nullptr", "operator",
    "or", "private", "protected", "public", "register", "reinterpret_cast", "return", "short",
    "signed", "sizeof", "static", "static_assert", "static_cast", "struct", "switch",
    "template", "this", "throw", "true", "try", "typedef", "typeid", "typename", "union",
    "unsigned", "using", "virtual", "void", "volatile", "while", "xor",
    // generated
    "State", "Event", "main", "std", "statemachine", "state", "set_context", "get_name",
    "transition_to", "new_state", "initial_state", "event_by_name", "event_by_name_it",
    "input", "event_invoker",
];

fn is_reserved(name: &str) -> bool {
    RESERVED_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::BinOp;
    use crate::model::{Attribute, Command, Event, Transition};
    use proptest::prelude::*;

    fn attr(name: &str, ty: Type, default: Option<Expr>) -> Attribute {
        Attribute {
            name: name.to_string(),
            ty,
            default,
        }
    }

    fn transition(event: &str, target: &str, guard: Option<Expr>, actions: Vec<Action>) -> Transition {
        Transition {
            event: event.to_string(),
            guard,
            target: target.to_string(),
            actions,
        }
    }

    fn state(name: &str, transitions: Vec<Transition>) -> State {
        State {
            name: name.to_string(),
            transitions,
            actions: Vec::new(),
        }
    }

    fn light_switch() -> Statemachine {
        Statemachine {
            name: "LightSwitch".to_string(),
            attributes: vec![attr("count", Type::Int, Some(Expr::int(0)))],
            events: vec![Event {
                name: "toggle".to_string(),
            }],
            commands: vec![Command {
                name: "beep".to_string(),
            }],
            states: vec![
                state(
                    "Off",
                    vec![transition(
                        "toggle",
                        "On",
                        Some(Expr::bin(BinOp::Lt, Expr::reference("count"), Expr::int(3))),
                        vec![Action::Assign {
                            attribute: "count".to_string(),
                            value: Expr::bin(BinOp::Add, Expr::reference("count"), Expr::int(1)),
                        }],
                    )],
                ),
                state("On", vec![transition("toggle", "Off", None, vec![])]),
            ],
            initial: "Off".to_string(),
        }
    }

    fn codes(diagnostics: &Diagnostics) -> Vec<DiagnosticCode> {
        diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn test_valid_model_is_clean() {
        let diagnostics = validate(&light_switch());
        assert!(diagnostics.is_empty(), "{:?}", diagnostics);
    }

    #[test]
    fn test_names_reserved_by_generated_code() {
        let mut model = light_switch();
        model.attributes.push(attr("class", Type::Bool, Some(Expr::bool(false))));
        model.events.push(Event {
            name: "delete".to_string(),
        });
        model.states.push(state("State", vec![]));
        model.states.push(state("LightSwitch", vec![]));

        let diagnostics = validate(&model);
        assert!(!diagnostics.has_errors(), "{:?}", diagnostics);

        let flagged: Vec<&NodeRef> = diagnostics
            .warnings()
            .filter(|d| d.code == DiagnosticCode::ReservedIdentifier)
            .map(|d| &d.node)
            .collect();
        assert_eq!(
            flagged,
            vec![
                &NodeRef::Attribute { attribute: "class".to_string() },
                &NodeRef::Event { event: "delete".to_string() },
                &NodeRef::State { state: "State".to_string() },
                &NodeRef::State { state: "LightSwitch".to_string() },
            ]
        );
    }

    #[test]
    fn test_default_may_reference_earlier_attribute() {
        // cnt : int = 89
        // isEmpty : bool = cnt > 10 || cnt < 20-7
        let mut model = light_switch();
        model.attributes = vec![
            attr("cnt", Type::Int, Some(Expr::int(89))),
            attr(
                "isEmpty",
                Type::Bool,
                Some(Expr::bin(
                    BinOp::Or,
                    Expr::bin(BinOp::Gt, Expr::reference("cnt"), Expr::int(10)),
                    Expr::bin(
                        BinOp::Lt,
                        Expr::reference("cnt"),
                        Expr::bin(BinOp::Sub, Expr::int(20), Expr::int(7)),
                    ),
                )),
            ),
            attr("count", Type::Int, None),
        ];

        assert!(validate(&model).is_empty());
        let env = Environment::init(&model.attributes).unwrap();
        assert_eq!(env.get("isEmpty"), Some(crate::expr::Value::Bool(true)));
    }

    #[test]
    fn test_self_and_forward_references() {
        let mut model = light_switch();
        model.attributes = vec![
            attr("a", Type::Int, Some(Expr::reference("b"))),
            attr("b", Type::Int, Some(Expr::reference("b"))),
            attr("count", Type::Int, None),
        ];

        let diagnostics = validate(&model);
        assert_eq!(
            codes(&diagnostics),
            vec![
                DiagnosticCode::OutOfScopeReference,
                DiagnosticCode::OutOfScopeReference
            ]
        );
        assert_eq!(
            diagnostics.iter().next().unwrap().node,
            NodeRef::Attribute {
                attribute: "a".to_string()
            }
        );
    }

    #[test]
    fn test_default_type_mismatch() {
        let mut model = light_switch();
        model.attributes.push(attr("flag", Type::Bool, Some(Expr::int(1))));

        let diagnostics = validate(&model);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::TypeMismatch]);
    }

    #[test]
    fn test_duplicates_reported_beyond_first() {
        let mut model = light_switch();
        model.events.push(Event {
            name: "count".to_string(),
        });
        model.states.push(state("On", vec![]));
        model.commands.push(Command {
            name: "beep".to_string(),
        });

        let diagnostics = validate(&model);
        let duplicates: Vec<_> = diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::DuplicateIdentifier)
            .map(|d| d.node.clone())
            .collect();
        assert_eq!(
            duplicates,
            vec![
                NodeRef::Event {
                    event: "count".to_string()
                },
                NodeRef::State {
                    state: "On".to_string()
                },
                NodeRef::Command {
                    command: "beep".to_string()
                },
            ]
        );
        assert_eq!(
            diagnostics.iter().next().unwrap().message,
            "Duplicate identifier name: count"
        );
    }

    #[test]
    fn test_undeclared_initial_state() {
        let mut model = light_switch();
        model.initial = "Missing".to_string();

        let diagnostics = validate(&model);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::UndeclaredInitialState]);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn test_lowercase_state_is_warning() {
        let mut model = light_switch();
        model.states.push(state("idle", vec![]));

        let diagnostics = validate(&model);
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.warnings().count(), 1);
        assert_eq!(
            diagnostics.iter().next().unwrap().message,
            "State name should start with a capital letter."
        );
    }

    #[test]
    fn test_guard_must_be_bool() {
        let mut model = light_switch();
        model.states[1].transitions[0].guard = Some(Expr::reference("count"));

        let diagnostics = validate(&model);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::GuardNotBoolean]);
    }

    #[test]
    fn test_assignment_checks() {
        let mut model = light_switch();
        model.states[1].transitions[0].actions = vec![
            Action::Assign {
                attribute: "count".to_string(),
                value: Expr::bool(true),
            },
            Action::Assign {
                attribute: "missing".to_string(),
                value: Expr::int(1),
            },
        ];

        let diagnostics = validate(&model);
        assert_eq!(
            codes(&diagnostics),
            vec![DiagnosticCode::TypeMismatch, DiagnosticCode::UnresolvedReference]
        );
        assert_eq!(
            diagnostics.iter().nth(1).unwrap().node,
            NodeRef::TransitionAction {
                state: "On".to_string(),
                transition: 0,
                action: 1
            }
        );
    }

    #[test]
    fn test_print_accepts_any_type_but_checks_refs() {
        let mut model = light_switch();
        model.states[0].actions = vec![Action::Print {
            values: vec![
                PrintValue::Text("count=".to_string()),
                PrintValue::Expr(Expr::reference("count")),
                PrintValue::Expr(Expr::bin(BinOp::Gt, Expr::reference("count"), Expr::int(0))),
                PrintValue::Expr(Expr::reference("nope")),
            ],
        }];

        let diagnostics = validate(&model);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::UnresolvedReference]);
        assert!(matches!(
            diagnostics.iter().next().unwrap().node,
            NodeRef::EntryAction { action: 0, .. }
        ));
    }

    #[test]
    fn test_unresolved_references() {
        let mut model = light_switch();
        model.states[1].transitions[0] = transition(
            "flip",
            "Nowhere",
            None,
            vec![Action::Run {
                command: "honk".to_string(),
            }],
        );

        let diagnostics = validate(&model);
        assert_eq!(
            codes(&diagnostics),
            vec![
                DiagnosticCode::UnresolvedReference,
                DiagnosticCode::UnresolvedReference,
                DiagnosticCode::UnresolvedReference
            ]
        );
    }

    #[test]
    fn test_unreachable_transition_warning() {
        let mut model = light_switch();
        model.states[1]
            .transitions
            .push(transition("toggle", "On", None, vec![]));

        let diagnostics = validate(&model);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::UnreachableTransition]);
        assert!(!diagnostics.has_errors());
    }

    #[test]
    fn test_constant_division_by_zero() {
        let mut model = light_switch();
        model.attributes.push(attr(
            "ratio",
            Type::Int,
            Some(Expr::bin(BinOp::Div, Expr::int(10), Expr::int(0))),
        ));

        let diagnostics = validate(&model);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::DivisionByZero]);
    }

    #[test]
    fn test_runtime_division_by_zero_in_default() {
        // Divisor is not constant, so only evaluation catches it.
        let mut model = light_switch();
        model.attributes.push(attr(
            "ratio",
            Type::Int,
            Some(Expr::bin(BinOp::Div, Expr::int(10), Expr::reference("count"))),
        ));

        let diagnostics = validate(&model);
        assert_eq!(codes(&diagnostics), vec![DiagnosticCode::DivisionByZero]);
    }

    #[test]
    fn test_all_checks_run() {
        let mut model = light_switch();
        model.initial = "Missing".to_string();
        model.states.push(state("lower", vec![]));
        model.attributes.push(attr("bad", Type::Bool, Some(Expr::int(2))));

        let diagnostics = validate(&model);
        assert_eq!(
            codes(&diagnostics),
            vec![
                DiagnosticCode::UndeclaredInitialState,
                DiagnosticCode::StateNameCase,
                DiagnosticCode::TypeMismatch
            ]
        );
    }

    #[test]
    fn test_display() {
        let d = Diagnostic::error(
            DiagnosticCode::GuardNotBoolean,
            NodeRef::Transition {
                state: "Off".to_string(),
                transition: 0,
            },
            "Guard 'count' has type int, expected bool.",
        );
        assert_eq!(
            d.to_string(),
            "error[GUARD_NOT_BOOLEAN] state 'Off' transition #1: Guard 'count' has type int, expected bool."
        );
    }

    fn arb_default() -> impl Strategy<Value = Option<Expr>> {
        prop_oneof![
            Just(None),
            (-5i64..5).prop_map(|n| Some(Expr::int(n))),
            any::<bool>().prop_map(|b| Some(Expr::bool(b))),
            (0..3usize).prop_map(|i| Some(Expr::reference(["a", "b", "c"][i]))),
            (0..3usize, -3i64..3).prop_map(|(i, n)| Some(Expr::bin(
                BinOp::Div,
                Expr::reference(["a", "b", "c"][i]),
                Expr::int(n)
            ))),
        ]
    }

    proptest! {
        #[test]
        fn validation_is_idempotent(
            defaults in proptest::collection::vec(arb_default(), 3),
            types in proptest::collection::vec(any::<bool>(), 3),
        ) {
            let mut model = light_switch();
            for (i, (default, is_int)) in defaults.into_iter().zip(types).enumerate() {
                let ty = if is_int { Type::Int } else { Type::Bool };
                model.attributes.push(attr(["a", "b", "c"][i], ty, default));
            }

            prop_assert_eq!(validate(&model), validate(&model));
        }
    }
}
