//! Model documents.
//!
//! A document is the on-disk form of a model. Names are plain strings and
//! expressions are source text:
//!
//! ```yaml
//! name: LightSwitch
//! events: [toggle]
//! commands: [beep]
//! attributes:
//!   - { name: count, type: int, default: 0 }
//! initial: Off
//! states:
//!   - name: Off
//!     transitions:
//!       - event: toggle
//!         guard: count < 3
//!         target: On
//!         actions:
//!           - { assign: count, value: count + 1 }
//!           - { print: ['"count="', count] }
//!           - { timeout: 100 }
//!           - { run: beep }
//!   - name: On
//!     transitions:
//!       - { event: toggle, target: Off }
//! ```
//!
//! [`ModelDocument::into_model`] parses the expressions and checks that
//! every referenced name is declared. The initial state is left for the
//! validator to check.

use crate::error::LoadError;
use crate::syntax::{parse_expr, parse_print_value};
use fsml_core::{
    Action, Attribute, Command, Event, Expr, State, Statemachine, Transition, Type,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Expression source text. Also accepts bare numbers and booleans so that
/// `default: 0` reads naturally in YAML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExprSource(pub String);

impl ExprSource {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for ExprSource {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::{self, Visitor};

        struct ExprSourceVisitor;

        impl<'de> Visitor<'de> for ExprSourceVisitor {
            type Value = ExprSource;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("an expression string, integer or boolean")
            }

            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ExprSource(v.to_string()))
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ExprSource(v.to_string()))
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ExprSource(v.to_string()))
            }

            fn visit_bool<E>(self, v: bool) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(ExprSource(v.to_string()))
            }
        }

        deserializer.deserialize_any(ExprSourceVisitor)
    }
}

/// Root of a model document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDocument {
    pub name: String,

    #[serde(default)]
    pub events: Vec<String>,

    #[serde(default)]
    pub commands: Vec<String>,

    #[serde(default)]
    pub attributes: Vec<AttributeDoc>,

    pub initial: String,

    pub states: Vec<StateDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttributeDoc {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<ExprSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateDoc {
    pub name: String,

    /// Entry actions.
    #[serde(default)]
    pub actions: Vec<ActionDoc>,

    #[serde(default)]
    pub transitions: Vec<TransitionDoc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransitionDoc {
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<ExprSource>,

    pub target: String,

    #[serde(default)]
    pub actions: Vec<ActionDoc>,
}

/// An action, told apart by its key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionDoc {
    Assign { assign: String, value: ExprSource },
    Print { print: Vec<ExprSource> },
    Timeout { timeout: u64 },
    Run { run: String },
}

impl ModelDocument {
    /// Parses a JSON document.
    pub fn from_json_str(s: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(s)?)
    }

    /// Parses a YAML document.
    pub fn from_yaml_str(s: &str) -> Result<Self, LoadError> {
        Ok(serde_yaml::from_str(s)?)
    }

    /// Builds the resolved model.
    ///
    /// Syntax errors and unsupported types fail immediately. Unresolved
    /// names are collected and reported together.
    pub fn into_model(self) -> Result<Statemachine, LoadError> {
        let mut resolver = Resolver {
            events: self.events.iter().map(String::as_str).collect(),
            commands: self.commands.iter().map(String::as_str).collect(),
            states: self.states.iter().map(|s| s.name.as_str()).collect(),
            attributes: self.attributes.iter().map(|a| a.name.as_str()).collect(),
            unresolved: Vec::new(),
        };

        let mut attributes = Vec::with_capacity(self.attributes.len());
        for doc in &self.attributes {
            let ty: Type = doc
                .ty
                .parse()
                .map_err(|_| LoadError::UnsupportedAttributeType { ty: doc.ty.clone() })?;
            let default = match &doc.default {
                Some(src) => Some(resolver.expr(src, &format!("attribute '{}'", doc.name))?),
                None => None,
            };
            attributes.push(Attribute {
                name: doc.name.clone(),
                ty,
                default,
            });
        }

        let mut states = Vec::with_capacity(self.states.len());
        for doc in &self.states {
            let mut transitions = Vec::with_capacity(doc.transitions.len());
            for t in &doc.transitions {
                let context = format!("state '{}' on '{}'", doc.name, t.event);
                let known = resolver.events.contains(t.event.as_str());
                resolver.check_name(known, &t.event, "event", &context);
                let known = resolver.states.contains(t.target.as_str());
                resolver.check_name(known, &t.target, "state", &context);

                let guard = match &t.guard {
                    Some(src) => Some(resolver.expr(src, &context)?),
                    None => None,
                };
                transitions.push(Transition {
                    event: t.event.clone(),
                    guard,
                    target: t.target.clone(),
                    actions: resolver.actions(&t.actions, &context)?,
                });
            }

            states.push(State {
                name: doc.name.clone(),
                transitions,
                actions: resolver.actions(&doc.actions, &format!("state '{}'", doc.name))?,
            });
        }

        if !resolver.unresolved.is_empty() {
            return Err(LoadError::Unresolved {
                names: resolver.unresolved,
            });
        }

        tracing::debug!(
            "loaded model '{}': {} states, {} events, {} attributes",
            self.name,
            states.len(),
            self.events.len(),
            attributes.len()
        );

        Ok(Statemachine {
            name: self.name.clone(),
            attributes,
            events: self
                .events
                .iter()
                .map(|name| Event { name: name.clone() })
                .collect(),
            commands: self
                .commands
                .iter()
                .map(|name| Command { name: name.clone() })
                .collect(),
            states,
            initial: self.initial.clone(),
        })
    }
}

/// Declared names, plus every reference that failed to resolve.
struct Resolver<'a> {
    events: HashSet<&'a str>,
    commands: HashSet<&'a str>,
    states: HashSet<&'a str>,
    attributes: HashSet<&'a str>,
    unresolved: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn check_name(&mut self, known: bool, name: &str, kind: &str, context: &str) {
        if !known {
            let entry = format!("{} '{}' ({})", kind, name, context);
            if !self.unresolved.contains(&entry) {
                self.unresolved.push(entry);
            }
        }
    }

    fn expr(&mut self, src: &ExprSource, context: &str) -> Result<Expr, LoadError> {
        let expr = parse_expr(src.as_str())?;
        self.check_refs(&expr, context);
        Ok(expr)
    }

    fn check_refs(&mut self, expr: &Expr, context: &str) {
        for name in expr.references() {
            let known = self.attributes.contains(name);
            self.check_name(known, name, "attribute", context);
        }
    }

    fn actions(&mut self, docs: &[ActionDoc], context: &str) -> Result<Vec<Action>, LoadError> {
        let mut actions = Vec::with_capacity(docs.len());
        for doc in docs {
            let action = match doc {
                ActionDoc::Assign { assign, value } => {
                    let known = self.attributes.contains(assign.as_str());
                    self.check_name(known, assign, "attribute", context);
                    Action::Assign {
                        attribute: assign.clone(),
                        value: self.expr(value, context)?,
                    }
                }
                ActionDoc::Print { print } => {
                    let mut values = Vec::with_capacity(print.len());
                    for src in print {
                        let value = parse_print_value(src.as_str())?;
                        if let fsml_core::PrintValue::Expr(expr) = &value {
                            self.check_refs(expr, context);
                        }
                        values.push(value);
                    }
                    Action::Print { values }
                }
                ActionDoc::Timeout { timeout } => Action::Timeout { millis: *timeout },
                ActionDoc::Run { run } => {
                    let known = self.commands.contains(run.as_str());
                    self.check_name(known, run, "command", context);
                    Action::Run {
                        command: run.clone(),
                    }
                }
            };
            actions.push(action);
        }
        Ok(actions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsml_core::{BinOp, PrintValue};

    const LIGHT_SWITCH_JSON: &str = r#"{
        "name": "LightSwitch",
        "events": ["toggle"],
        "commands": ["beep"],
        "attributes": [
            {"name": "count", "type": "int", "default": "0"},
            {"name": "isOn", "type": "bool"}
        ],
        "initial": "Off",
        "states": [
            {"name": "Off", "actions": [{"print": ["\"ready\""]}],
             "transitions": [{"event": "toggle", "guard": "count < 3", "target": "On",
                              "actions": [{"assign": "count", "value": "count + 1"},
                                          {"print": ["\"count=\"", "count"]},
                                          {"timeout": 100}, {"run": "beep"}]}]},
            {"name": "On", "transitions": [{"event": "toggle", "target": "Off"}]}
        ]
    }"#;

    #[test]
    fn test_json_document() {
        let model = ModelDocument::from_json_str(LIGHT_SWITCH_JSON)
            .unwrap()
            .into_model()
            .unwrap();

        assert_eq!(model.name, "LightSwitch");
        assert_eq!(model.attributes[0].default, Some(Expr::int(0)));
        assert_eq!(model.attributes[1].ty, Type::Bool);
        assert_eq!(model.attributes[1].default, None);

        let t = &model.states[0].transitions[0];
        assert_eq!(
            t.guard,
            Some(Expr::bin(BinOp::Lt, Expr::reference("count"), Expr::int(3)))
        );
        assert_eq!(
            t.actions,
            vec![
                Action::Assign {
                    attribute: "count".to_string(),
                    value: Expr::bin(BinOp::Add, Expr::reference("count"), Expr::int(1)),
                },
                Action::Print {
                    values: vec![
                        PrintValue::Text("count=".to_string()),
                        PrintValue::Expr(Expr::reference("count")),
                    ],
                },
                Action::Timeout { millis: 100 },
                Action::Run {
                    command: "beep".to_string(),
                },
            ]
        );
        assert_eq!(
            model.states[0].actions,
            vec![Action::Print {
                values: vec![PrintValue::Text("ready".to_string())]
            }]
        );
    }

    #[test]
    fn test_yaml_document_with_bare_scalars() {
        let yaml = r#"
name: Flags
events: [flip]
attributes:
  - { name: n, type: int, default: 5 }
  - { name: lit, type: bool, default: true }
  - { name: big, type: bool, default: n > 3 }
initial: Idle
states:
  - name: Idle
    transitions:
      - { event: flip, guard: "!lit", target: Idle, actions: [{ assign: lit, value: "!lit" }] }
"#;
        let model = ModelDocument::from_yaml_str(yaml).unwrap().into_model().unwrap();

        assert_eq!(model.attributes[0].default, Some(Expr::int(5)));
        assert_eq!(model.attributes[1].default, Some(Expr::bool(true)));
        assert_eq!(
            model.attributes[2].default,
            Some(Expr::bin(BinOp::Gt, Expr::reference("n"), Expr::int(3)))
        );
        assert_eq!(
            model.states[0].transitions[0].guard,
            Some(Expr::not(Expr::reference("lit")))
        );
    }

    #[test]
    fn test_unresolved_names_are_collected() {
        let json = r#"{
            "name": "Broken",
            "events": ["go"],
            "initial": "A",
            "states": [
                {"name": "A", "transitions": [
                    {"event": "stop", "target": "B", "guard": "ready",
                     "actions": [{"assign": "x", "value": "1"}, {"run": "honk"}]}
                ]}
            ]
        }"#;

        let err = ModelDocument::from_json_str(json)
            .unwrap()
            .into_model()
            .unwrap_err();
        let LoadError::Unresolved { names } = err else {
            panic!("expected unresolved error, got {:?}", err);
        };
        assert_eq!(
            names,
            vec![
                "event 'stop' (state 'A' on 'stop')",
                "state 'B' (state 'A' on 'stop')",
                "attribute 'ready' (state 'A' on 'stop')",
                "attribute 'x' (state 'A' on 'stop')",
                "command 'honk' (state 'A' on 'stop')",
            ]
        );
    }

    #[test]
    fn test_undeclared_initial_state_is_kept() {
        let json = r#"{"name": "M", "initial": "Nowhere", "states": [{"name": "A"}]}"#;
        let model = ModelDocument::from_json_str(json).unwrap().into_model().unwrap();
        assert_eq!(model.initial, "Nowhere");
    }

    #[test]
    fn test_unsupported_attribute_type() {
        let json = r#"{"name": "M", "initial": "A", "states": [{"name": "A"}],
                       "attributes": [{"name": "x", "type": "float"}]}"#;
        let err = ModelDocument::from_json_str(json)
            .unwrap()
            .into_model()
            .unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedAttributeType { ty } if ty == "float"));
    }

    #[test]
    fn test_syntax_error_in_guard() {
        let json = r#"{"name": "M", "events": ["e"], "initial": "A",
                       "states": [{"name": "A", "transitions": [{"event": "e", "target": "A", "guard": "(a"}]}]}"#;
        let err = ModelDocument::from_json_str(json)
            .unwrap()
            .into_model()
            .unwrap_err();
        assert_eq!(err.error_code(), "SYNTAX_ERROR");
    }
}
