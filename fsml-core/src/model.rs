//! Statemachine model types.
//!
//! A model arrives fully resolved: every event, state, attribute and command
//! named by a transition or action is expected to be declared. The
//! validator still re-checks those references, so a hand-built model that
//! breaks them produces diagnostics instead of panics.
//!
//! Models serialize to JSON in the following shape:
//!
//! ```json
//! {
//!   "name": "LightSwitch",
//!   "attributes": [{"name": "count", "type": "int", "default": {"kind": "literal", "value": 0}}],
//!   "events": [{"name": "toggle"}],
//!   "commands": [],
//!   "states": [
//!     {"name": "Off", "transitions": [{"event": "toggle", "target": "On", "actions": []}], "actions": []},
//!     {"name": "On", "transitions": [{"event": "toggle", "target": "Off", "actions": []}], "actions": []}
//!   ],
//!   "initial": "Off"
//! }
//! ```

use crate::error::CoreError;
use crate::expr::{Expr, Type};
use serde::{Deserialize, Serialize};

/// The root model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statemachine {
    pub name: String,

    /// Attributes in declaration order.
    #[serde(default)]
    pub attributes: Vec<Attribute>,

    #[serde(default)]
    pub events: Vec<Event>,

    #[serde(default)]
    pub commands: Vec<Command>,

    pub states: Vec<State>,

    /// Name of the initial state. Not guaranteed to be declared.
    pub initial: String,
}

/// A typed attribute with an optional initializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub name: String,

    #[serde(rename = "type")]
    pub ty: Type,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub name: String,
}

/// Inert named command, only ever traced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub name: String,

    #[serde(default)]
    pub transitions: Vec<Transition>,

    /// Entry actions.
    #[serde(default)]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub event: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guard: Option<Expr>,

    pub target: String,

    #[serde(default)]
    pub actions: Vec<Action>,
}

/// A side effect run when a transition fires or a state is entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    Assign { attribute: String, value: Expr },
    Print { values: Vec<PrintValue> },
    Timeout { millis: u64 },
    Run { command: String },
}

/// One element of a print action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintValue {
    Text(String),
    Expr(Expr),
}

impl Statemachine {
    /// Parses a model from its JSON form.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, CoreError> {
        Ok(serde_json::from_value(json.clone())?)
    }

    /// Returns the model as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, CoreError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn state(&self, name: &str) -> Option<&State> {
        self.states.iter().find(|s| s.name == name)
    }

    pub fn state_index(&self, name: &str) -> Option<usize> {
        self.states.iter().position(|s| s.name == name)
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name == name)
    }

    pub fn has_event(&self, name: &str) -> bool {
        self.events.iter().any(|e| e.name == name)
    }

    pub fn has_command(&self, name: &str) -> bool {
        self.commands.iter().any(|c| c.name == name)
    }

    /// Resolves the initial state.
    pub fn initial_state(&self) -> Result<&State, CoreError> {
        self.state(&self.initial)
            .ok_or_else(|| CoreError::UndeclaredInitialState {
                state: self.initial.clone(),
            })
    }

    /// Returns the distinct events handled by a state, in declaration order.
    pub fn events_from(&self, state: &str) -> Vec<&str> {
        let mut events: Vec<&str> = Vec::new();
        if let Some(state) = self.state(state) {
            for t in &state.transitions {
                if !events.contains(&t.event.as_str()) {
                    events.push(&t.event);
                }
            }
        }
        events
    }
}

impl State {
    /// Returns the transition that handles `event`: the first one declared.
    pub fn transition_for(&self, event: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.event == event)
    }
}
