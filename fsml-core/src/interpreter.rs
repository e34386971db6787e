//! Event-driven interpreter.
//!
//! One `Interpreter` is one interpretation session: it owns the session's
//! [`Environment`] and the index of the current state. Events are handled one
//! at a time; a transition's actions, including any delay, complete before
//! the next event is looked at.

use crate::env::Environment;
use crate::error::{CoreError, ExprError};
use crate::eval::{evaluate, GuardEvaluator};
use crate::model::{Action, PrintValue, Statemachine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// One line of user-visible interpretation output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceLine {
    /// Session started in `state`.
    Entered { state: String },
    Transitioned { from: String, to: String },
    /// Guard evaluated to false.
    NotAllowed,
    NoTransition { event: String, state: String },
    Print { text: String },
    Command { command: String },
    Delay { millis: u64 },
    UnknownEvent { event: String, machine: String },
}

impl fmt::Display for TraceLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceLine::Entered { state } => write!(f, "[{}]", state),
            TraceLine::Transitioned { from, to } => write!(f, "{} ==> {}", from, to),
            TraceLine::NotAllowed => write!(f, "Transition not allowed."),
            TraceLine::NoTransition { event, state } => {
                write!(f, "No transition for event {} in state {}.", event, state)
            }
            TraceLine::Print { text } => f.write_str(text),
            TraceLine::Command { command } => write!(f, "Run Command: {}()", command),
            TraceLine::Delay { millis } => {
                write!(f, "Delaying transition for {} milliseconds...", millis)
            }
            TraceLine::UnknownEvent { event, machine } => {
                write!(f, "There is no event {} in the {} statemachine.", event, machine)
            }
        }
    }
}

/// Receives trace lines as they are produced.
pub trait TraceSink {
    fn emit(&mut self, line: TraceLine);
}

impl TraceSink for Vec<TraceLine> {
    fn emit(&mut self, line: TraceLine) {
        self.push(line);
    }
}

impl<S: TraceSink + ?Sized> TraceSink for &mut S {
    fn emit(&mut self, line: TraceLine) {
        (**self).emit(line);
    }
}

/// Blocking pause used by timeout actions.
pub trait Delay: Send {
    fn pause(&self, duration: Duration);
}

/// Sleeps the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadSleep;

impl Delay for ThreadSleep {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// When state entry actions run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryActions {
    /// Only the initial state's, once, at session start.
    #[default]
    InitialOnly,
    /// Also on every transition into a state, after it is reported.
    EveryEntry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpreterOptions {
    pub entry_actions: EntryActions,
    /// When false, timeouts are traced but do not pause.
    pub honor_delays: bool,
}

impl Default for InterpreterOptions {
    fn default() -> Self {
        Self {
            entry_actions: EntryActions::InitialOnly,
            honor_delays: true,
        }
    }
}

/// What happened to one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Fired { from: String, to: String },
    GuardRejected,
    NoTransition,
    UnknownEvent,
}

/// An interpretation session over one model.
pub struct Interpreter {
    model: Arc<Statemachine>,
    env: Environment,
    current: usize,
    options: InterpreterOptions,
    delay: Box<dyn Delay>,
    started: bool,
}

impl Interpreter {
    /// Creates a session: initializes attributes and resolves the initial state.
    pub fn new(model: Arc<Statemachine>, options: InterpreterOptions) -> Result<Self, CoreError> {
        let current = initial_index(&model)?;
        let env = Environment::init(&model.attributes)?;

        Ok(Self {
            model,
            env,
            current,
            options,
            delay: Box::new(ThreadSleep),
            started: false,
        })
    }

    /// Replaces the delay implementation.
    pub fn with_delay(mut self, delay: impl Delay + 'static) -> Self {
        self.delay = Box::new(delay);
        self
    }

    pub fn model(&self) -> &Statemachine {
        &self.model
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn options(&self) -> InterpreterOptions {
        self.options
    }

    pub fn current_state(&self) -> &str {
        &self.model.states[self.current].name
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Reports the initial state and runs its entry actions. Does nothing
    /// once the session has started.
    pub fn start(&mut self, sink: &mut dyn TraceSink) -> Result<(), CoreError> {
        if self.started {
            return Ok(());
        }
        self.started = true;

        let model = Arc::clone(&self.model);
        let state = &model.states[self.current];
        tracing::info!("session started for '{}' in state '{}'", model.name, state.name);

        sink.emit(TraceLine::Entered {
            state: state.name.clone(),
        });
        self.run_actions(&model, &state.actions, sink)
    }

    /// Handles one event. Starts the session first if needed.
    ///
    /// Rejections are outcomes, not errors. An error means the session
    /// cannot continue: the model was run without passing validation.
    pub fn dispatch(&mut self, event: &str, sink: &mut dyn TraceSink) -> Result<Outcome, CoreError> {
        self.start(sink)?;

        let model = Arc::clone(&self.model);
        if !model.has_event(event) {
            tracing::warn!("event '{}' is not declared by '{}'", event, model.name);
            sink.emit(TraceLine::UnknownEvent {
                event: event.to_string(),
                machine: model.name.clone(),
            });
            return Ok(Outcome::UnknownEvent);
        }

        let state = &model.states[self.current];
        tracing::debug!("dispatching '{}' in state '{}'", event, state.name);

        let Some(transition) = state.transition_for(event) else {
            sink.emit(TraceLine::NoTransition {
                event: event.to_string(),
                state: state.name.clone(),
            });
            return Ok(Outcome::NoTransition);
        };

        match GuardEvaluator::evaluate_opt(transition.guard.as_ref(), &self.env)? {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!("guard of '{}' on '{}' rejected the transition", state.name, event);
                sink.emit(TraceLine::NotAllowed);
                return Ok(Outcome::GuardRejected);
            }
            Err(found) => {
                return Err(CoreError::GuardNotBoolean {
                    state: state.name.clone(),
                    event: event.to_string(),
                    found,
                })
            }
        }

        let target = model
            .state_index(&transition.target)
            .ok_or_else(|| CoreError::UnknownState {
                state: transition.target.clone(),
            })?;

        self.run_actions(&model, &transition.actions, sink)?;

        let to = &model.states[target];
        tracing::debug!("transition {} -> {}", state.name, to.name);
        sink.emit(TraceLine::Transitioned {
            from: state.name.clone(),
            to: to.name.clone(),
        });
        self.current = target;

        if self.options.entry_actions == EntryActions::EveryEntry {
            self.run_actions(&model, &to.actions, sink)?;
        }

        Ok(Outcome::Fired {
            from: state.name.clone(),
            to: to.name.clone(),
        })
    }

    /// Runs a whole event sequence.
    ///
    /// Every name is checked before anything runs; if any is undeclared the
    /// batch is refused with `UnknownEvents`.
    pub fn run_batch<S: AsRef<str>>(
        &mut self,
        events: &[S],
        sink: &mut dyn TraceSink,
    ) -> Result<Vec<Outcome>, CoreError> {
        let unknown: Vec<String> = events
            .iter()
            .map(AsRef::as_ref)
            .filter(|e| !self.model.has_event(e))
            .map(str::to_string)
            .collect();
        if !unknown.is_empty() {
            return Err(CoreError::UnknownEvents { events: unknown });
        }

        self.start(sink)?;
        let mut outcomes = Vec::with_capacity(events.len());
        for event in events {
            outcomes.push(self.dispatch(event.as_ref(), sink)?);
        }
        Ok(outcomes)
    }

    /// Returns to the initial state with freshly initialized attributes.
    pub fn reset(&mut self) -> Result<(), CoreError> {
        self.current = initial_index(&self.model)?;
        self.env = Environment::init(&self.model.attributes)?;
        self.started = false;
        tracing::debug!("session for '{}' reset", self.model.name);
        Ok(())
    }

    fn run_actions(
        &mut self,
        model: &Statemachine,
        actions: &[Action],
        sink: &mut dyn TraceSink,
    ) -> Result<(), CoreError> {
        for action in actions {
            self.run_action(model, action, sink)?;
        }
        Ok(())
    }

    fn run_action(
        &mut self,
        model: &Statemachine,
        action: &Action,
        sink: &mut dyn TraceSink,
    ) -> Result<(), CoreError> {
        match action {
            Action::Assign { attribute, value } => {
                let declared = model
                    .attribute(attribute)
                    .ok_or_else(|| CoreError::UnknownAttribute {
                        attribute: attribute.clone(),
                    })?;
                let value = evaluate(value, &self.env)?;
                if value.ty() != declared.ty {
                    return Err(ExprError::TypeMismatch {
                        context: format!("assignment to '{}'", attribute),
                        expected: declared.ty,
                        found: value.ty(),
                    }
                    .into());
                }
                tracing::debug!("{} = {}", attribute, value);
                self.env.set(attribute, value);
            }
            Action::Print { values } => {
                let mut text = String::new();
                for value in values {
                    match value {
                        PrintValue::Text(s) => text.push_str(s),
                        PrintValue::Expr(expr) => text.push_str(&evaluate(expr, &self.env)?.to_string()),
                    }
                }
                sink.emit(TraceLine::Print { text });
            }
            Action::Timeout { millis } => {
                sink.emit(TraceLine::Delay { millis: *millis });
                if self.options.honor_delays {
                    self.delay.pause(Duration::from_millis(*millis));
                }
            }
            Action::Run { command } => {
                sink.emit(TraceLine::Command {
                    command: command.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Interpreter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Interpreter")
            .field("machine", &self.model.name)
            .field("current", &self.current_state())
            .field("env", &self.env)
            .field("options", &self.options)
            .field("started", &self.started)
            .finish()
    }
}

fn initial_index(model: &Statemachine) -> Result<usize, CoreError> {
    model
        .state_index(&model.initial)
        .ok_or_else(|| CoreError::UndeclaredInitialState {
            state: model.initial.clone(),
        })
}
