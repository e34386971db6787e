//! C++ code generation.
//!
//! Translates a validated model into a single C++ source file built on the
//! State pattern: an abstract `State` with one virtual handler per event, a
//! context class that owns the current state and the attributes, one class
//! per declared state, and a `main` that reads event names from stdin.
//!
//! Attribute defaults are folded to constants with a private environment.
//! Nothing else is evaluated; guards and actions are translated as text.

use crate::env::Environment;
use crate::error::{CoreError, ExprError};
use crate::eval::evaluate;
use crate::expr::{Expr, Type, Value};
use crate::model::{Action, PrintValue, State, Statemachine, Transition};

/// Prefix that reaches the context object from a state handler or `main`.
pub const CONTEXT_PREFIX: &str = "statemachine->";

/// Generates the C++ translation of `model`.
pub fn generate(model: &Statemachine) -> Result<String, CoreError> {
    let initial = model.initial_state()?;
    let defaults = fold_defaults(model)?;

    let mut w = CodeWriter::default();
    w.line("#include <iostream>");
    w.line("#include <map>");
    w.line("#include <string>");
    w.line("#include <chrono>");
    w.line("#include <thread>");
    w.blank();
    w.line(&format!("class {};", model.name));
    w.blank();

    emit_state_base(&mut w, model);
    w.blank();
    emit_context_class(&mut w, model, &defaults);
    w.blank();

    for state in &model.states {
        emit_state_declaration(&mut w, state);
        w.blank();
    }
    for state in &model.states {
        emit_state_definition(&mut w, state);
    }

    w.line(&format!("typedef void ({}::*Event)();", model.name));
    w.blank();
    emit_main(&mut w, model, initial);

    tracing::debug!("generated C++ for '{}'", model.name);
    Ok(w.finish())
}

/// Output file name for `model`, e.g. `LightSwitch.cpp`.
pub fn generate_file_name(model: &Statemachine, extension: &str) -> String {
    format!("{}.{}", model.name, extension.trim_start_matches('.'))
}

/// Translates an expression to C++, prefixing every attribute reference.
///
/// Every binary and group node is parenthesized so the result never depends
/// on C++ operator precedence.
pub fn expr_to_cpp(expr: &Expr, prefix: &str) -> String {
    match expr {
        Expr::Literal { value } => value_to_cpp(*value),
        Expr::Ref { name } => format!("{}{}", prefix, name),
        Expr::Bin { op, left, right } => format!(
            "({} {} {})",
            expr_to_cpp(left, prefix),
            op.symbol(),
            expr_to_cpp(right, prefix)
        ),
        Expr::Neg { operand } => format!("(-{})", expr_to_cpp(operand, prefix)),
        Expr::Not { operand } => format!("(!{})", expr_to_cpp(operand, prefix)),
        Expr::Group { inner } => format!("({})", expr_to_cpp(inner, prefix)),
    }
}

/// Translates one action to C++ statements.
pub fn action_to_cpp(action: &Action, prefix: &str) -> Vec<String> {
    match action {
        Action::Assign { attribute, value } => vec![format!(
            "{}{} = {};",
            prefix,
            attribute,
            expr_to_cpp(value, prefix)
        )],
        Action::Print { values } => {
            let mut stmt = String::from("std::cout");
            for value in values {
                stmt.push_str(" << ");
                match value {
                    PrintValue::Text(text) => stmt.push_str(&emit_string_literal(text)),
                    PrintValue::Expr(expr) => stmt.push_str(&expr_to_cpp(expr, prefix)),
                }
            }
            stmt.push_str(" << std::endl;");
            vec![stmt]
        }
        Action::Timeout { millis } => vec![
            format!(
                "std::cout << \"Delaying transition for {} milliseconds...\" << std::endl;",
                millis
            ),
            format!(
                "std::this_thread::sleep_for(std::chrono::milliseconds({}));",
                millis
            ),
        ],
        Action::Run { command } => vec![format!(
            "std::cout << {} << std::endl;",
            emit_string_literal(&format!("Run Command: {}()", command))
        )],
    }
}

fn value_to_cpp(value: Value) -> String {
    match value {
        Value::Bool(b) => b.to_string(),
        // The most negative value has no literal form of its own.
        Value::Int(i64::MIN) => "(-9223372036854775807LL - 1)".to_string(),
        Value::Int(n) if n < 0 => format!("({})", n),
        Value::Int(n) => n.to_string(),
    }
}

fn emit_string_literal(s: &str) -> String {
    let escaped: String = s
        .chars()
        .flat_map(|c| match c {
            '\\' => vec!['\\', '\\'],
            '"' => vec!['\\', '"'],
            '\n' => vec!['\\', 'n'],
            '\r' => vec!['\\', 'r'],
            '\t' => vec!['\\', 't'],
            c => vec![c],
        })
        .collect();

    format!("\"{}\"", escaped)
}

fn cpp_type(ty: Type) -> &'static str {
    match ty {
        Type::Int => "long long",
        Type::Bool => "bool",
    }
}

/// Evaluates every default in declaration order.
fn fold_defaults(model: &Statemachine) -> Result<Vec<Value>, CoreError> {
    let mut env = Environment::new();
    let mut values = Vec::with_capacity(model.attributes.len());

    for attribute in &model.attributes {
        let value = match &attribute.default {
            Some(expr) => {
                let translation = |source: ExprError| CoreError::Translation {
                    attribute: attribute.name.clone(),
                    source,
                };
                let value = evaluate(expr, &env).map_err(translation)?;
                if value.ty() != attribute.ty {
                    return Err(translation(ExprError::TypeMismatch {
                        context: format!("default value of '{}'", attribute.name),
                        expected: attribute.ty,
                        found: value.ty(),
                    }));
                }
                value
            }
            None => attribute.ty.zero_value(),
        };
        env.set(&attribute.name, value);
        values.push(value);
    }

    Ok(values)
}

/// Transitions that can fire: the first one per event, in declaration order.
fn handled_transitions(state: &State) -> Vec<&Transition> {
    let mut handled: Vec<&Transition> = Vec::new();
    for t in &state.transitions {
        if !handled.iter().any(|h| h.event == t.event) {
            handled.push(t);
        }
    }
    handled
}

fn emit_state_base(w: &mut CodeWriter, model: &Statemachine) {
    w.line("class State {");
    w.line("protected:");
    w.indent();
    w.line(&format!("{} *statemachine;", model.name));
    w.dedent();
    w.blank();
    w.line("public:");
    w.indent();
    w.line("virtual ~State() {}");
    w.blank();
    w.line(&format!("void set_context({} *statemachine) {{", model.name));
    w.indent();
    w.line("this->statemachine = statemachine;");
    w.dedent();
    w.line("}");
    w.blank();
    w.line("virtual std::string get_name() {");
    w.indent();
    w.line("return \"Unknown\";");
    w.dedent();
    w.line("}");
    for event in &model.events {
        w.blank();
        w.line(&format!("virtual void {}() {{", event.name));
        w.indent();
        w.line("std::cout << \"Impossible event for the current state.\" << std::endl;");
        w.dedent();
        w.line("}");
    }
    w.dedent();
    w.line("};");
}

fn emit_context_class(w: &mut CodeWriter, model: &Statemachine, defaults: &[Value]) {
    let name = &model.name;

    w.line(&format!("class {} {{", name));
    w.line("private:");
    w.indent();
    w.line("State* state = nullptr;");
    w.dedent();
    w.blank();
    w.line("public:");
    w.indent();

    for (attribute, value) in model.attributes.iter().zip(defaults) {
        let mut field = format!(
            "{} {} = {};",
            cpp_type(attribute.ty),
            attribute.name,
            value_to_cpp(*value)
        );
        if let Some(expr) = attribute.default.as_ref().filter(|e| !matches!(e, Expr::Literal { .. })) {
            field.push_str(&format!(" // {}", expr_to_cpp(expr, "")));
        }
        w.line(&field);
    }
    if !model.attributes.is_empty() {
        w.blank();
    }

    w.line(&format!("{}(State* initial_state) {{", name));
    w.indent();
    w.line("initial_state->set_context(this);");
    w.line("state = initial_state;");
    w.line("std::cout << \"[\" << state->get_name() << \"]\" << std::endl;");
    w.dedent();
    w.line("}");
    w.blank();

    w.line(&format!("~{}() {{", name));
    w.indent();
    w.line("if (state != nullptr) {");
    w.indent();
    w.line("delete state;");
    w.dedent();
    w.line("}");
    w.dedent();
    w.line("}");
    w.blank();

    w.line("void transition_to(State *new_state) {");
    w.indent();
    w.line("std::cout << state->get_name() << \" ===> \" << new_state->get_name() << std::endl;");
    w.line("if (state != nullptr) {");
    w.indent();
    w.line("delete state;");
    w.dedent();
    w.line("}");
    w.line("new_state->set_context(this);");
    w.line("state = new_state;");
    w.dedent();
    w.line("}");

    for event in &model.events {
        w.blank();
        w.line(&format!("void {}() {{", event.name));
        w.indent();
        w.line(&format!("state->{}();", event.name));
        w.dedent();
        w.line("}");
    }
    w.dedent();
    w.line("};");
}

fn emit_state_declaration(w: &mut CodeWriter, state: &State) {
    w.line(&format!("class {} : public State {{", state.name));
    w.line("public:");
    w.indent();
    w.line(&format!(
        "std::string get_name() override {{ return {}; }}",
        emit_string_literal(&state.name)
    ));
    for t in handled_transitions(state) {
        w.line(&format!("void {}() override;", t.event));
    }
    w.dedent();
    w.line("};");
}

fn emit_state_definition(w: &mut CodeWriter, state: &State) {
    let handled = handled_transitions(state);
    if handled.is_empty() {
        return;
    }

    w.line(&format!("// {}", state.name));
    for t in handled {
        let guard = t
            .guard
            .as_ref()
            .map(|g| expr_to_cpp(g, CONTEXT_PREFIX))
            .unwrap_or_else(|| "true".to_string());

        w.line(&format!("void {}::{}() {{", state.name, t.event));
        w.indent();
        w.line(&format!("if ({}) {{", guard));
        w.indent();
        for action in &t.actions {
            for stmt in action_to_cpp(action, CONTEXT_PREFIX) {
                w.line(&stmt);
            }
        }
        w.line(&format!("statemachine->transition_to(new {});", t.target));
        w.dedent();
        w.line("} else {");
        w.indent();
        w.line("std::cout << \"Transition not allowed.\" << std::endl;");
        w.dedent();
        w.line("}");
        w.dedent();
        w.line("}");
        w.blank();
    }
}

fn emit_main(w: &mut CodeWriter, model: &Statemachine, initial: &State) {
    let name = &model.name;

    w.line("int main() {");
    w.indent();
    w.line("std::cout << std::boolalpha;");
    w.line(&format!(
        "{} *statemachine = new {}(new {});",
        name, name, initial.name
    ));
    for action in &initial.actions {
        for stmt in action_to_cpp(action, CONTEXT_PREFIX) {
            w.line(&stmt);
        }
    }
    w.blank();

    w.line("static std::map<std::string, Event> event_by_name;");
    for event in &model.events {
        w.line(&format!(
            "event_by_name[{}] = &{}::{};",
            emit_string_literal(&event.name),
            name,
            event.name
        ));
    }
    w.blank();

    w.line("for (std::string input; std::getline(std::cin, input);) {");
    w.indent();
    w.line("std::map<std::string, Event>::const_iterator event_by_name_it = event_by_name.find(input);");
    w.line("if (event_by_name_it == event_by_name.end()) {");
    w.indent();
    w.line(&format!(
        "std::cout << \"There is no event <\" << input << \"> in the {} statemachine.\" << std::endl;",
        name
    ));
    w.line("continue;");
    w.dedent();
    w.line("}");
    w.line("Event event_invoker = event_by_name_it->second;");
    w.line("(statemachine->*event_invoker)();");
    w.dedent();
    w.line("}");
    w.blank();

    w.line("delete statemachine;");
    w.line("return 0;");
    w.dedent();
    w.line("}");
}

/// Indentation-aware line buffer.
#[derive(Default)]
struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn indent(&mut self) {
        self.depth += 1;
    }

    fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn finish(self) -> String {
        self.out
    }
}
