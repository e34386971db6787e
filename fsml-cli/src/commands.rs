//! Command execution.

use crate::Commands;
use colored::Colorize;
use fsml_core::{
    generate, generate_file_name, validate, Diagnostic, Diagnostics, EntryActions, Interpreter,
    InterpreterOptions, Severity, Statemachine, TraceLine,
};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Validation found errors; `report` holds every diagnostic.
#[derive(Debug)]
pub struct ValidationFailed {
    pub report: String,
    pub errors: usize,
}

impl fmt::Display for ValidationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "model has {} error(s)\n{}", self.errors, self.report)
    }
}

impl std::error::Error for ValidationFailed {}

/// Executes a command and returns the formatted output.
pub fn execute(cmd: Commands) -> Result<String, Box<dyn std::error::Error>> {
    match cmd {
        Commands::Repl { .. } => unreachable!(),

        Commands::Validate { file } => {
            let model = fsml_loader::load_path(&file)?;
            let diagnostics = check(&model)?;
            if diagnostics.is_empty() {
                Ok(format!("{} {}", "OK".green(), model.name.cyan()))
            } else {
                Ok(format!(
                    "{}\n{} {} ({} warning(s))",
                    format_diagnostics(&diagnostics),
                    "OK".green(),
                    model.name.cyan(),
                    diagnostics.len()
                ))
            }
        }

        Commands::Interpret {
            file,
            events,
            every_entry,
            no_delay,
        } => {
            let model = load_checked(&file)?;
            let options = InterpreterOptions {
                entry_actions: if every_entry {
                    EntryActions::EveryEntry
                } else {
                    EntryActions::InitialOnly
                },
                honor_delays: !no_delay,
            };

            let mut interpreter = Interpreter::new(Arc::new(model), options)?;
            let mut trace = Vec::<TraceLine>::new();
            let result = interpreter.run_batch(events.as_slice(), &mut trace);

            let mut output = String::new();
            for line in &trace {
                output.push_str(&format_trace(line));
                output.push('\n');
            }
            result?;

            output.push_str(&format_session(&interpreter));
            Ok(output)
        }

        Commands::Generate { file, dir } => {
            let model = load_checked(&file)?;
            let code = generate(&model)?;

            std::fs::create_dir_all(&dir)?;
            let path = dir.join(generate_file_name(&model, "cpp"));
            std::fs::write(&path, code)?;
            tracing::info!("wrote {:?}", path);

            Ok(format!(
                "{} {}",
                "Generated".green(),
                path.display().to_string().cyan()
            ))
        }

        Commands::Ast { file } => {
            let model = fsml_loader::load_path(&file)?;
            let json = model.to_json()?;
            Ok(serde_json::to_string_pretty(&json)?)
        }
    }
}

/// Loads a model and refuses it if validation reports errors. Warnings go
/// to stderr.
pub fn load_checked(file: &Path) -> Result<Statemachine, Box<dyn std::error::Error>> {
    let model = fsml_loader::load_path(file)?;
    let diagnostics = check(&model)?;
    if !diagnostics.is_empty() {
        eprintln!("{}", format_diagnostics(&diagnostics));
    }
    Ok(model)
}

fn check(model: &Statemachine) -> Result<Diagnostics, ValidationFailed> {
    let diagnostics = validate(model);
    if diagnostics.has_errors() {
        return Err(ValidationFailed {
            report: format_diagnostics(&diagnostics),
            errors: diagnostics.errors().count(),
        });
    }
    Ok(diagnostics)
}

pub fn format_diagnostics(diagnostics: &Diagnostics) -> String {
    diagnostics
        .iter()
        .map(format_diagnostic)
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_diagnostic(d: &Diagnostic) -> String {
    let severity = match d.severity {
        Severity::Error => d.severity.to_string().red().bold(),
        Severity::Warning => d.severity.to_string().yellow().bold(),
    };
    format!(
        "{}[{}] {}: {}",
        severity,
        d.code.as_str(),
        d.node.to_string().dimmed(),
        d.message
    )
}

pub fn format_trace(line: &TraceLine) -> String {
    match line {
        TraceLine::Entered { .. } | TraceLine::Transitioned { .. } => {
            line.to_string().cyan().to_string()
        }
        TraceLine::NotAllowed | TraceLine::NoTransition { .. } => {
            line.to_string().yellow().to_string()
        }
        TraceLine::UnknownEvent { .. } => line.to_string().red().to_string(),
        TraceLine::Command { .. } | TraceLine::Delay { .. } => {
            line.to_string().dimmed().to_string()
        }
        TraceLine::Print { text } => text.clone(),
    }
}

/// Current state and attribute values.
pub fn format_session(interpreter: &Interpreter) -> String {
    let mut output = format!(
        "{} {}",
        "State:".bold(),
        interpreter.current_state().yellow()
    );
    for (name, value) in interpreter.env().iter() {
        output.push_str(&format!("\n  {} = {}", name.cyan(), value));
    }
    output
}
