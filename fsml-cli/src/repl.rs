//! Interactive REPL.

use crate::commands::{format_session, format_trace, load_checked};
use colored::Colorize;
use fsml_core::{Interpreter, InterpreterOptions, Outcome, TraceLine, TraceSink};
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const HELP_TEXT: &str = r#"
Available commands:
  help                Show this help
  state               Show the current state and attributes
  env                 Show attribute values
  events              List events handled by the current state
  reset               Restart the session from the initial state
  quit, exit          Exit the REPL

Anything else is sent to the machine as an event.
"#;

/// Prints trace lines as soon as they are produced, so delays are visible.
struct ConsoleSink;

impl TraceSink for ConsoleSink {
    fn emit(&mut self, line: TraceLine) {
        println!("{}", format_trace(&line));
    }
}

pub fn run(file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let model = load_checked(file)?;
    println!("{} {}", "fsml".bold().cyan(), model.name.bold());

    let mut interpreter = Interpreter::new(Arc::new(model), InterpreterOptions::default())?;
    interpreter.start(&mut ConsoleSink)?;

    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    let history_path = history_path();
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", format!("{}>", interpreter.current_state()).cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&mut interpreter, line, &mut ConsoleSink) {
                    Ok(Some(output)) => {
                        if !output.is_empty() {
                            println!("{}", output);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        // The session cannot continue past an evaluation failure.
                        println!("{}: {}", "Error".red(), e);
                        break;
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);
    Ok(())
}

fn history_path() -> PathBuf {
    home::home_dir()
        .map(|h| h.join(".fsml_history"))
        .unwrap_or_else(|| ".fsml_history".into())
}

/// Runs one REPL line. `Ok(None)` ends the session.
fn execute_repl_command(
    interpreter: &mut Interpreter,
    line: &str,
    sink: &mut dyn TraceSink,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some(cmd) = parts.first() else {
        return Ok(Some(String::new()));
    };

    match *cmd {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "state" => Ok(Some(format_session(interpreter))),

        "env" => {
            let env = interpreter.env();
            if env.is_empty() {
                return Ok(Some("No attributes".yellow().to_string()));
            }
            let lines: Vec<String> = env
                .iter()
                .map(|(name, value)| format!("  {} = {}", name.cyan(), value))
                .collect();
            Ok(Some(lines.join("\n")))
        }

        "events" => {
            let events = interpreter.model().events_from(interpreter.current_state());
            if events.is_empty() {
                return Ok(Some("No transitions from this state".yellow().to_string()));
            }
            Ok(Some(format!("  {}", events.join(", "))))
        }

        "reset" => {
            interpreter.reset()?;
            interpreter.start(sink)?;
            Ok(Some(String::new()))
        }

        event => {
            if parts.len() > 1 {
                return Ok(Some(
                    "Events are single words. Type 'help' for help.".to_string(),
                ));
            }
            let outcome = interpreter.dispatch(event, sink)?;
            tracing::debug!("'{}' -> {:?}", event, outcome);
            Ok(Some(match outcome {
                Outcome::UnknownEvent => "Type 'help' for help.".dimmed().to_string(),
                _ => String::new(),
            }))
        }
    }
}
