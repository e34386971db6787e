//! fsml - Live interpreter session for fsml state machines
//!
//! Reads events from stdin, one per line, and prints the interpretation
//! trace as it happens.

use clap::Parser;
use colored::Colorize;
use fsml::{Config, LiveSession};
use fsml_core::{generate, generate_file_name, validate, Interpreter, TraceLine, TraceSink};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fsml")]
#[command(about = "Run an fsml state machine on events read from stdin")]
#[command(version)]
struct Args {
    /// Configuration file (YAML)
    #[arg(short, long, env = "FSML_CONFIG")]
    config: Option<PathBuf>,

    /// Write the generated C++ program to the configured output directory
    /// instead of starting a session
    #[arg(long)]
    emit: bool,

    /// Model document (.json, .yaml)
    model: PathBuf,
}

/// Prints trace lines to stdout.
struct StdoutSink;

impl TraceSink for StdoutSink {
    fn emit(&mut self, line: TraceLine) {
        match &line {
            TraceLine::Entered { .. } | TraceLine::Transitioned { .. } => {
                println!("{}", line.to_string().cyan())
            }
            TraceLine::NotAllowed | TraceLine::NoTransition { .. } => {
                println!("{}", line.to_string().yellow())
            }
            TraceLine::UnknownEvent { .. } => println!("{}", line.to_string().red()),
            _ => println!("{}", line),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match Config::load(args.config.as_deref()) {
        Ok(c) => {
            if let Some(path) = &args.config {
                tracing::info!("Loaded config from {}", path.display());
            }
            c
        }
        Err(e) => {
            tracing::error!("Failed to load config: {}", e);
            return Err(e.into());
        }
    };

    let model = fsml_loader::load_path(&args.model).map_err(|e| {
        eprintln!("{}: {}", "Error".red(), e);
        e
    })?;

    let diagnostics = validate(&model);
    for d in &diagnostics {
        if d.is_error() {
            tracing::error!("{}", d);
        } else {
            tracing::warn!("{}", d);
        }
    }
    let failed = diagnostics.has_errors()
        || (config.session.warnings_as_errors && !diagnostics.is_empty());
    if failed {
        if config.session.strict {
            eprintln!(
                "{}: model '{}' failed validation ({} diagnostic(s))",
                "Error".red(),
                model.name,
                diagnostics.len()
            );
            std::process::exit(1);
        }
        tracing::warn!("continuing despite validation failures (strict = false)");
    }

    if args.emit {
        let code = generate(&model)?;
        std::fs::create_dir_all(&config.generator.out_dir)?;
        let path = config
            .generator
            .out_dir
            .join(generate_file_name(&model, &config.generator.extension));
        std::fs::write(&path, code)?;
        println!("{} {}", "Generated".green(), path.display());
        return Ok(());
    }

    tracing::info!("Starting session for '{}'", model.name);
    tracing::info!("  Entry actions: {:?}", config.session.entry_actions);
    tracing::info!("  Honor delays: {}", config.session.honor_delays);

    let interpreter = Interpreter::new(Arc::new(model), config.session.interpreter_options())?;
    let session = LiveSession::new(interpreter, StdoutSink);

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    match session.run(stdin).await {
        Ok(summary) => {
            tracing::info!(
                "Session finished in state '{}' ({} ignored input line(s))",
                summary.final_state,
                summary.ignored
            );
            Ok(())
        }
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    }
}
