//! fsml-cli - Command-line interface for fsml
//!
//! Provides one-shot commands and an interactive REPL.

mod commands;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fsml-cli")]
#[command(about = "Validate, interpret and generate code for fsml state machines")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Check a model and print its diagnostics
    Validate {
        /// Model document (.json, .yaml)
        file: PathBuf,
    },

    /// Run a sequence of events through a model
    Interpret {
        /// Model document (.json, .yaml)
        file: PathBuf,

        /// Events, in order
        events: Vec<String>,

        /// Run entry actions on every state entry, not just the initial one
        #[arg(long)]
        every_entry: bool,

        /// Trace timeouts without pausing
        #[arg(long)]
        no_delay: bool,
    },

    /// Generate a C++ program from a model
    Generate {
        /// Model document (.json, .yaml)
        file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "generated")]
        dir: PathBuf,
    },

    /// Print the resolved model as JSON
    Ast {
        /// Model document (.json, .yaml)
        file: PathBuf,
    },

    /// Start an interactive session over a model
    Repl {
        /// Model document (.json, .yaml)
        file: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Repl { file } => {
            if let Err(e) = repl::run(&file) {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        }
        cmd => match commands::execute(cmd) {
            Ok(output) => {
                println!("{}", output);
            }
            Err(e) => {
                eprintln!("{}: {}", "Error".red(), e);
                std::process::exit(1);
            }
        },
    }

    Ok(())
}
