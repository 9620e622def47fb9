//! CLI command definitions.
//!
//! This module defines the command structure for the selfheal CLI.

use clap::{Parser, Subcommand};

pub mod demo;
pub mod languages;
pub mod solve;

/// selfheal - generate code, run it, and repair it until it works
#[derive(Parser)]
#[command(name = "heal")]
#[command(version, about = "selfheal - self-healing code generation")]
#[command(long_about = r#"
selfheal turns a natural-language request into a program, builds and runs it
in a throwaway directory, and feeds any failure back into the next generation
until the program works or the attempt budget is spent.

COMMANDS:
  solve       → Generate, run and heal code for one request
  languages   → List supported languages and their toolchains
  demo        → Run the built-in example tasks offline

ENVIRONMENT:
  OPENAI_API_KEY   API key for the code generator
  OPENAI_BASE_URL  OpenAI-compatible endpoint (default https://api.openai.com/v1)
  MODEL_NAME       Model to request (default gpt-4)
  RUST_LOG         Log filter override

EXIT CODES:
  0   - Success
  1   - General error
  2   - Invalid arguments or unsupported language
  3   - Healing failed
  130 - Cancelled
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate, run and heal code for a request
    Solve(solve::SolveArgs),

    /// List supported languages
    Languages(languages::LanguagesArgs),

    /// Run the built-in example tasks with the offline generator
    Demo(demo::DemoArgs),
}
