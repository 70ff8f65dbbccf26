//! Ravel CLI - drive a puzzle-solver WASM module from the terminal.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ravel_core::{Arm, Outcome, PuzzleIndex, Selector};
use ravel_host::channel::{Channel, ChannelConfig};
use ravel_host::coordinator::{Coordinator, Sink};
use ravel_host::observability::{init_tracing, TracingConfig};
use ravel_host::runtime::SolverRuntime;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;

/// Ravel - host runtime for puzzle-solver WebAssembly modules.
#[derive(Parser)]
#[command(name = "ravel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single selector against the module
    Solve {
        /// Path to the solver .wasm module
        #[arg(short, long)]
        module: PathBuf,

        /// Selector identifying the computation to run
        #[arg(short, long)]
        selector: u32,

        /// Read input from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Emit the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Run both parts of a puzzle concurrently on two instances
    Pair {
        /// Path to the solver .wasm module
        #[arg(short, long)]
        module: PathBuf,

        /// Puzzle index; parts use selectors 2*index and 2*index+1
        #[arg(short = 'n', long)]
        index: u32,

        /// Read input from this file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Emit both outcomes as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Prints each arm's result the moment it settles.
struct ConsoleSink;

impl Sink for ConsoleSink {
    fn arm_settled(&self, arm: Arm, outcome: &Outcome) {
        let part = match arm {
            Arm::First => "part one",
            Arm::Second => "part two",
        };
        match outcome {
            Outcome::Success(msg) => println!("{part}: {msg}"),
            Outcome::Failure(msg) => eprintln!("{part} failed: {msg}"),
            Outcome::Fault(msg) => eprintln!("{part} faulted: {msg}"),
        }
    }

    fn all_settled(&self) {
        tracing::debug!("both parts settled");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    init_tracing(TracingConfig::from_env().with_filter(filter))?;

    let exit_code = match cli.command {
        Commands::Solve {
            module,
            selector,
            input,
            json,
        } => run_solve(module, Selector::new(selector), input, json).await?,
        Commands::Pair {
            module,
            index,
            input,
            json,
        } => run_pair(module, PuzzleIndex::new(index), input, json).await?,
    };

    std::process::exit(exit_code);
}

async fn run_solve(
    module: PathBuf,
    selector: Selector,
    input: Option<PathBuf>,
    json: bool,
) -> Result<i32> {
    let input_text = read_input(input)?;
    let runtime = Arc::new(SolverRuntime::with_defaults()?);
    let wasm_bytes = std::fs::read(&module)
        .with_context(|| format!("failed to read module {}", module.display()))?;

    let channel = Channel::spawn(runtime, wasm_bytes, ChannelConfig::new("solver"))?;
    let result = channel.invoke(selector, input_text).await;
    channel.shutdown();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => Outcome::from(e),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        match &outcome {
            Outcome::Success(msg) => println!("{msg}"),
            Outcome::Failure(msg) => eprintln!("failed: {msg}"),
            Outcome::Fault(msg) => eprintln!("faulted: {msg}"),
        }
    }

    Ok(exit_code_for(&outcome))
}

async fn run_pair(
    module: PathBuf,
    index: PuzzleIndex,
    input: Option<PathBuf>,
    json: bool,
) -> Result<i32> {
    let input_text = read_input(input)?;
    let runtime = Arc::new(SolverRuntime::with_defaults()?);
    let wasm_bytes = std::fs::read(&module)
        .with_context(|| format!("failed to read module {}", module.display()))?;

    let coordinator = Coordinator::for_module(runtime, wasm_bytes)?;
    let pair = coordinator
        .solve_pair(index, &input_text, &ConsoleSink)
        .await?;
    coordinator.shutdown();

    if json {
        let value = serde_json::json!({
            "first": pair.first,
            "second": pair.second,
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    }

    let code = exit_code_for(&pair.first).max(exit_code_for(&pair.second));
    Ok(code)
}

fn read_input(path: Option<PathBuf>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read input {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read input from stdin")?;
            Ok(buf)
        }
    }
}

fn exit_code_for(outcome: &Outcome) -> i32 {
    match outcome {
        Outcome::Success(_) => 0,
        Outcome::Failure(_) => 1,
        Outcome::Fault(_) => 2,
    }
}
