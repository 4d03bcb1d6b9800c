//! `nexus` command-line front-end.
//!
//! Runs one directive to completion against the configured agent command and
//! prints the resulting goal forest.

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use nexus::agents::command_engine;
use nexus::controller::{LoopStop, RunController};
use nexus::engine::CycleOutcome;
use nexus::exit_codes;
use nexus::io::config::{CONFIG_FILE, NexusConfig, load_config, write_config};
use nexus::io::transcript::write_transcript;

/// Goals printed after a run.
const SUMMARY_LIMIT: usize = 200;

#[derive(Parser)]
#[command(name = "nexus", version, about = "Goal-decomposition engine")]
struct Cli {
    /// Path to the config file.
    #[arg(long, global = true, default_value = CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a config file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Validate the config file.
    Check,
    /// Decompose and resolve a directive.
    Run {
        /// The top-level goal.
        directive: String,
        /// Delay between cycles (overrides `run.interval_ms`).
        #[arg(long)]
        interval_ms: Option<u64>,
        /// Cycle limit (overrides `run.max_cycles`).
        #[arg(long)]
        max_cycles: Option<u32>,
        /// Write the final session as JSON.
        #[arg(long)]
        transcript: Option<PathBuf>,
    },
}

fn main() {
    nexus::logging::init();
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{:#}", err);
            exit_codes::INVALID
        }
    };
    process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Check => cmd_check(&cli.config),
        Command::Run {
            directive,
            interval_ms,
            max_cycles,
            transcript,
        } => {
            let mut cfg = load_config(&cli.config)?;
            if let Some(interval_ms) = interval_ms {
                cfg.run.interval_ms = interval_ms;
            }
            if let Some(max_cycles) = max_cycles {
                cfg.run.max_cycles = max_cycles;
            }
            cfg.validate()?;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("build tokio runtime")?;
            runtime.block_on(cmd_run(&cfg, &directive, transcript.as_deref()))
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<i32> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    write_config(path, &NexusConfig::default())?;
    println!("wrote {}", path.display());
    Ok(exit_codes::OK)
}

fn cmd_check(path: &Path) -> Result<i32> {
    if !path.exists() {
        println!("{} not found; defaults are valid", path.display());
        return Ok(exit_codes::OK);
    }
    let cfg = load_config(path)?;
    println!(
        "{} ok (recursion_limit={}, rollup={:?}, command={})",
        path.display(),
        cfg.params.recursion_limit,
        cfg.engine.rollup,
        cfg.gateway.command.join(" ")
    );
    Ok(exit_codes::OK)
}

async fn cmd_run(cfg: &NexusConfig, directive: &str, transcript: Option<&Path>) -> Result<i32> {
    let engine = Arc::new(command_engine(cfg)?);
    engine.submit_directive(directive).await?;

    let controller = RunController::new(Arc::clone(&engine), cfg.interval());
    let mut cycle = 0u32;
    let outcome = controller
        .run_until_stopped(cfg.run.max_cycles, |outcome| {
            if let Some(line) = describe(outcome) {
                cycle += 1;
                println!("cycle {cycle}: {line}");
            }
        })
        .await?;

    println!();
    println!("{}", engine.forest_summary(SUMMARY_LIMIT).await);
    let snapshot = engine.snapshot().await;
    println!();
    println!("Knowledge:\n{}", snapshot.context);
    if let Some(path) = transcript {
        write_transcript(path, &snapshot)?;
        println!("transcript written to {}", path.display());
    }

    let code = match &outcome.stop {
        LoopStop::Complete => {
            println!("run complete after {} cycles", outcome.cycles_executed);
            exit_codes::OK
        }
        LoopStop::Failed { error, .. } => {
            eprintln!("run failed: {error}");
            exit_codes::FAILED
        }
        LoopStop::Stalled => {
            eprintln!("run stalled: no pending goals but the forest is not complete");
            exit_codes::INCOMPLETE
        }
        LoopStop::MaxCycles { max_cycles } => {
            eprintln!("run stopped after reaching max_cycles={max_cycles}");
            exit_codes::INCOMPLETE
        }
        LoopStop::Stopped => exit_codes::INCOMPLETE,
    };
    Ok(code)
}

fn describe(outcome: &CycleOutcome) -> Option<String> {
    let line = match outcome {
        CycleOutcome::Skipped(_) | CycleOutcome::Idle | CycleOutcome::Complete => return None,
        CycleOutcome::Branched { spawned, .. } => format!("spawned {spawned} sub-goals"),
        CycleOutcome::Solved { rolled_up, .. } if *rolled_up > 0 => {
            format!("solved, rolled up {rolled_up} parent goals")
        }
        CycleOutcome::Solved { .. } => "solved".to_string(),
        CycleOutcome::Fallback { .. } => "depth limit, best-effort completion".to_string(),
        CycleOutcome::Failed { error, .. } => format!("failed: {error}"),
        CycleOutcome::Superseded { .. } => "superseded".to_string(),
    };
    Some(line)
}
