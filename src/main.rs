//! proof-solver - batch entry point.
//!
//! Loads a slice of problems, races `solver-agent` processes on each one and prints a summary.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use proof_solver::batch::BatchRunner;
use proof_solver::config::{resolve_agent_bin, CoordinatorConfig, SolverConfig};
use proof_solver::dataset::{JsonlProblemSource, ProblemSource};
use proof_solver::sink::JsonlSink;
use proof_solver::ParallelCoordinator;

#[derive(Parser)]
#[command(name = "proof-solver")]
#[command(version)]
#[command(about = "Solve a slice of a problem set with parallel agents")]
struct Cli {
    /// Agents launched per problem
    #[arg(short = 'n', long = "num_agents", default_value_t = 3)]
    num_agents: usize,

    /// Index of the first problem in the dataset (0-based)
    #[arg(long = "start_problem", default_value_t = 0)]
    start_problem: usize,

    /// Number of problems to attempt
    #[arg(long = "num_problems", default_value_t = 3)]
    num_problems: usize,

    /// JSON Lines dataset (path or http(s) URL)
    #[arg(long)]
    dataset: String,

    /// Directory for per-agent logs
    #[arg(long, default_value = "logs")]
    log_dir: PathBuf,

    /// Directory for per-problem scratch files
    #[arg(long, default_value = ".")]
    work_dir: PathBuf,

    /// Wall-clock limit per agent, in seconds
    #[arg(long, default_value_t = 1800)]
    agent_timeout_secs: u64,

    /// Path to the solver-agent binary
    #[arg(long)]
    agent_bin: Option<PathBuf>,

    /// Append per-problem reports to this JSON Lines file
    #[arg(long)]
    results: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    proof_solver::init_tracing("proof_solver=info");
    let cli = Cli::parse();

    // Agents read the same environment; fail before launching anything.
    let config = SolverConfig::from_env().context("Invalid configuration")?;
    info!("Loaded configuration: model={}", config.model);

    let problems = JsonlProblemSource::new(&cli.dataset)
        .load(cli.start_problem, cli.num_problems)
        .await
        .context("Failed to load problems")?;

    let mut coordinator_config = CoordinatorConfig::new(resolve_agent_bin(cli.agent_bin));
    coordinator_config.num_agents = cli.num_agents;
    coordinator_config.agent_timeout = Duration::from_secs(cli.agent_timeout_secs);
    coordinator_config.log_dir = cli.log_dir.clone();
    coordinator_config.work_dir = cli.work_dir;
    info!("Using agent binary {:?}", coordinator_config.agent_bin);

    let mut runner = BatchRunner::new(ParallelCoordinator::new(coordinator_config));
    if let Some(results) = cli.results {
        runner = runner.with_sink(Box::new(JsonlSink::new(results)));
    }

    let summary = runner.run(&problems).await;

    println!();
    println!("{}", summary);
    println!(
        "All logs are available in the '{}' directory.",
        cli.log_dir.display()
    );
    Ok(())
}
