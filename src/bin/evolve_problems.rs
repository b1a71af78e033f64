//! evolve-problems - rewrite dataset problems into harder variants.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use proof_solver::config::SolverConfig;
use proof_solver::dataset::{JsonlProblemSource, ProblemSource};
use proof_solver::evolve::{EvolutionStatus, ProblemEvolver};
use proof_solver::llm::{ModelHandle, RetryConfig};
use proof_solver::sink::{JsonlSink, ResultSink};

#[derive(Parser)]
#[command(name = "evolve-problems")]
#[command(version)]
#[command(about = "Evolve problems into harder or computational variants")]
struct Cli {
    /// JSON Lines dataset (path or http(s) URL)
    #[arg(long)]
    dataset: String,

    /// Index of the first problem (0-based)
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Number of problems to evolve
    #[arg(long, default_value_t = 5)]
    count: usize,

    /// Output JSON Lines file; records are appended
    #[arg(long, default_value = "evolved_problems.jsonl")]
    output: PathBuf,

    /// Sampling temperature for the rewrite
    #[arg(long, default_value_t = 0.7)]
    temperature: f64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    proof_solver::init_tracing("proof_solver=info,evolve_problems=info");
    let cli = Cli::parse();

    let mut config = SolverConfig::from_env().context("Invalid configuration")?;
    config.temperature = cli.temperature;

    let problems = JsonlProblemSource::new(&cli.dataset)
        .load(cli.start, cli.count)
        .await
        .context("Failed to load problems")?;

    let evolver = ProblemEvolver::new(ModelHandle::from_config(
        &config,
        Some(RetryConfig::evolution()),
    )?);
    let sink = JsonlSink::new(cli.output);

    let mut succeeded = 0;
    for (index, problem) in problems.iter().enumerate() {
        info!(
            problem_id = %problem.id,
            "Evolving problem {}/{}",
            index + 1,
            problems.len()
        );
        let record = evolver.evolve(problem).await;
        info!(
            problem_id = %problem.id,
            status = ?record.status,
            "Finished in {:.2} seconds",
            record.processing_time_secs
        );
        if record.status == EvolutionStatus::Success {
            succeeded += 1;
        }
        if let Err(e) = sink.write(std::slice::from_ref(&record)).await {
            warn!(problem_id = %problem.id, "Failed to record evolution: {}", e);
        }
    }

    println!(
        "Evolved {}/{} problems; results appended to {}",
        succeeded,
        problems.len(),
        sink.path().display()
    );
    Ok(())
}
