//! solver-agent - one agent process.
//!
//! Reads a problem statement, runs the solve/verify/correct loop and, on success, writes its
//! result as JSON to the signal file. Exit status: 0 solved, 2 not solved, 1 error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use proof_solver::config::{AgentLimits, SolverConfig};
use proof_solver::llm::ModelHandle;
use proof_solver::solver::{AgentProcess, AgentRunResult, Problem};
use proof_solver::Transcript;

#[derive(Parser)]
#[command(name = "solver-agent")]
#[command(version)]
#[command(about = "Solve one problem with a generate/verify/correct loop")]
struct Cli {
    /// File containing the problem statement
    problem_file: PathBuf,

    /// Also write the transcript to this file
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Extra instructions for the solver (comma-separated)
    ///
    /// Each non-empty entry is appended to the solver's system prompt under an
    /// "### Additional Instructions ###" heading. Verification prompts are unaffected.
    #[arg(short = 'o', long = "other_prompts", value_delimiter = ',')]
    other_prompts: Vec<String>,

    /// Where to write the result when a solution is found
    #[arg(long, default_value = "SUCCESS_SIGNAL.txt")]
    signal_file: PathBuf,

    /// Problem id reported in the signal (defaults to the problem file stem)
    #[arg(long)]
    problem_id: Option<String>,

    /// Agent slot number reported in the signal
    #[arg(long, default_value_t = 0)]
    agent_id: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    proof_solver::init_tracing("proof_solver=info,solver_agent=info");
    let cli = Cli::parse();

    let config = SolverConfig::from_env().context("Invalid configuration")?;

    let statement = tokio::fs::read_to_string(&cli.problem_file)
        .await
        .with_context(|| format!("Failed to read problem file {:?}", cli.problem_file))?;
    let problem_id = cli.problem_id.clone().unwrap_or_else(|| {
        cli.problem_file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "problem".to_string())
    });
    let problem = Problem::new(problem_id, statement);

    let mut transcript = Transcript::console();
    if let Some(log) = &cli.log {
        transcript = transcript
            .with_file(log)
            .with_context(|| format!("Failed to open log file {:?}", log))?;
        transcript.line(format!("Logging to file: {}", log.display()));
    }

    let model = ModelHandle::from_config(&config, None)?;
    info!(
        problem_id = %problem.id,
        agent_id = cli.agent_id,
        model = model.model(),
        "Starting agent"
    );

    let mut agent = AgentProcess::new(model, AgentLimits::default(), &cli.other_prompts, transcript);
    let outcome = match agent.run(&problem).await {
        Ok(outcome) => outcome,
        Err(e) => {
            agent
                .transcript_mut()
                .line(format!(">>>>>>> Error in run: {}", e));
            error!(problem_id = %problem.id, agent_id = cli.agent_id, "Agent failed: {}", e);
            return Ok(ExitCode::FAILURE);
        }
    };

    info!(
        problem_id = %problem.id,
        agent_id = cli.agent_id,
        reason = ?outcome.reason,
        iterations = outcome.iterations,
        "Agent finished"
    );

    let Some(solution) = outcome.solution else {
        return Ok(ExitCode::from(2));
    };

    let transcript = agent.transcript_mut();
    transcript.line(">>>>>>> Found a correct solution in this run.");
    transcript.line("=".repeat(50));
    transcript.line(&solution);
    transcript.line("=".repeat(50));

    let result = AgentRunResult {
        problem_id: problem.id,
        agent_id: cli.agent_id,
        success: true,
        final_solution: Some(solution),
    };
    let payload = serde_json::to_vec(&result)?;
    tokio::fs::write(&cli.signal_file, payload)
        .await
        .with_context(|| format!("Failed to write signal file {:?}", cli.signal_file))?;

    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_other_prompts_split_on_commas() {
        let cli = Cli::parse_from([
            "solver-agent",
            "problem.txt",
            "--other_prompts",
            "be brief,use induction",
        ]);
        assert_eq!(cli.other_prompts, vec!["be brief", "use induction"]);
        assert_eq!(cli.signal_file, PathBuf::from("SUCCESS_SIGNAL.txt"));
    }

    #[test]
    fn test_other_prompts_help_names_the_prompt_section() {
        let help = Cli::command().render_long_help().to_string();
        assert!(help.contains("### Additional Instructions ###"));
    }
}
