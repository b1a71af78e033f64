//! Batch runner: solve a slice of problems one after another and summarize.

use std::fmt;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::coordinator::{ProblemSolver, SolveReport};
use crate::sink::ResultSink;
use crate::solver::Problem;

/// Aggregate outcome of one batch run.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub attempted: usize,
    pub solved: usize,
    #[serde(with = "duration_secs")]
    pub elapsed: Duration,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "#".repeat(60))?;
        writeln!(f, "### FINAL SUMMARY ###")?;
        writeln!(f, "Run id: {}", self.run_id)?;
        writeln!(f, "Total problems attempted: {}", self.attempted)?;
        writeln!(f, "Problems solved: {}", self.solved)?;
        writeln!(
            f,
            "Total execution time: {:.2} seconds",
            self.elapsed.as_secs_f64()
        )?;
        write!(f, "{}", "#".repeat(60))
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

/// Sequentially hands problems to a solver and records the reports.
pub struct BatchRunner<S> {
    solver: S,
    sink: Option<Box<dyn ResultSink<SolveReport>>>,
}

impl<S: ProblemSolver> BatchRunner<S> {
    pub fn new(solver: S) -> Self {
        Self { solver, sink: None }
    }

    /// Append every per-problem report to `sink`.
    pub fn with_sink(mut self, sink: Box<dyn ResultSink<SolveReport>>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Solve `problems` in order.
    ///
    /// A problem whose solve could not even start (e.g. the scratch directory could not be
    /// created) is logged and counted as attempted but unsolved.
    pub async fn run(&self, problems: &[Problem]) -> RunSummary {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        let mut solved = 0;

        tracing::info!(%run_id, problems = problems.len(), "Starting batch run");

        for (index, problem) in problems.iter().enumerate() {
            tracing::info!(
                problem_id = %problem.id,
                "Solving problem {}/{}",
                index + 1,
                problems.len()
            );

            let report = match self.solver.solve(problem).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(problem_id = %problem.id, "Solve failed: {}", e);
                    continue;
                }
            };

            if report.solved {
                solved += 1;
                tracing::info!(
                    problem_id = %problem.id,
                    winner = ?report.winner,
                    elapsed_secs = report.elapsed_secs,
                    "Problem solved"
                );
            } else {
                tracing::info!(
                    problem_id = %problem.id,
                    elapsed_secs = report.elapsed_secs,
                    "No solution found"
                );
            }

            if let Some(sink) = &self.sink {
                if let Err(e) = sink.write(std::slice::from_ref(&report)).await {
                    tracing::warn!(problem_id = %problem.id, "Failed to record result: {}", e);
                }
            }
        }

        RunSummary {
            run_id,
            started_at,
            attempted: problems.len(),
            solved,
            elapsed: started.elapsed(),
        }
    }
}
