//! Problem evolution: rewrite a problem into a harder (or computational) variant.
//!
//! One user message built from the upward-evolution template is sent per problem. The rewritten
//! problem is whatever follows `#Finally Rewritten Instruction#` in the reply. Retrying is left to
//! the client the evolver is built on (see [`RetryConfig::evolution`](crate::llm::RetryConfig::evolution)).

use std::sync::LazyLock;
use std::time::Instant;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::llm::ModelHandle;
use crate::solver::prompts::evolution_request;
use crate::solver::{Problem, ProblemId};

static FINAL_INSTRUCTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)#Finally Rewritten Instruction#\s*:?\s*(.*)")
        .expect("final instruction pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvolutionStatus {
    Success,
    /// The model replied but the final-instruction heading was missing or empty
    ExtractionFailed,
    /// The request failed after all retries
    Failed,
}

/// One evolved problem, as written to the output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolutionRecord {
    pub id: ProblemId,
    pub original_problem: String,
    /// Reference solution or answer carried over from the dataset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_solution: Option<String>,
    pub evolved_problem: Option<String>,
    pub raw_response: Option<String>,
    pub status: EvolutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub processing_time_secs: f64,
}

/// Text after the `#Finally Rewritten Instruction#` heading, if any.
pub fn extract_final_instruction(response: &str) -> Option<&str> {
    FINAL_INSTRUCTION
        .captures(response)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
}

pub struct ProblemEvolver {
    model: ModelHandle,
}

impl ProblemEvolver {
    pub fn new(model: ModelHandle) -> Self {
        Self { model }
    }

    /// Evolve one problem. Failures are recorded in the returned record rather than returned.
    pub async fn evolve(&self, problem: &Problem) -> EvolutionRecord {
        let started = Instant::now();
        let request = evolution_request(&problem.statement);

        let (evolved_problem, raw_response, status, error) =
            match self.model.complete(None, &request, &[]).await {
                Ok(response) => match extract_final_instruction(&response) {
                    Some(evolved) => (
                        Some(evolved.to_string()),
                        Some(response),
                        EvolutionStatus::Success,
                        None,
                    ),
                    None => {
                        tracing::warn!(
                            problem_id = %problem.id,
                            "Reply has no final rewritten instruction"
                        );
                        (None, Some(response), EvolutionStatus::ExtractionFailed, None)
                    }
                },
                Err(e) => {
                    tracing::error!(problem_id = %problem.id, "Evolution request failed: {}", e);
                    (None, None, EvolutionStatus::Failed, Some(e.to_string()))
                }
            };

        EvolutionRecord {
            id: problem.id.clone(),
            original_problem: problem.statement.clone(),
            original_solution: problem.solution.clone(),
            evolved_problem,
            raw_response,
            status,
            error,
            processing_time_secs: started.elapsed().as_secs_f64(),
        }
    }
}
