//! Core types for the solver.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::llm::LlmError;

/// Opaque problem identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProblemId(String);

impl ProblemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A version of the id safe to embed in a file name.
    ///
    /// Characters outside `[A-Za-z0-9_-]` become `_`. When that changes the id, a hash of the
    /// original id is appended so that ids such as `imo/1` and `imo 1` get distinct stems.
    pub fn file_stem(&self) -> String {
        let sanitized: String = self
            .0
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        if sanitized == self.0 {
            sanitized
        } else {
            format!("{}_{:08x}", sanitized, fnv1a(self.0.as_bytes()))
        }
    }
}

/// 32-bit FNV-1a; stable across runs and platforms.
fn fnv1a(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0x811c_9dc5, |hash, byte| {
        (hash ^ u32::from(*byte)).wrapping_mul(0x0100_0193)
    })
}

impl fmt::Display for ProblemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An immutable problem statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: ProblemId,
    pub statement: String,
    /// Reference solution or final answer shipped with the dataset; never shown to the solver
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl Problem {
    pub fn new(id: impl Into<String>, statement: impl Into<String>) -> Self {
        Self {
            id: ProblemId::new(id),
            statement: statement.into(),
            solution: None,
        }
    }

    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }
}

/// Outcome of one verification round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationVerdict {
    pub is_good: bool,
    /// Text preceding "Detailed Verification" in the grader output; only set for bad verdicts
    pub bug_report: Option<String>,
}

/// Why an agent stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalReason {
    /// Enough consecutive passing verifications
    Verified,
    /// The improved solution did not claim to be complete
    IncompleteClaim,
    /// Too many consecutive failing verifications
    ConsecutiveFailures,
    /// The verify/correct loop hit its iteration limit
    IterationCap,
}

impl TerminalReason {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Verified)
    }
}

/// What an agent process returns when its state machine finishes.
///
/// # Invariants
/// - `solution.is_some()` iff `reason == Verified`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentOutcome {
    pub reason: TerminalReason,
    pub solution: Option<String>,
    /// Verification rounds executed
    pub iterations: usize,
}

impl AgentOutcome {
    pub fn success(solution: String, iterations: usize) -> Self {
        Self {
            reason: TerminalReason::Verified,
            solution: Some(solution),
            iterations,
        }
    }

    pub fn failure(reason: TerminalReason, iterations: usize) -> Self {
        Self {
            reason,
            solution: None,
            iterations,
        }
    }

    pub fn is_success(&self) -> bool {
        self.reason.is_success()
    }
}

/// Terminal record of one agent slot, as seen by the coordinator.
///
/// Also the payload of the success signal file an agent process writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentRunResult {
    pub problem_id: ProblemId,
    pub agent_id: usize,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_solution: Option<String>,
}

impl AgentRunResult {
    pub fn failed(problem_id: ProblemId, agent_id: usize) -> Self {
        Self {
            problem_id,
            agent_id,
            success: false,
            final_solution: None,
        }
    }
}

/// Errors that abort an agent process.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("LLM request failed: {0}")]
    Request(#[from] LlmError),
}
