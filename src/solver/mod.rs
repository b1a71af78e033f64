//! The proof-solving agent and its building blocks.
//!
//! - [`AgentProcess`]: generate, self-improve, completeness gate, then verify/correct
//! - [`Verifier`]: one grading round plus yes/no classification
//! - [`extract`]: marker-based section extraction
//! - [`prompts`]: fixed prompt texts and request builders

mod agent;
mod conversation;
pub mod extract;
pub mod prompts;
mod types;
mod verification;

pub use agent::{AgentProcess, VerdictTracker};
pub use conversation::Conversation;
pub use types::{
    AgentError, AgentOutcome, AgentRunResult, Problem, ProblemId, TerminalReason,
    VerificationVerdict,
};
pub use verification::{VerificationReport, Verifier};
