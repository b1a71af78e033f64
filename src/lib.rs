//! # proof-solver
//!
//! Multi-agent "solve, verify, correct" loop for olympiad-style proofs against an
//! OpenRouter-compatible chat-completion API, plus a problem evolution tool.
//!
//! ## Architecture
//!
//! ```text
//!   BatchRunner ──► ParallelCoordinator ──► N × solver-agent (OS processes)
//!                                                │
//!                                                ▼
//!                                          AgentProcess ──► Verifier
//!                                                │             │
//!                                                └──► LlmClient ◄┘
//! ```
//!
//! ## Modules
//! - `llm`: chat-completion client, error classification and retry wrapper
//! - `solver`: the agent state machine and verification cycle
//! - `coordinator`: races agent processes on one problem
//! - `batch`: solves a problem slice sequentially and summarizes
//! - `dataset` / `sink`: JSON Lines input and output
//! - `evolve`: rewrites problems into harder variants
//! - `transcript`: multi-destination run transcript

pub mod batch;
pub mod config;
pub mod coordinator;
pub mod dataset;
pub mod evolve;
pub mod llm;
pub mod sink;
pub mod solver;
pub mod transcript;

pub use config::{AgentLimits, CoordinatorConfig, SolverConfig};
pub use coordinator::{ParallelCoordinator, ProblemSolver, SolveReport};
pub use solver::{AgentProcess, Problem};
pub use transcript::Transcript;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global tracing subscriber. Diagnostics go to stderr; `RUST_LOG` overrides
/// `default_filter`.
pub fn init_tracing(default_filter: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
