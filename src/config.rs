//! Configuration management for the solver.
//!
//! Configuration can be set via environment variables:
//! - `OPENROUTER_API_KEY` - Required. Your OpenRouter API key.
//! - `SOLVER_MODEL` - Optional. Model identifier. Defaults to `deepseek/deepseek-r1-0528:free`.
//! - `SOLVER_API_URL` - Optional. Chat-completions endpoint. Defaults to OpenRouter.
//! - `SOLVER_TEMPERATURE` - Optional. Sampling temperature. Defaults to `0.1`.
//! - `SOLVER_HTTP_REFERER` - Optional. `HTTP-Referer` header. Defaults to `http://localhost`.
//! - `SOLVER_APP_TITLE` - Optional. `X-Title` header. Defaults to `Solver`.
//! - `SOLVER_REQUEST_TIMEOUT_SECS` - Optional. Per-request timeout. Defaults to `900`.
//! - `SOLVER_AGENT_BIN` - Optional. Path to the `solver-agent` binary used by the coordinator.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_MODEL: &str = "deepseek/deepseek-r1-0528:free";
pub const DEFAULT_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

/// Connection and sampling settings for the chat-completion endpoint.
#[derive(Debug, Clone)]
pub struct SolverConfig {
    /// OpenRouter API key
    pub api_key: String,

    /// Model identifier (OpenRouter format)
    pub model: String,

    /// Chat-completions endpoint
    pub api_url: String,

    /// Sampling temperature
    pub temperature: f64,

    /// Sent as `HTTP-Referer`
    pub http_referer: String,

    /// Sent as `X-Title`
    pub app_title: String,

    /// Per-request timeout
    pub request_timeout: Duration,
}

impl SolverConfig {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingEnvVar` if `OPENROUTER_API_KEY` is not set or empty.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup("OPENROUTER_API_KEY")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENROUTER_API_KEY".to_string()))?;

        let model = lookup("SOLVER_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
        let api_url = lookup("SOLVER_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let temperature = match lookup("SOLVER_TEMPERATURE") {
            Some(raw) => raw.parse().map_err(|e| {
                ConfigError::InvalidValue("SOLVER_TEMPERATURE".to_string(), format!("{}", e))
            })?,
            None => 0.1,
        };

        let http_referer =
            lookup("SOLVER_HTTP_REFERER").unwrap_or_else(|| "http://localhost".to_string());
        let app_title = lookup("SOLVER_APP_TITLE").unwrap_or_else(|| "Solver".to_string());

        let timeout_secs: u64 = match lookup("SOLVER_REQUEST_TIMEOUT_SECS") {
            Some(raw) => raw.parse().map_err(|e| {
                ConfigError::InvalidValue(
                    "SOLVER_REQUEST_TIMEOUT_SECS".to_string(),
                    format!("{}", e),
                )
            })?,
            None => 900,
        };

        Ok(Self {
            api_key,
            model,
            api_url,
            temperature,
            http_referer,
            app_title,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Bounds on the verify/correct loop of a single agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentLimits {
    /// Maximum number of verification rounds
    pub max_iterations: usize,

    /// Consecutive passing verifications needed to accept a solution
    pub required_passes: usize,

    /// Consecutive failing verifications that abandon the attempt
    pub max_consecutive_failures: usize,
}

impl Default for AgentLimits {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            required_passes: 3,
            max_consecutive_failures: 5,
        }
    }
}

/// Settings for racing several agent processes on one problem.
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Number of agent processes launched per problem
    pub num_agents: usize,

    /// Wall-clock limit for each agent process
    pub agent_timeout: Duration,

    /// Directory receiving `problem_<id>_agent_<nn>.log` files
    pub log_dir: PathBuf,

    /// Directory in which per-problem scratch directories are created
    pub work_dir: PathBuf,

    /// The `solver-agent` executable
    pub agent_bin: PathBuf,

    /// Arguments placed before the per-agent arguments (used to run the agent through a wrapper)
    pub agent_prefix_args: Vec<String>,
}

impl CoordinatorConfig {
    /// Defaults: 3 agents, 30 minute timeout, `./logs`, agent binary next to this executable.
    pub fn new(agent_bin: PathBuf) -> Self {
        Self {
            num_agents: 3,
            agent_timeout: Duration::from_secs(1800),
            log_dir: PathBuf::from("logs"),
            work_dir: PathBuf::from("."),
            agent_bin,
            agent_prefix_args: Vec::new(),
        }
    }
}

/// Resolve the `solver-agent` binary: explicit path, then `SOLVER_AGENT_BIN`, then a sibling
/// of the current executable, then whatever `solver-agent` resolves to on `PATH`.
pub fn resolve_agent_bin(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(path) = explicit {
        return path;
    }
    if let Ok(path) = std::env::var("SOLVER_AGENT_BIN") {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    let file_name = format!("solver-agent{}", std::env::consts::EXE_SUFFIX);
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join(&file_name)))
        .filter(|candidate| candidate.exists())
        .unwrap_or_else(|| PathBuf::from(file_name))
}
