//! Parallel solve coordinator.
//!
//! Races N `solver-agent` OS processes on the same problem. Each agent gets its own log file and
//! its own signal file inside a per-solve scratch directory; an agent reports success by writing
//! its [`AgentRunResult`] as JSON to the signal file. The scratch directory (problem text plus any
//! unconsumed signals) is removed when `solve` returns, on every path.
//!
//! Agents are awaited in completion order. The first success aborts the remaining slots, which
//! kills their processes (`kill_on_drop`).

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;
use tokio::task::JoinSet;

use crate::config::CoordinatorConfig;
use crate::solver::{AgentRunResult, Problem, ProblemId};

#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("Failed to prepare {what} at {path:?}: {source}")]
    Prepare {
        what: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result of racing the agents on one problem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolveReport {
    pub problem_id: ProblemId,
    pub solved: bool,
    /// Agent id of the first successful agent
    pub winner: Option<usize>,
    /// Results in completion order; slots cancelled after a success are not listed
    pub results: Vec<AgentRunResult>,
    pub elapsed_secs: f64,
}

impl SolveReport {
    /// The winning solution, if any agent reported one.
    pub fn solution(&self) -> Option<&str> {
        let winner = self.winner?;
        self.results
            .iter()
            .find(|r| r.agent_id == winner)
            .and_then(|r| r.final_solution.as_deref())
    }
}

/// Anything that can attempt a problem end to end.
#[async_trait]
pub trait ProblemSolver: Send + Sync {
    async fn solve(&self, problem: &Problem) -> Result<SolveReport, CoordinatorError>;
}

/// Launch description for one agent slot.
#[derive(Debug, Clone)]
struct AgentSlot {
    problem_id: ProblemId,
    agent_id: usize,
    program: PathBuf,
    args: Vec<String>,
    signal_path: PathBuf,
    timeout: Duration,
}

/// Runs agent processes in parallel and returns on the first success.
pub struct ParallelCoordinator {
    config: CoordinatorConfig,
}

impl ParallelCoordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// `<log_dir>/problem_<id>_agent_<nn>.log`
    pub fn log_path(&self, problem_id: &ProblemId, agent_id: usize) -> PathBuf {
        self.config.log_dir.join(format!(
            "problem_{}_agent_{:02}.log",
            problem_id.file_stem(),
            agent_id
        ))
    }

    fn slot(
        &self,
        scratch: &Path,
        problem_file: &Path,
        problem_id: &ProblemId,
        agent_id: usize,
    ) -> AgentSlot {
        let signal_path = scratch.join(format!(
            "success_{}_agent_{:02}.json",
            problem_id.file_stem(),
            agent_id
        ));

        let mut args = self.config.agent_prefix_args.clone();
        args.extend([
            problem_file.display().to_string(),
            "--log".to_string(),
            self.log_path(problem_id, agent_id).display().to_string(),
            "--signal-file".to_string(),
            signal_path.display().to_string(),
            "--problem-id".to_string(),
            problem_id.to_string(),
            "--agent-id".to_string(),
            agent_id.to_string(),
        ]);

        AgentSlot {
            problem_id: problem_id.clone(),
            agent_id,
            program: self.config.agent_bin.clone(),
            args,
            signal_path,
            timeout: self.config.agent_timeout,
        }
    }
}

#[async_trait]
impl ProblemSolver for ParallelCoordinator {
    async fn solve(&self, problem: &Problem) -> Result<SolveReport, CoordinatorError> {
        let started = Instant::now();

        tokio::fs::create_dir_all(&self.config.log_dir)
            .await
            .map_err(prepare("log directory", &self.config.log_dir))?;
        tokio::fs::create_dir_all(&self.config.work_dir)
            .await
            .map_err(prepare("work directory", &self.config.work_dir))?;

        let scratch = tempfile::Builder::new()
            .prefix(&format!("solve_{}_", problem.id.file_stem()))
            .tempdir_in(&self.config.work_dir)
            .map_err(prepare("scratch directory", &self.config.work_dir))?;
        let problem_file = scratch.path().join("problem.txt");
        tokio::fs::write(&problem_file, &problem.statement)
            .await
            .map_err(prepare("problem file", &problem_file))?;

        tracing::info!(
            problem_id = %problem.id,
            num_agents = self.config.num_agents,
            "Launching agents"
        );

        let mut slots = JoinSet::new();
        for agent_id in 0..self.config.num_agents {
            let slot = self.slot(scratch.path(), &problem_file, &problem.id, agent_id);
            slots.spawn(run_slot(slot));
        }

        let mut results: Vec<AgentRunResult> = Vec::with_capacity(self.config.num_agents);
        let mut winner = None;
        while let Some(joined) = slots.join_next().await {
            match joined {
                Ok(result) => {
                    let success = result.success;
                    let agent_id = result.agent_id;
                    results.push(result);
                    if success {
                        winner = Some(agent_id);
                        break;
                    }
                }
                Err(e) => tracing::warn!(problem_id = %problem.id, "Agent slot task failed: {}", e),
            }
        }

        if let Some(agent_id) = winner {
            tracing::info!(
                problem_id = %problem.id,
                agent_id,
                "Agent succeeded, stopping the remaining agents"
            );
            slots.abort_all();
            while slots.join_next().await.is_some() {}
        } else {
            // Slots whose task panicked still count as failures.
            for agent_id in 0..self.config.num_agents {
                if !results.iter().any(|r| r.agent_id == agent_id) {
                    results.push(AgentRunResult::failed(problem.id.clone(), agent_id));
                }
            }
        }

        Ok(SolveReport {
            problem_id: problem.id.clone(),
            solved: winner.is_some(),
            winner,
            results,
            elapsed_secs: started.elapsed().as_secs_f64(),
        })
    }
}

fn prepare(what: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> CoordinatorError {
    let path = path.to_path_buf();
    move |source| CoordinatorError::Prepare { what, path, source }
}

/// Run one agent process to completion or timeout and collect its signal.
async fn run_slot(slot: AgentSlot) -> AgentRunResult {
    let failed = || AgentRunResult::failed(slot.problem_id.clone(), slot.agent_id);

    let mut child = match Command::new(&slot.program)
        .args(&slot.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            tracing::error!(
                problem_id = %slot.problem_id,
                agent_id = slot.agent_id,
                "Failed to start agent {:?}: {}",
                slot.program,
                e
            );
            return failed();
        }
    };

    let finished = match tokio::time::timeout(slot.timeout, child.wait()).await {
        Ok(Ok(status)) => {
            tracing::info!(
                problem_id = %slot.problem_id,
                agent_id = slot.agent_id,
                exit_code = status.code().unwrap_or(-1),
                "Agent finished"
            );
            true
        }
        Ok(Err(e)) => {
            tracing::warn!(
                problem_id = %slot.problem_id,
                agent_id = slot.agent_id,
                "Failed to wait for agent: {}",
                e
            );
            false
        }
        Err(_) => {
            tracing::warn!(
                problem_id = %slot.problem_id,
                agent_id = slot.agent_id,
                "Agent timed out after {} seconds",
                slot.timeout.as_secs()
            );
            if let Err(e) = child.kill().await {
                tracing::warn!(
                    problem_id = %slot.problem_id,
                    agent_id = slot.agent_id,
                    "Failed to kill timed-out agent: {}",
                    e
                );
            }
            false
        }
    };

    // Consume the signal even when the slot failed, so nothing stale is left behind.
    let signal = consume_signal(&slot.signal_path).await;
    if !finished {
        return failed();
    }

    match signal {
        Some(result)
            if result.success
                && result.agent_id == slot.agent_id
                && result.problem_id == slot.problem_id =>
        {
            result
        }
        Some(_) => {
            tracing::warn!(
                problem_id = %slot.problem_id,
                agent_id = slot.agent_id,
                "Ignoring signal file that does not report success for this slot"
            );
            failed()
        }
        None => failed(),
    }
}

/// Read and delete a signal file. Returns `None` if it does not exist or cannot be parsed.
async fn consume_signal(path: &Path) -> Option<AgentRunResult> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read signal file {:?}: {}", path, e);
            return None;
        }
    };
    if let Err(e) = tokio::fs::remove_file(path).await {
        tracing::warn!("Failed to remove signal file {:?}: {}", path, e);
    }
    match serde_json::from_str(&raw) {
        Ok(result) => Some(result),
        Err(e) => {
            tracing::warn!("Malformed signal file {:?}: {}", path, e);
            None
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Signal-writing snippet; `$5` is the signal path, `$7` the problem id, `$9` the agent id.
    const WRITE_SIGNAL: &str = r#"printf '{"problem_id":"%s","agent_id":%s,"success":true,"final_solution":"proof by %s"}' "$7" "$9" "$9" > "$5""#;

    fn coordinator(
        root: &Path,
        script: &str,
        num_agents: usize,
        timeout: Duration,
    ) -> ParallelCoordinator {
        let mut config = CoordinatorConfig::new(PathBuf::from("/bin/sh"));
        config.num_agents = num_agents;
        config.agent_timeout = timeout;
        config.log_dir = root.join("logs");
        config.work_dir = root.join("work");
        config.agent_prefix_args = vec!["-c".to_string(), script.to_string(), "agent".to_string()];
        ParallelCoordinator::new(config)
    }

    fn scratch_entries(root: &Path) -> usize {
        std::fs::read_dir(root.join("work")).unwrap().count()
    }

    #[tokio::test]
    async fn test_first_success_wins_and_scratch_is_removed() {
        let temp = tempfile::tempdir().unwrap();
        let script = format!(r#"[ "$(cat "$1")" = "Prove it." ] && {}"#, WRITE_SIGNAL);
        let coordinator = coordinator(temp.path(), &script, 2, Duration::from_secs(30));

        let report = coordinator.solve(&Problem::new("7", "Prove it.")).await.unwrap();

        assert!(report.solved);
        let winner = report.winner.unwrap();
        assert_eq!(report.solution(), Some(format!("proof by {}", winner).as_str()));
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_completion_order_not_launch_order() {
        let temp = tempfile::tempdir().unwrap();
        let script = format!(r#"if [ "$9" = "0" ]; then sleep 10; fi; {}"#, WRITE_SIGNAL);
        let coordinator = coordinator(temp.path(), &script, 2, Duration::from_secs(30));

        let started = Instant::now();
        let report = coordinator.solve(&Problem::new("7", "p")).await.unwrap();

        assert!(report.solved);
        assert_eq!(report.winner, Some(1));
        assert_eq!(report.results.len(), 1);
        assert!(started.elapsed() < Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_timeout_fails_every_slot() {
        let temp = tempfile::tempdir().unwrap();
        let script = format!("sleep 10; {}", WRITE_SIGNAL);
        let coordinator = coordinator(temp.path(), &script, 3, Duration::from_millis(300));

        let started = Instant::now();
        let report = coordinator.solve(&Problem::new("7", "p")).await.unwrap();

        assert!(!report.solved);
        assert_eq!(report.winner, None);
        assert_eq!(report.results.len(), 3);
        assert!(report.results.iter().all(|r| !r.success));
        assert!(started.elapsed() < Duration::from_secs(8));
        assert_eq!(scratch_entries(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_agents_without_signal_are_unsolved() {
        let temp = tempfile::tempdir().unwrap();
        let script = r#"echo attempt > "$3"; exit 2"#;
        let coordinator = coordinator(temp.path(), script, 2, Duration::from_secs(30));

        let report = coordinator.solve(&Problem::new("imo 1", "p")).await.unwrap();

        assert!(!report.solved);
        let mut ids: Vec<usize> = report.results.iter().map(|r| r.agent_id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![0, 1]);

        let stem = ProblemId::new("imo 1").file_stem();
        assert_ne!(stem, "imo_1");
        let log = temp
            .path()
            .join("logs")
            .join(format!("problem_{}_agent_01.log", stem));
        assert_eq!(std::fs::read_to_string(log).unwrap(), "attempt\n");
    }

    #[tokio::test]
    async fn test_missing_agent_binary_is_a_failed_slot() {
        let temp = tempfile::tempdir().unwrap();
        let mut config = CoordinatorConfig::new(temp.path().join("no-such-agent"));
        config.num_agents = 2;
        config.log_dir = temp.path().join("logs");
        config.work_dir = temp.path().join("work");

        let report = ParallelCoordinator::new(config)
            .solve(&Problem::new("1", "p"))
            .await
            .unwrap();
        assert!(!report.solved);
        assert_eq!(report.results.len(), 2);
    }

    #[tokio::test]
    async fn test_signal_is_consumed_on_read() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("signal.json");
        std::fs::write(
            &path,
            r#"{"problem_id":"3","agent_id":0,"success":true,"final_solution":"x"}"#,
        )
        .unwrap();

        let result = consume_signal(&path).await.unwrap();
        assert!(result.success);
        assert!(!path.exists());
        assert_eq!(consume_signal(&path).await, None);
    }

    #[tokio::test]
    async fn test_signal_for_another_slot_is_ignored() {
        let temp = tempfile::tempdir().unwrap();
        let script = r#"printf '{"problem_id":"other","agent_id":0,"success":true}' > "$5""#;
        let coordinator = coordinator(temp.path(), script, 1, Duration::from_secs(30));

        let report = coordinator.solve(&Problem::new("7", "p")).await.unwrap();
        assert!(!report.solved);
    }

    #[test]
    fn test_log_path_format() {
        let mut config = CoordinatorConfig::new(PathBuf::from("solver-agent"));
        config.log_dir = PathBuf::from("logs");
        let coordinator = ParallelCoordinator::new(config);
        assert_eq!(
            coordinator.log_path(&ProblemId::new("12"), 3),
            PathBuf::from("logs/problem_12_agent_03.log")
        );
    }
}
