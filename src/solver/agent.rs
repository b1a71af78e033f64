//! Agent process - one sequential attempt at proving a problem.
//!
//! # State machine
//! ```text
//! INIT -> GENERATED -> IMPROVED -> completeness gate -> { VERIFYING <-> CORRECTING } -> DONE
//! ```
//!
//! The agent owns its conversation history and its transcript. Every LLM failure is fatal and
//! surfaces as [`AgentError`]; the expected ways of failing (incomplete claim, too many bad
//! verdicts, iteration cap) are reported through [`AgentOutcome`].

use crate::config::AgentLimits;
use crate::llm::ModelHandle;
use crate::transcript::Transcript;

use super::conversation::Conversation;
use super::extract::detailed_solution;
use super::prompts;
use super::types::{AgentError, AgentOutcome, Problem, TerminalReason};
use super::verification::Verifier;

/// Consecutive pass/fail bookkeeping for the verify/correct loop.
///
/// The two counters are mutually exclusive: recording one kind of verdict resets the other.
#[derive(Debug, Clone)]
pub struct VerdictTracker {
    limits: AgentLimits,
    consecutive_passes: usize,
    consecutive_failures: usize,
}

impl VerdictTracker {
    pub fn new(limits: AgentLimits) -> Self {
        Self {
            limits,
            consecutive_passes: 0,
            consecutive_failures: 0,
        }
    }

    /// Record one verdict and return the terminal reason if a threshold was reached.
    pub fn record(&mut self, is_good: bool) -> Option<TerminalReason> {
        if is_good {
            self.consecutive_passes += 1;
            self.consecutive_failures = 0;
            (self.consecutive_passes >= self.limits.required_passes)
                .then_some(TerminalReason::Verified)
        } else {
            self.consecutive_passes = 0;
            self.consecutive_failures += 1;
            (self.consecutive_failures >= self.limits.max_consecutive_failures)
                .then_some(TerminalReason::ConsecutiveFailures)
        }
    }

    pub fn consecutive_passes(&self) -> usize {
        self.consecutive_passes
    }

    pub fn consecutive_failures(&self) -> usize {
        self.consecutive_failures
    }
}

/// A single solve attempt bound to a model.
pub struct AgentProcess {
    model: ModelHandle,
    verifier: Verifier,
    limits: AgentLimits,
    system_prompt: String,
    transcript: Transcript,
}

impl AgentProcess {
    /// Create an agent. `extra_instructions` are appended to the generation system prompt.
    pub fn new(
        model: ModelHandle,
        limits: AgentLimits,
        extra_instructions: &[String],
        transcript: Transcript,
    ) -> Self {
        Self {
            verifier: Verifier::new(model.clone()),
            model,
            limits,
            system_prompt: prompts::generation_system_prompt(extra_instructions),
            transcript,
        }
    }

    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    /// Drive the state machine to a terminal state.
    ///
    /// # Errors
    /// Returns [`AgentError::Request`] as soon as any LLM call fails. No partial outcome is kept.
    pub async fn run(&mut self, problem: &Problem) -> Result<AgentOutcome, AgentError> {
        let mut history = Conversation::new();

        self.transcript.line(">>>>>>> Step 1: Initial Solution Generation");
        let first = self
            .model
            .complete(Some(self.system_prompt.as_str()), &problem.statement, history.messages())
            .await?;
        history.push_round(problem.statement.as_str(), first.as_str());
        self.transcript.block("First solution:", &first);

        self.transcript.line(">>>>>>> Step 2: Self Improvement");
        let mut solution = self
            .model
            .complete(
                Some(self.system_prompt.as_str()),
                prompts::SELF_IMPROVEMENT_PROMPT,
                history.messages(),
            )
            .await?;
        history.push_round(prompts::SELF_IMPROVEMENT_PROMPT, solution.as_str());
        self.transcript.block("Self-improved solution:", &solution);

        if !self
            .verifier
            .claims_completeness(&solution, &mut self.transcript)
            .await?
        {
            self.transcript
                .line(">>>>>>> Solution is not claimed to be complete. Failed.");
            return Ok(AgentOutcome::failure(TerminalReason::IncompleteClaim, 0));
        }

        let mut tracker = VerdictTracker::new(self.limits);
        let mut iteration = 0;

        while iteration < self.limits.max_iterations {
            iteration += 1;
            self.transcript.line(format!(
                "\n--- Iteration {}, Consecutive Corrects: {}, Consecutive Errors: {} ---",
                iteration,
                tracker.consecutive_passes(),
                tracker.consecutive_failures()
            ));

            let detail = match detailed_solution(&solution) {
                Some(detail) => detail,
                None => {
                    tracing::warn!(
                        problem_id = %problem.id,
                        iteration,
                        "Solution has no \"Detailed Solution\" section; verifying an empty proof"
                    );
                    ""
                }
            };

            let report = self
                .verifier
                .verify(&problem.statement, detail, &mut self.transcript)
                .await?;
            let verdict = report.verdict();
            tracing::info!(
                problem_id = %problem.id,
                iteration,
                good = verdict.is_good,
                "Verification finished"
            );

            match tracker.record(verdict.is_good) {
                Some(TerminalReason::Verified) => {
                    self.transcript
                        .line(">>>>>>> Found a correct solution after multiple verifications.");
                    return Ok(AgentOutcome::success(solution, iteration));
                }
                Some(reason) => {
                    self.transcript
                        .line(">>>>>>> Failed to find a correct solution after multiple errors.");
                    return Ok(AgentOutcome::failure(reason, iteration));
                }
                None => {}
            }

            if verdict.is_good || iteration >= self.limits.max_iterations {
                continue;
            }

            self.transcript
                .line(">>>>>>> Verification failed. Correcting based on bug report...");
            let request = prompts::correction_request(verdict.bug_report.as_deref().unwrap_or(""));
            solution = self
                .model
                .complete(Some(self.system_prompt.as_str()), &request, history.messages())
                .await?;
            history.push_round(request, solution.as_str());
            self.transcript.block("Corrected solution:", &solution);
        }

        self.transcript
            .line(">>>>>>> Reached max iteration limit. Failed to find a solution.");
        Ok(AgentOutcome::failure(TerminalReason::IterationCap, iteration))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::llm::scripted::ScriptedClient;
    use crate::llm::{ChatOptions, LlmError, Role};
    use crate::transcript::SharedBuffer;

    const GRADING_BAD: &str =
        "**Final Verdict:** invalid.\n* Critical Error in step 2\n\nDetailed Verification Log\n...";
    const GRADING_GOOD: &str = "**Final Verdict:** correct.\n\nDetailed Verification Log\n...";

    fn solution(tag: &str) -> String {
        format!("Summary {tag}\n\nDetailed Solution\n\nproof {tag}")
    }

    fn agent(client: &ScriptedClient, limits: AgentLimits) -> AgentProcess {
        let model = ModelHandle::new(Arc::new(client.clone()), "test-model", ChatOptions::default());
        AgentProcess::new(model, limits, &[], Transcript::new())
    }

    /// Queue generation, self-improvement and a "yes" completeness answer.
    fn script_opening(client: &ScriptedClient) {
        client.push_text(solution("draft"));
        client.push_text(solution("improved"));
        client.push_text("yes");
    }

    fn script_verdict(client: &ScriptedClient, good: bool) {
        if good {
            client.push_text(GRADING_GOOD);
            client.push_text("yes");
        } else {
            client.push_text(GRADING_BAD);
            client.push_text("no");
        }
    }

    #[test]
    fn test_tracker_counters_are_mutually_exclusive() {
        let mut tracker = VerdictTracker::new(AgentLimits::default());
        assert_eq!(tracker.record(true), None);
        assert_eq!(tracker.record(true), None);
        assert_eq!(tracker.consecutive_passes(), 2);

        assert_eq!(tracker.record(false), None);
        assert_eq!(tracker.consecutive_passes(), 0);
        assert_eq!(tracker.consecutive_failures(), 1);

        assert_eq!(tracker.record(true), None);
        assert_eq!(tracker.consecutive_failures(), 0);
        assert_eq!(tracker.record(true), None);
        assert_eq!(tracker.record(true), Some(TerminalReason::Verified));
    }

    #[test]
    fn test_tracker_failure_threshold() {
        let mut tracker = VerdictTracker::new(AgentLimits::default());
        for _ in 0..4 {
            assert_eq!(tracker.record(false), None);
        }
        assert_eq!(
            tracker.record(false),
            Some(TerminalReason::ConsecutiveFailures)
        );
    }

    #[tokio::test]
    async fn test_incomplete_claim_skips_verification() {
        let client = ScriptedClient::new();
        client.push_text("draft");
        client.push_text("I could not finish the proof.");
        client.push_text("no");

        let outcome = agent(&client, AgentLimits::default())
            .run(&Problem::new("1", "Prove it."))
            .await
            .unwrap();

        assert_eq!(outcome, AgentOutcome::failure(TerminalReason::IncompleteClaim, 0));
        assert_eq!(client.call_count(), 3);
    }

    #[tokio::test]
    async fn test_three_good_verdicts_return_improved_solution() {
        let client = ScriptedClient::new();
        script_opening(&client);
        for _ in 0..3 {
            script_verdict(&client, true);
        }

        let outcome = agent(&client, AgentLimits::default())
            .run(&Problem::new("1", "Prove it."))
            .await
            .unwrap();

        assert_eq!(outcome, AgentOutcome::success(solution("improved"), 3));
        assert_eq!(client.call_count(), 9);
    }

    #[tokio::test]
    async fn test_five_bad_verdicts_fail_at_iteration_five() {
        let client = ScriptedClient::new();
        script_opening(&client);
        for round in 0..5 {
            script_verdict(&client, false);
            if round < 4 {
                client.push_text(solution(&format!("fix {round}")));
            }
        }

        let outcome = agent(&client, AgentLimits::default())
            .run(&Problem::new("1", "Prove it."))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AgentOutcome::failure(TerminalReason::ConsecutiveFailures, 5)
        );
        assert_eq!(client.call_count(), 3 + 4 * 3 + 2);
    }

    #[tokio::test]
    async fn test_recovery_after_correction_succeeds_at_iteration_four() {
        let client = ScriptedClient::new();
        script_opening(&client);
        script_verdict(&client, false);
        client.push_text(solution("corrected"));
        for _ in 0..3 {
            script_verdict(&client, true);
        }

        let outcome = agent(&client, AgentLimits::default())
            .run(&Problem::new("1", "Prove it."))
            .await
            .unwrap();

        assert_eq!(outcome, AgentOutcome::success(solution("corrected"), 4));

        let requests = client.requests();
        let correction = &requests[5];
        assert_eq!(correction[0].role, Role::System);
        // system, problem, draft, improve, improved, correction request
        assert_eq!(correction.len(), 6);
        assert!(correction[5]
            .content
            .ends_with("### Bug Report\n\n**Final Verdict:** invalid.\n* Critical Error in step 2"));

        // the next grading sees the corrected proof body
        assert!(requests[6][1].content.contains("proof corrected"));
    }

    #[tokio::test]
    async fn test_iteration_cap_skips_final_correction() {
        let client = ScriptedClient::new();
        script_opening(&client);
        script_verdict(&client, true);
        script_verdict(&client, true);
        script_verdict(&client, false);

        let limits = AgentLimits {
            max_iterations: 3,
            ..AgentLimits::default()
        };
        let outcome = agent(&client, limits)
            .run(&Problem::new("1", "Prove it."))
            .await
            .unwrap();

        assert_eq!(outcome, AgentOutcome::failure(TerminalReason::IterationCap, 3));
        assert_eq!(client.call_count(), 9);
    }

    #[tokio::test]
    async fn test_alternating_verdicts_hit_default_cap_at_ten() {
        let client = ScriptedClient::new();
        script_opening(&client);
        for round in 0..5 {
            script_verdict(&client, false);
            client.push_text(solution(&format!("fix {round}")));
            script_verdict(&client, true);
        }

        let outcome = agent(&client, AgentLimits::default())
            .run(&Problem::new("1", "Prove it."))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            AgentOutcome::failure(TerminalReason::IterationCap, 10)
        );
        // opening, ten verification rounds, five corrections
        assert_eq!(client.call_count(), 3 + 10 * 2 + 5);
    }

    #[tokio::test]
    async fn test_missing_marker_verifies_empty_detail() {
        let client = ScriptedClient::new();
        client.push_text("draft");
        client.push_text("A complete proof without headings.");
        client.push_text("yes");
        for _ in 0..3 {
            script_verdict(&client, true);
        }

        let outcome = agent(&client, AgentLimits::default())
            .run(&Problem::new("1", "Prove it."))
            .await
            .unwrap();

        assert!(outcome.is_success());
        let grading_request = &client.requests()[3][1].content;
        assert!(grading_request.contains("### Solution ###\n\n\n\n"));
    }

    #[tokio::test]
    async fn test_request_error_is_fatal() {
        let client = ScriptedClient::new();
        client.push_text("draft");
        client.push_error(LlmError::client_error(402, "{\"error\":\"insufficient credits\"}".into()));

        let err = agent(&client, AgentLimits::default())
            .run(&Problem::new("1", "Prove it."))
            .await
            .unwrap_err();

        let AgentError::Request(inner) = err;
        assert!(inner.is_payment_required());
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn test_generation_uses_extra_instructions_and_writes_transcript() {
        let client = ScriptedClient::new();
        client.push_text("draft");
        client.push_text("not done");
        client.push_text("no");

        let buffer = SharedBuffer::default();
        let model = ModelHandle::new(Arc::new(client.clone()), "test-model", ChatOptions::default());
        let mut agent = AgentProcess::new(
            model,
            AgentLimits::default(),
            &["Use induction".to_string()],
            Transcript::new().with_writer(buffer.clone()),
        );
        agent.run(&Problem::new("7", "Prove it.")).await.unwrap();

        let first = &client.requests()[0];
        assert!(first[0].content.ends_with("*   Use induction"));
        assert_eq!(first[1].content, "Prove it.");

        let log = buffer.contents();
        assert!(log.contains(">>>>>>> Step 1: Initial Solution Generation"));
        assert!(log.contains("Claimed complete: no"));
        assert!(log.contains("Solution is not claimed to be complete"));
    }
}
