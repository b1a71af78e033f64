//! Verification cycle - grades a candidate proof and turns the grading into a verdict.
//!
//! # Protocol
//! 1. Grade `{problem, proof body}` under the grader system prompt (no conversation history)
//! 2. Ask an independent yes/no question about the grading text
//! 3. On "no", the bug report is the grading summary (text before "Detailed Verification")
//!
//! The completeness gate used before the loop lives here too, since it is the same kind of
//! history-free yes/no classification.

use crate::llm::{LlmError, ModelHandle};
use crate::transcript::Transcript;

use super::extract::{says_yes, verification_summary};
use super::prompts;
use super::types::VerificationVerdict;

/// Raw texts produced by one verification round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationReport {
    /// Full grader output
    pub grading: String,
    /// Answer to the yes/no question about the grading
    pub verdict_text: String,
    /// Empty unless the verdict is bad
    pub bug_report: String,
}

impl VerificationReport {
    pub fn is_good(&self) -> bool {
        says_yes(&self.verdict_text)
    }

    pub fn verdict(&self) -> VerificationVerdict {
        let is_good = self.is_good();
        VerificationVerdict {
            is_good,
            bug_report: (!is_good).then(|| self.bug_report.clone()),
        }
    }
}

/// Stateless grader bound to a model.
pub struct Verifier {
    model: ModelHandle,
}

impl Verifier {
    pub fn new(model: ModelHandle) -> Self {
        Self { model }
    }

    /// Run one verification round.
    ///
    /// # Errors
    /// Any request failure is returned unchanged; the caller decides whether it is fatal.
    pub async fn verify(
        &self,
        problem: &str,
        solution_detail: &str,
        transcript: &mut Transcript,
    ) -> Result<VerificationReport, LlmError> {
        transcript.line(">>>>>>> Start verification.");

        let request = prompts::verification_request(problem, solution_detail);
        let grading = self
            .model
            .complete(Some(prompts::VERIFICATION_SYSTEM_PROMPT), &request, &[])
            .await?;
        transcript.block("Verification results:", &grading);

        let verdict_text = self
            .model
            .complete(None, &prompts::verdict_check_request(&grading), &[])
            .await?;
        transcript.line(format!(">>>>>>> Is verification good? {}", verdict_text));

        let bug_report = if says_yes(&verdict_text) {
            String::new()
        } else {
            let summary = match verification_summary(&grading) {
                Some(summary) => summary,
                None => {
                    tracing::warn!(
                        "Grader output has no \"Detailed Verification\" section; bug report is empty"
                    );
                    ""
                }
            };
            transcript.line(">>>>>>> Bug report generated.");
            summary.to_string()
        };

        Ok(VerificationReport {
            grading,
            verdict_text,
            bug_report,
        })
    }

    /// Ask whether `solution` claims to be a complete solution.
    pub async fn claims_completeness(
        &self,
        solution: &str,
        transcript: &mut Transcript,
    ) -> Result<bool, LlmError> {
        let answer = self
            .model
            .complete(None, &prompts::completeness_check_request(solution), &[])
            .await?;
        transcript.line(format!("Claimed complete: {}", answer));
        Ok(says_yes(&answer))
    }
}
