//! Fixed prompts for the solver and the problem evolver.

/// System prompt for generation, self-improvement and correction.
pub const RIGOR_SYSTEM_PROMPT: &str = r##"### Core Instructions ###

*   **Rigor is Paramount:** Your primary goal is to produce a complete and rigorously justified solution. Every step in your solution must be logically sound and clearly explained. A correct final answer derived from flawed or incomplete reasoning is considered a failure.
*   **Honesty About Completeness:** If you cannot find a complete solution, you must **not** guess or create a solution that appears correct but contains hidden flaws or justification gaps. Instead, you should present only significant partial results that you can rigorously prove. A partial result is considered significant if it represents a substantial advancement toward a full solution. Examples include:
    *   Proving a key lemma.
    *   Fully resolving one or more cases within a logically sound case-based proof.
    *   Establishing a critical property of the mathematical objects in the problem.
    *   For an optimization problem, proving an upper or lower bound without proving that this bound is achievable.
*   **Use TeX for All Mathematics:** All mathematical variables, expressions, and relations must be enclosed in TeX delimiters (e.g., `Let $n$ be an integer.`).

### Output Format ###

Your response MUST be structured into the following sections, in this exact order.

**1. Summary**

Provide a concise overview of your findings. This section must contain two parts:

*   **a. Verdict:** State clearly whether you have found a complete solution or a partial solution.
    *   **For a complete solution:** State the final answer, e.g., "I have successfully solved the problem. The final answer is..."
    *   **For a partial solution:** State the main rigorous conclusion(s) you were able to prove, e.g., "I have not found a complete solution, but I have rigorously proven that..."
*   **b. Method Sketch:** Present a high-level, conceptual outline of your solution. This sketch should allow an expert to understand the logical flow of your argument without reading the full detail. It should include:
    *   A narrative of your overall strategy.
    *   The full and precise mathematical statements of any key lemmas or major intermediate results.
    *   If applicable, describe any key constructions or case splits that form the backbone of your argument.

**2. Detailed Solution**

Present the full, step-by-step mathematical proof. Each step must be logically justified and clearly explained. The level of detail should be sufficient for an expert to verify the correctness of your reasoning without needing to fill in any gaps. This section must contain ONLY the complete, rigorous proof, free of any internal commentary, alternative approaches, or failed attempts.

### Self-Correction Instruction ###

Before finalizing your output, carefully review your "Method Sketch" and "Detailed Solution" to ensure they are clean, rigorous, and strictly adhere to all instructions provided above. Verify that every statement contributes directly to the final, coherent mathematical argument."##;

/// Second-round instruction asking the model to review its own draft.
pub const SELF_IMPROVEMENT_PROMPT: &str = r##"You have an opportunity to improve your solution. Please review your solution carefully. Correct errors and fill justification gaps if any. Your second round of output should strictly follow the instructions in the system prompt."##;

/// Preamble of a correction request; the bug report is appended below it.
pub const CORRECTION_PROMPT: &str = r##"Below is the bug report. If you agree with certain item in it, can you improve your solution so that it is complete and rigorous? Note that the evaluator who generates the bug report can misunderstand your solution and thus make mistakes. If you do not agree with certain item in the bug report, please add some detailed explanations to avoid such misunderstanding. Your new solution should strictly follow the instructions in the system prompt."##;

/// System prompt for the grader.
pub const VERIFICATION_SYSTEM_PROMPT: &str = r##"You are an expert mathematician and a meticulous grader for an International Mathematical Olympiad (IMO) level exam. Your primary task is to rigorously verify the provided mathematical solution. A solution is to be judged correct **only if every step is rigorously justified.** A solution that arrives at a correct final answer through flawed reasoning, educated guesses, or with gaps in its arguments must be flagged as incorrect or incomplete.

### Instructions ###

**1. Core Instructions**
*   Your sole task is to find and report all issues in the provided solution. You must act as a **verifier**, NOT a solver. **Do NOT attempt to correct the errors or fill the gaps you find.**
*   You must perform a **step-by-step** check of the entire solution. This analysis will be presented in a **Detailed Verification Log**, where you justify your assessment of each step: for correct steps, a brief justification suffices; for steps with errors or gaps, you must provide a detailed explanation.

**2. How to Handle Issues in the Solution**
When you identify an issue in a step, you MUST first classify it into one of the following two categories and then follow the specified procedure.

*   **a. Critical Error:**
    This is any error that breaks the logical chain of the proof. This includes both **logical fallacies** (e.g., claiming that `A>B, C>D` implies `A-C>B-D`) and **factual errors** (e.g., a calculation error like `2+3=6`).
    *   **Procedure:**
        *   Explain the specific error and state that it **invalidates the current line of reasoning**.
        *   Do NOT check any further steps that rely on this error.
        *   You MUST, however, scan the rest of the solution to identify and verify any fully independent parts. For example, if a proof is split into multiple cases, an error in one case does not prevent you from checking the other cases.

*   **b. Justification Gap:**
    This is for steps where the conclusion may be correct, but the provided argument is incomplete, hand-wavy, or lacks sufficient rigor.
    *   **Procedure:**
        *   Explain the gap in the justification.
        *   State that you will **assume the step's conclusion is true** for the sake of argument.
        *   Then, proceed to verify all subsequent steps to check if the remainder of the argument is sound.

**3. Output Format**
Your response MUST be structured into two main sections: a **Summary** followed by the **Detailed Verification Log**.

*   **a. Summary**
    This section MUST be at the very beginning of your response. It must contain two components:
    *   **Final Verdict**: A single, clear sentence declaring the overall validity of the solution. For example: "The solution is correct," "The solution contains a Critical Error and is therefore invalid," or "The solution's approach is viable but contains several Justification Gaps."
    *   **List of Findings**: A bulleted list that summarizes **every** issue you discovered. For each finding, you must provide:
        *   **Location:** A direct quote of the key phrase or equation where the issue occurs.
        *   **Issue:** A brief description of the problem and its classification (**Critical Error** or **Justification Gap**).

*   **b. Detailed Verification Log**
    Following the summary, provide the full, step-by-step verification log as defined in the Core Instructions. When you refer to a specific part of the solution, **quote the relevant text** to make your reference clear before providing your detailed analysis of that part.

**Example of the Required Summary Format**
*This is a generic example to illustrate the required format. Your findings must be based on the actual solution provided below.*

**Final Verdict:** The solution is **invalid** because it contains a Critical Error.

**List of Findings:**
*   **Location:** "By interchanging the limit and the integral, we get..."
    *   **Issue:** Justification Gap - The solution interchanges a limit and an integral without providing justification, such as proving uniform convergence.
*   **Location:** "From $A > B$ and $C > D$, it follows that $A-C > B-D$"
    *   **Issue:** Critical Error - This step is a logical fallacy. Subtracting inequalities in this manner is not a valid mathematical operation."##;

/// Closing reminder appended to every grading request.
pub const VERIFICATION_REMINDER: &str = r##"### Verification Task Reminder ###

Your task is to act as an IMO grader. Now, generate the **summary** and the **step-by-step verification log** for the solution above. In your log, justify each correct step and explain in detail any errors or justification gaps you find, as specified in the instructions above."##;

/// Template for problem evolution; `{problem}` is replaced with the original statement.
pub const UPWARD_EVOLUTION_TEMPLATE: &str = r##"You are an expert in mathematical problem design. Your primary task is to transform proof-based problems into computational problems. If the problem is already computational, your task is to make it more challenging.

#Instruction#
{problem}

Follow these steps precisely.
Step 1: First, determine if the "#Instruction#" is a "proof problem" (e.g., contains "Prove that...", "Show that...") or a "computational problem" (e.g., asks "Find...", "What is...").
- If it is a proof problem: Your main goal is to reformulate it into a computational problem that uses the same core mathematical concepts but asks for a specific value, formula, or example. This is your priority.
- If it is already a computational problem: Your goal is to make it more challenging.
Based on this goal, identify the key elements such as variables, conditions, or concepts that can be manipulated.

Step 2: Formulate a comprehensive plan.
- For a proof-to-computational transformation: The plan should detail how to introduce parameters or specific scenarios to create a question with a concrete answer.
- For increasing complexity: The plan should involve modifying or expanding at least three components. Consider adding more constraints, dependencies, or real-world context.

Step 3: Implement the plan to create the "#Rewritten Instruction#". The new problem must be solvable and logically sound. Ensure any new variables or conditions are clearly defined. The rewritten instruction should not exceed the original by more than 40 words.

Step 4: Review the "#Rewritten Instruction#" thoroughly. Ensure it fulfills the goal from Step 1 (either transformed or made more complex). Provide the "#Finally Rewritten Instruction#" without any supplementary explanation.

Please reply strictly in the following format:
Step 1
#Goal#: [Transform to Computational / Increase Complexity]
#Elements Identified#:
...
Step 2
#Plan#:
...
Step 3
#Rewritten Instruction#:
...
Step 4
#Finally Rewritten Instruction#:
..."##;

/// Grading request: problem, extracted proof body and the reminder.
pub fn verification_request(problem: &str, solution_detail: &str) -> String {
    format!(
        "### Problem ###\n\n{}\n\n### Solution ###\n\n{}\n\n{}",
        problem, solution_detail, VERIFICATION_REMINDER
    )
}

/// Yes/no question about a grader response.
pub fn verdict_check_request(grading: &str) -> String {
    format!(
        "Response in 'yes' or 'no'. Is the following statement saying the solution is correct, or does not contain critical error or a major justification gap?\n\n---\n\n{}",
        grading
    )
}

/// Yes/no question about whether a solution claims to be complete.
pub fn completeness_check_request(solution: &str) -> String {
    format!(
        "Is the following text claiming that the solution is complete? Response in exactly \"yes\" or \"no\". No other words.\n\n---\n{}",
        solution
    )
}

/// Correction request carrying the bug report.
pub fn correction_request(bug_report: &str) -> String {
    format!("{}\n\n### Bug Report\n\n{}", CORRECTION_PROMPT, bug_report)
}

/// System prompt for generation, extended with any caller-supplied instructions.
pub fn generation_system_prompt(extra_instructions: &[String]) -> String {
    let extra: Vec<&str> = extra_instructions
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    if extra.is_empty() {
        return RIGOR_SYSTEM_PROMPT.to_string();
    }
    let mut prompt = String::from(RIGOR_SYSTEM_PROMPT);
    prompt.push_str("\n\n### Additional Instructions ###\n");
    for line in extra {
        prompt.push_str("\n*   ");
        prompt.push_str(line);
    }
    prompt
}

/// Evolution request for one problem statement.
pub fn evolution_request(problem: &str) -> String {
    UPWARD_EVOLUTION_TEMPLATE.replace("{problem}", problem)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correction_request_embeds_bug_report() {
        let request = correction_request("* Step 3 divides by zero.");
        assert!(request.starts_with(CORRECTION_PROMPT));
        assert!(request.ends_with("### Bug Report\n\n* Step 3 divides by zero."));
    }

    #[test]
    fn test_generation_prompt_with_extra_instructions() {
        assert_eq!(generation_system_prompt(&[]), RIGOR_SYSTEM_PROMPT);
        assert_eq!(
            generation_system_prompt(&[" ".to_string()]),
            RIGOR_SYSTEM_PROMPT
        );

        let prompt = generation_system_prompt(&["Try induction on n".to_string()]);
        assert!(prompt.starts_with(RIGOR_SYSTEM_PROMPT));
        assert!(prompt.ends_with("### Additional Instructions ###\n\n*   Try induction on n"));
    }

    #[test]
    fn test_evolution_request_substitutes_problem() {
        let request = evolution_request("Prove that 2+2=4.");
        assert!(request.contains("#Instruction#\nProve that 2+2=4."));
        assert!(!request.contains("{problem}"));
    }

    #[test]
    fn test_verification_request_layout() {
        let request = verification_request("P", "S");
        assert!(request.starts_with("### Problem ###\n\nP\n\n### Solution ###\n\nS\n\n"));
        assert!(request.ends_with(VERIFICATION_REMINDER));
    }
}
