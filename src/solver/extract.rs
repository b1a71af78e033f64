//! Marker-based section extraction from model output.
//!
//! Absence of a marker is reported as `None`, which callers must tell apart from a marker
//! followed by nothing (`Some("")`).

/// Heading that introduces the proof body of a solution.
pub const DETAILED_SOLUTION_MARKER: &str = "Detailed Solution";

/// Heading that introduces the step-by-step log of a grader response.
pub const DETAILED_VERIFICATION_MARKER: &str = "Detailed Verification";

/// Text after the first occurrence of `marker`, trimmed.
pub fn section_after<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.find(marker)
        .map(|idx| text[idx + marker.len()..].trim())
}

/// Text before the first occurrence of `marker`, trimmed.
pub fn section_before<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.find(marker).map(|idx| text[..idx].trim())
}

/// The proof body of a solution, or `None` if it has no "Detailed Solution" heading.
pub fn detailed_solution(solution: &str) -> Option<&str> {
    section_after(solution, DETAILED_SOLUTION_MARKER)
}

/// The summary part of a grader response (everything before "Detailed Verification").
pub fn verification_summary(grading: &str) -> Option<&str> {
    section_before(grading, DETAILED_VERIFICATION_MARKER)
}

/// Case-insensitive "yes" test used for every binary classification answer.
pub fn says_yes(answer: &str) -> bool {
    answer.to_lowercase().contains("yes")
}
