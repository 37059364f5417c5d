//! Checklist evaluator: derives whether secondary verification is required.
//!
//! The rule is a business policy kept apart from persistence so it can change
//! on its own: verification is required iff any answer for one of the
//! [`VERIFICATION_STEPS`] is negative. Steps 1 and 5 never trigger it.

use toma5_types::checklist::{CHECKLIST_STEPS, ChecklistAnswer};
use toma5_types::error::WorkflowError;

/// Steps whose negative answer requires secondary verification.
pub const VERIFICATION_STEPS: [u8; 3] = [2, 3, 4];

/// `true` iff some answer for a step in [`VERIFICATION_STEPS`] is `false`.
///
/// Total over every input: an empty list yields `false`, and duplicate steps
/// are all considered.
pub fn requires_secondary_verification(answers: &[ChecklistAnswer]) -> bool {
    answers
        .iter()
        .any(|a| VERIFICATION_STEPS.contains(&a.step) && !a.answer)
}

/// Shape checks on a submitted answer set.
pub fn validate_answers(answers: &[ChecklistAnswer]) -> Result<(), WorkflowError> {
    if answers.is_empty() {
        return Err(WorkflowError::invalid_input("at least one answer is required"));
    }
    for answer in answers {
        if answer.step == 0 || answer.step > CHECKLIST_STEPS {
            return Err(WorkflowError::invalid_input(format!(
                "answer step {} is outside 1..={CHECKLIST_STEPS}",
                answer.step
            )));
        }
        if answer.question.trim().is_empty() {
            return Err(WorkflowError::invalid_input(format!(
                "answer for step {} has no question text",
                answer.step
            )));
        }
    }
    Ok(())
}
