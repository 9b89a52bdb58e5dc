use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::answers::{AnswerStore, AnswerValue, is_empty};
use crate::spec::{QuestionSpec, QuestionType, StepSpec};
use crate::visibility::{is_visible, visible_questions};

pub const REQUIRED_MESSAGE: &str = "This question is required.";

/// Per-question error reported to the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ValidationError {
    pub question_id: String,
    pub message: String,
    pub code: String,
}

/// Errors for the active step, keyed by question id.
pub type FieldErrors = BTreeMap<String, ValidationError>;

/// Transition gates derived from the current answers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, JsonSchema)]
pub struct StepGates {
    pub required_visible: Vec<String>,
    pub next_enabled: bool,
    pub save_enabled: bool,
}

/// One required-field error for every visible, required, unanswered question.
/// Hidden questions are never validated.
pub fn validate_step(step: &StepSpec, answers: &AnswerStore) -> FieldErrors {
    step.questions
        .iter()
        .filter(|question| question.required && is_visible(question, answers))
        .filter(|question| is_empty(answers.get(&question.id)))
        .map(|question| {
            (
                question.id.clone(),
                base_error(question, REQUIRED_MESSAGE, "required"),
            )
        })
        .collect()
}

pub fn step_gates(step: &StepSpec, answers: &AnswerStore) -> StepGates {
    let required_visible = visible_questions(step, answers)
        .filter(|question| question.required)
        .map(|question| question.id.clone())
        .collect::<Vec<_>>();
    let next_enabled = required_visible
        .iter()
        .all(|id| !is_empty(answers.get(id)));
    let save_enabled =
        visible_questions(step, answers).any(|question| !is_empty(answers.get(&question.id)));

    StepGates {
        required_visible,
        next_enabled,
        save_enabled,
    }
}

/// Whether every visible question on the step, required or not, has an answer.
pub fn all_visible_answered(step: &StepSpec, answers: &AnswerStore) -> bool {
    visible_questions(step, answers).all(|question| !is_empty(answers.get(&question.id)))
}

/// Checks that an edit fits the question before it reaches the answer store.
pub fn check_value(question: &QuestionSpec, value: &AnswerValue) -> Option<ValidationError> {
    match (question.kind, value) {
        (_, AnswerValue::Empty) => None,
        (QuestionType::File, AnswerValue::File(_)) => None,
        (QuestionType::File, AnswerValue::Text(_)) | (_, AnswerValue::File(_)) => Some(
            base_error(question, "value does not fit this question", "type_mismatch"),
        ),
        (kind, AnswerValue::Text(text)) if kind.has_options() => {
            let text = text.trim();
            if text.is_empty() || question.options().iter().any(|option| option == text) {
                None
            } else {
                Some(base_error(
                    question,
                    "value is not one of the available options",
                    "invalid_option",
                ))
            }
        }
        (_, AnswerValue::Text(_)) => None,
    }
}

fn base_error(question: &QuestionSpec, message: &str, code: &str) -> ValidationError {
    ValidationError {
        question_id: question.id.clone(),
        message: message.into(),
        code: code.into(),
    }
}
