use std::collections::BTreeMap;

use crate::answers::AnswerStore;
use crate::spec::{QuestionSpec, StepSpec};

pub type VisibilityMap = BTreeMap<String, bool>;

/// A question without a conditional is always shown. Otherwise the string form of
/// the controller's answer must equal one of the accepted values, case included.
/// An unanswered controller never matches.
pub fn is_visible(question: &QuestionSpec, answers: &AnswerStore) -> bool {
    let Some(conditional) = &question.conditional else {
        return true;
    };
    let Some(current) = answers
        .get(&conditional.field)
        .and_then(|value| value.coerce_string())
    else {
        return false;
    };
    conditional.accepted().any(|accepted| accepted == current)
}

pub fn resolve_visibility(step: &StepSpec, answers: &AnswerStore) -> VisibilityMap {
    step.questions
        .iter()
        .map(|question| (question.id.clone(), is_visible(question, answers)))
        .collect()
}

pub fn visible_questions<'a>(
    step: &'a StepSpec,
    answers: &'a AnswerStore,
) -> impl Iterator<Item = &'a QuestionSpec> + 'a {
    step.questions
        .iter()
        .filter(move |question| is_visible(question, answers))
}
