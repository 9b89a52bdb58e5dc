use std::collections::BTreeSet;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::spec::question::QuestionSpec;
use crate::spec::step::StepSpec;

/// Top-level questionnaire definition. Immutable once a session starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FormConfig {
    pub title: String,
    pub steps: Vec<StepSpec>,
}

/// Errors raised while loading a form definition.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to parse form definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("form '{0}' has no steps")]
    NoSteps(String),
}

/// Structural problems found by [`FormConfig::check`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecIssue {
    #[error("form has no steps")]
    NoSteps,
    #[error("question id '{0}' is used more than once")]
    DuplicateQuestion(String),
    #[error("question '{0}' needs at least one option")]
    MissingOptions(String),
    #[error("question '{question}' depends on unknown question '{field}'")]
    UnknownController { question: String, field: String },
    #[error("question '{0}' depends on itself")]
    SelfReference(String),
}

impl FormConfig {
    pub fn from_json(raw: &str) -> Result<Self, SpecError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn step(&self, index: usize) -> Option<&StepSpec> {
        self.steps.get(index)
    }

    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Index of the final step, `None` for a form without steps.
    pub fn last_index(&self) -> Option<usize> {
        self.steps.len().checked_sub(1)
    }

    pub fn questions(&self) -> impl Iterator<Item = &QuestionSpec> {
        self.steps.iter().flat_map(|step| step.questions.iter())
    }

    pub fn find_question(&self, id: &str) -> Option<&QuestionSpec> {
        self.questions().find(|question| question.id == id)
    }

    /// Lower-case, dash separated form of the title, used to scope drafts.
    pub fn slug(&self) -> String {
        let mut slug = String::with_capacity(self.title.len());
        for ch in self.title.chars() {
            if ch.is_ascii_alphanumeric() {
                slug.push(ch.to_ascii_lowercase());
            } else if !slug.is_empty() && !slug.ends_with('-') {
                slug.push('-');
            }
        }
        while slug.ends_with('-') {
            slug.pop();
        }
        if slug.is_empty() {
            slug.push_str("wizard");
        }
        slug
    }

    /// Reports structural problems; an empty list means the form can run.
    pub fn check(&self) -> Vec<SpecIssue> {
        let mut issues = Vec::new();
        if self.steps.is_empty() {
            issues.push(SpecIssue::NoSteps);
        }

        let mut seen = BTreeSet::new();
        for question in self.questions() {
            if !seen.insert(question.id.as_str()) {
                issues.push(SpecIssue::DuplicateQuestion(question.id.clone()));
            }
            if question.kind.has_options() && question.options().is_empty() {
                issues.push(SpecIssue::MissingOptions(question.id.clone()));
            }
        }

        for question in self.questions() {
            let Some(conditional) = &question.conditional else {
                continue;
            };
            if conditional.field == question.id {
                issues.push(SpecIssue::SelfReference(question.id.clone()));
            } else if !seen.contains(conditional.field.as_str()) {
                issues.push(SpecIssue::UnknownController {
                    question: question.id.clone(),
                    field: conditional.field.clone(),
                });
            }
        }

        issues
    }
}
