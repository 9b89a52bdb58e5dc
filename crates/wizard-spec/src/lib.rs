#![allow(missing_docs)]

pub mod answers;
pub mod navigation;
pub mod persistence;
pub mod render;
pub mod spec;
pub mod submission;
pub mod validate;
pub mod visibility;

pub use answers::{AnswerDecodeError, AnswerStore, AnswerValue, FileRef, is_empty};
pub use navigation::{EditOutcome, NavOutcome, NavState, WizardController};
pub use persistence::{
    DraftStore, FileBackend, KeyValueBackend, MemoryBackend, PersistenceError, ScopedDraft,
};
pub use render::{
    ConfirmationView, MenuEntry, QuestionView, StepView, build_step_view, render_json_ui,
    render_text,
};
pub use spec::{
    Conditional, FormConfig, Layout, QuestionSpec, QuestionType, SpecError, SpecIssue, StepSpec,
};
pub use submission::Submission;
pub use validate::{
    FieldErrors, StepGates, ValidationError, all_visible_answered, check_value, step_gates,
    validate_step,
};
pub use visibility::{VisibilityMap, is_visible, resolve_visibility, visible_questions};

/// JSON Schema describing the form definition document.
pub fn form_schema() -> serde_json::Value {
    serde_json::to_value(schemars::schema_for!(FormConfig)).unwrap_or(serde_json::Value::Null)
}
