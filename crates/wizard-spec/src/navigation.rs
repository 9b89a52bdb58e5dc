//! The wizard state machine.
//!
//! [`WizardController`] owns the answers, the active step and the injected
//! [`DraftStore`]. Every user event goes through one of its methods; each
//! method either commits a whole transition or leaves the state untouched and
//! reports why.

use tracing::{debug, warn};

use crate::answers::{AnswerStore, AnswerValue};
use crate::persistence::DraftStore;
use crate::render::{StepView, build_step_view};
use crate::spec::{FormConfig, SpecError, StepSpec};
use crate::submission::Submission;
use crate::validate::{
    FieldErrors, StepGates, ValidationError, all_visible_answered, check_value, step_gates,
    validate_step,
};
use crate::visibility::is_visible;

/// Controller state on top of the active step index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Active,
    /// The unsaved-changes dialog is open. `target` is `None` for an exit request.
    ConfirmPending { target: Option<usize> },
}

/// Result of a navigation request.
#[derive(Debug, Clone, PartialEq)]
pub enum NavOutcome {
    Moved { from: usize, to: usize },
    /// Validation failed; `errors` field errors are now shown.
    Blocked { errors: usize },
    ConfirmationOpened { target: Option<usize> },
    ConfirmationDismissed,
    /// The session should end; the draft holds the answers.
    Exited,
    Submitted(Submission),
    /// Out-of-range or wrong-state request; nothing changed.
    Ignored,
}

/// Result of an edit event.
#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied,
    Rejected(ValidationError),
    Ignored,
}

pub struct WizardController<S: DraftStore> {
    form: FormConfig,
    store: S,
    answers: AnswerStore,
    checkpoint: AnswerStore,
    step_index: usize,
    field_errors: FieldErrors,
    state: NavState,
}

impl<S: DraftStore> WizardController<S> {
    /// Resumes the draft held by `store`, or starts from `initial` at step 0
    /// when there is no usable draft.
    pub fn start(form: FormConfig, store: S, initial: AnswerStore) -> Result<Self, SpecError> {
        if form.steps.is_empty() {
            return Err(SpecError::NoSteps(form.title.clone()));
        }

        let (answers, step_index) = match load_draft(&store, form.step_count()) {
            Some((answers, step_index)) => {
                debug!(step = step_index, "resuming draft");
                (answers.unwrap_or(initial), step_index)
            }
            None => (initial, 0),
        };

        Ok(Self {
            form,
            store,
            checkpoint: answers.clone(),
            answers,
            step_index,
            field_errors: FieldErrors::new(),
            state: NavState::Active,
        })
    }

    pub fn form(&self) -> &FormConfig {
        &self.form
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn current_step(&self) -> &StepSpec {
        &self.form.steps[self.step_index]
    }

    pub fn is_last_step(&self) -> bool {
        self.step_index + 1 == self.form.step_count()
    }

    pub fn answers(&self) -> &AnswerStore {
        &self.answers
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn state(&self) -> NavState {
        self.state
    }

    pub fn confirmation_open(&self) -> bool {
        matches!(self.state, NavState::ConfirmPending { .. })
    }

    /// Pending jump target while the dialog is open.
    pub fn pending_target(&self) -> Option<usize> {
        match self.state {
            NavState::ConfirmPending { target } => target,
            NavState::Active => None,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn gates(&self) -> StepGates {
        step_gates(self.current_step(), &self.answers)
    }

    /// Presentation view of the active step.
    ///
    /// # Panics
    ///
    /// Never in practice: `start` rejects forms without steps and every
    /// transition keeps the step index below the step count.
    pub fn view(&self) -> StepView {
        build_step_view(
            &self.form,
            self.step_index,
            &self.answers,
            &self.field_errors,
            self.state,
        )
        .expect("step index is kept in range")
    }

    /// Applies an edit reported by the presentation layer for a question on the
    /// active step.
    pub fn edit(&mut self, question_id: &str, value: AnswerValue) -> EditOutcome {
        if self.state != NavState::Active {
            debug!(question_id, "edit ignored while confirmation is open");
            return EditOutcome::Ignored;
        }
        let step = &self.form.steps[self.step_index];
        let Some(question) = step.question(question_id) else {
            debug!(question_id, "edit ignored for question outside the active step");
            return EditOutcome::Ignored;
        };
        if let Some(error) = check_value(question, &value) {
            self.field_errors
                .insert(question_id.to_string(), error.clone());
            return EditOutcome::Rejected(error);
        }

        self.answers.set(question_id, value);
        self.field_errors.remove(question_id);
        let answers = &self.answers;
        self.field_errors.retain(|id, _| {
            step.question(id)
                .is_some_and(|question| is_visible(question, answers))
        });
        debug!(question_id, "answer updated");
        self.persist_answers();
        EditOutcome::Applied
    }

    pub fn request_next(&mut self) -> NavOutcome {
        if self.state != NavState::Active || self.is_last_step() {
            return NavOutcome::Ignored;
        }
        if self.run_validation() {
            self.enter_step(self.step_index + 1)
        } else {
            self.blocked()
        }
    }

    /// Moves back one step without validating.
    pub fn request_prev(&mut self) -> NavOutcome {
        if self.state != NavState::Active || self.step_index == 0 {
            return NavOutcome::Ignored;
        }
        self.enter_step(self.step_index - 1)
    }

    pub fn request_jump(&mut self, target: usize) -> NavOutcome {
        if self.state != NavState::Active
            || target >= self.form.step_count()
            || target == self.step_index
        {
            return NavOutcome::Ignored;
        }
        if self.run_validation() {
            self.enter_step(target)
        } else {
            self.open_confirmation(Some(target))
        }
    }

    pub fn request_save_and_exit(&mut self) -> NavOutcome {
        if self.state != NavState::Active {
            return NavOutcome::Ignored;
        }
        if all_visible_answered(self.current_step(), &self.answers) {
            self.save();
            debug!(step = self.step_index, "saved and exiting");
            NavOutcome::Exited
        } else {
            self.open_confirmation(None)
        }
    }

    /// Drops the edits made since the step was entered, then follows the
    /// pending request.
    pub fn confirm_proceed_without_saving(&mut self) -> NavOutcome {
        let NavState::ConfirmPending { target } = self.state else {
            return NavOutcome::Ignored;
        };
        self.answers = self.checkpoint.clone();
        self.persist_answers();
        debug!(step = self.step_index, "discarded unsaved edits");
        self.proceed(target)
    }

    pub fn confirm_save_and_proceed(&mut self) -> NavOutcome {
        let NavState::ConfirmPending { target } = self.state else {
            return NavOutcome::Ignored;
        };
        self.save();
        self.proceed(target)
    }

    pub fn dismiss_confirmation(&mut self) -> NavOutcome {
        if self.state == NavState::Active {
            return NavOutcome::Ignored;
        }
        self.state = NavState::Active;
        NavOutcome::ConfirmationDismissed
    }

    /// Final submission from the last step. On success the draft is cleared and
    /// the controller starts over at step 0 with no answers.
    pub fn submit(&mut self) -> NavOutcome {
        if self.state != NavState::Active || !self.is_last_step() {
            return NavOutcome::Ignored;
        }
        if !self.run_validation() {
            return self.blocked();
        }

        let submission = Submission {
            form_title: self.form.title.clone(),
            step_count: self.form.step_count(),
            answers: std::mem::take(&mut self.answers),
        };
        if let Err(err) = self.store.clear_answers() {
            warn!(error = %err, "failed to clear draft answers");
        }
        if let Err(err) = self.store.clear_step_index() {
            warn!(error = %err, "failed to clear draft step");
        }
        self.checkpoint.clear();
        self.field_errors.clear();
        self.step_index = 0;
        debug!(answers = submission.answers.len(), "submitted");
        NavOutcome::Submitted(submission)
    }

    fn proceed(&mut self, target: Option<usize>) -> NavOutcome {
        self.state = NavState::Active;
        match target {
            Some(target) => self.enter_step(target),
            None => NavOutcome::Exited,
        }
    }

    fn open_confirmation(&mut self, target: Option<usize>) -> NavOutcome {
        debug!(step = self.step_index, ?target, "confirmation opened");
        self.state = NavState::ConfirmPending { target };
        NavOutcome::ConfirmationOpened { target }
    }

    fn enter_step(&mut self, to: usize) -> NavOutcome {
        let from = self.step_index;
        self.step_index = to;
        self.state = NavState::Active;
        self.field_errors.clear();
        self.checkpoint = self.answers.clone();
        self.persist_step();
        debug!(from, to, "moved");
        NavOutcome::Moved { from, to }
    }

    fn run_validation(&mut self) -> bool {
        self.field_errors = validate_step(self.current_step(), &self.answers);
        self.field_errors.is_empty()
    }

    fn blocked(&self) -> NavOutcome {
        debug!(
            step = self.step_index,
            errors = self.field_errors.len(),
            "transition blocked"
        );
        NavOutcome::Blocked {
            errors: self.field_errors.len(),
        }
    }

    fn save(&mut self) {
        self.persist_answers();
        self.persist_step();
        self.checkpoint = self.answers.clone();
    }

    fn persist_answers(&mut self) {
        if let Err(err) = self.store.write_answers(&self.answers.serialize()) {
            warn!(error = %err, "failed to write draft answers");
        }
    }

    fn persist_step(&mut self) {
        if let Err(err) = self.store.write_step_index(&self.step_index.to_string()) {
            warn!(error = %err, "failed to write draft step");
        }
    }
}

/// Reads a usable draft. Malformed answers mean there is no prior session; a
/// malformed or out-of-range step index falls back to the first step.
fn load_draft<S: DraftStore>(
    store: &S,
    step_count: usize,
) -> Option<(Option<AnswerStore>, usize)> {
    let raw_answers = match store.read_answers() {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "failed to read draft answers");
            return None;
        }
    };
    let raw_step = match store.read_step_index() {
        Ok(raw) => raw,
        Err(err) => {
            warn!(error = %err, "failed to read draft step");
            None
        }
    };
    if raw_answers.is_none() && raw_step.is_none() {
        return None;
    }

    let answers = match raw_answers.as_deref().map(AnswerStore::deserialize) {
        None => None,
        Some(Ok(answers)) => Some(answers),
        Some(Err(err)) => {
            warn!(error = %err, "ignoring malformed draft");
            return None;
        }
    };
    let step_index = raw_step
        .and_then(|raw| raw.trim().parse::<usize>().ok())
        .filter(|index| *index < step_count)
        .unwrap_or(0);

    Some((answers, step_index))
}
