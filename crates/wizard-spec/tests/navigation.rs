use std::io;

use wizard_spec::{
    AnswerStore, AnswerValue, DraftStore, EditOutcome, FileRef, FormConfig, KeyValueBackend,
    MemoryBackend, NavOutcome, NavState, PersistenceError, ScopedDraft, SpecError,
    WizardController,
};

type MemoryDraft = ScopedDraft<MemoryBackend>;

fn fixture(name: &str) -> &'static str {
    match name {
        "health_survey" => include_str!("../tests/fixtures/health_survey.json"),
        _ => panic!("unknown fixture {}", name),
    }
}

fn survey() -> FormConfig {
    FormConfig::from_json(fixture("health_survey")).expect("deserialize")
}

fn fresh_draft() -> MemoryDraft {
    ScopedDraft::new(MemoryBackend::new(), "survey")
}

fn start(draft: MemoryDraft) -> WizardController<MemoryDraft> {
    WizardController::start(survey(), draft, AnswerStore::new()).expect("controller")
}

fn text(value: &str) -> AnswerValue {
    AnswerValue::text(value)
}

/// Controller parked on the last step with every earlier step answered.
fn on_last_step() -> WizardController<MemoryDraft> {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("0-2"));
    assert!(matches!(wizard.request_next(), NavOutcome::Moved { .. }));
    wizard.edit("smoker", text("no"));
    assert!(matches!(wizard.request_next(), NavOutcome::Moved { .. }));
    assert!(wizard.is_last_step());
    wizard
}

/// Backend whose writes always fail.
struct ReadOnlyBackend;

impl KeyValueBackend for ReadOnlyBackend {
    fn get(&self, _key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(None)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), PersistenceError> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
    }

    fn remove(&mut self, _key: &str) -> Result<(), PersistenceError> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
    }
}

/// Backend over a memory map whose reads fail for keys ending in `failing`.
struct FailingReads {
    inner: MemoryBackend,
    failing: &'static str,
}

impl KeyValueBackend for FailingReads {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        if key.ends_with(self.failing) {
            return Err(PersistenceError::Corrupt("drafts.json".into()));
        }
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.inner.remove(key)
    }
}

fn draft_failing_on(failing: &'static str) -> ScopedDraft<FailingReads> {
    let mut inner = MemoryBackend::new();
    inner
        .set("wizard:survey:answers", r#"{"hours":"0-2","smoker":"no"}"#)
        .expect("seed");
    inner.set("wizard:survey:step", "2").expect("seed");
    ScopedDraft::new(FailingReads { inner, failing }, "survey")
}

#[test]
fn start_requires_at_least_one_step() {
    let form = FormConfig {
        title: "Empty".into(),
        steps: vec![],
    };
    let result = WizardController::start(form, fresh_draft(), AnswerStore::new());
    assert!(matches!(result, Err(SpecError::NoSteps(_))));
}

#[test]
fn start_uses_the_initial_seed_without_a_draft() {
    let mut seed = AnswerStore::new();
    seed.set("hours", text("3-5"));
    let wizard = WizardController::start(survey(), fresh_draft(), seed).expect("controller");
    assert_eq!(wizard.step_index(), 0);
    assert_eq!(wizard.answers().get("hours"), Some(&text("3-5")));
    assert!(wizard.gates().next_enabled);
}

#[test]
fn request_next_blocks_and_reports_each_missing_question() {
    let mut wizard = start(fresh_draft());
    assert_eq!(wizard.request_next(), NavOutcome::Blocked { errors: 1 });
    assert_eq!(wizard.step_index(), 0);
    assert_eq!(wizard.field_errors().len(), 1);
    assert!(wizard.field_errors().contains_key("hours"));
}

#[test]
fn request_next_advances_and_clears_errors() {
    let mut wizard = start(fresh_draft());
    wizard.request_next();
    assert_eq!(wizard.edit("hours", text("6+")), EditOutcome::Applied);
    assert!(wizard.field_errors().is_empty());

    assert_eq!(wizard.request_next(), NavOutcome::Moved { from: 0, to: 1 });
    assert_eq!(wizard.step_index(), 1);
    assert!(wizard.field_errors().is_empty());
    assert_eq!(
        wizard.store().read_step_index().expect("read").as_deref(),
        Some("1")
    );
}

#[test]
fn same_step_controller_edits_toggle_visibility_immediately() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("6+"));
    let view = wizard.view();
    assert!(view.question("detail").expect("detail").visible);

    wizard.edit("hours", text("0-2"));
    let view = wizard.view();
    assert!(!view.question("detail").expect("detail").visible);
    assert!(view.gates.next_enabled);
}

#[test]
fn hiding_a_blocker_drops_its_error_and_unblocks_next() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("0-2"));
    wizard.request_next();
    wizard.edit("smoker", text("yes"));
    assert_eq!(wizard.request_next(), NavOutcome::Blocked { errors: 1 });
    assert!(wizard.field_errors().contains_key("packs"));

    wizard.edit("smoker", text("no"));
    assert!(wizard.field_errors().is_empty());
    assert!(wizard.gates().next_enabled);
    assert_eq!(wizard.request_next(), NavOutcome::Moved { from: 1, to: 2 });
}

#[test]
fn request_prev_never_validates() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("0-2"));
    wizard.request_next();

    assert_eq!(wizard.request_prev(), NavOutcome::Moved { from: 1, to: 0 });
    assert!(wizard.field_errors().is_empty());
    assert!(!wizard.confirmation_open());
}

#[test]
fn request_prev_on_first_step_is_ignored() {
    let mut wizard = start(fresh_draft());
    assert_eq!(wizard.request_prev(), NavOutcome::Ignored);
    assert_eq!(wizard.step_index(), 0);
}

#[test]
fn request_jump_on_a_valid_step_moves_directly() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("3-5"));
    assert_eq!(wizard.request_jump(2), NavOutcome::Moved { from: 0, to: 2 });
    assert_eq!(wizard.state(), NavState::Active);
}

#[test]
fn request_jump_out_of_range_is_ignored() {
    let mut wizard = start(fresh_draft());
    assert_eq!(wizard.request_jump(7), NavOutcome::Ignored);
    assert_eq!(wizard.request_jump(0), NavOutcome::Ignored);
    assert!(wizard.field_errors().is_empty());
}

#[test]
fn request_jump_on_an_invalid_step_opens_confirmation() {
    let mut wizard = start(fresh_draft());
    assert_eq!(
        wizard.request_jump(2),
        NavOutcome::ConfirmationOpened { target: Some(2) }
    );
    assert!(wizard.confirmation_open());
    assert_eq!(wizard.pending_target(), Some(2));
    assert_eq!(wizard.step_index(), 0);
    assert!(wizard.view().confirmation.open);

    assert_eq!(wizard.request_next(), NavOutcome::Ignored);
    assert_eq!(wizard.edit("hours", text("0-2")), EditOutcome::Ignored);
}

#[test]
fn dismiss_returns_to_the_same_step() {
    let mut wizard = start(fresh_draft());
    wizard.request_jump(1);
    assert_eq!(
        wizard.dismiss_confirmation(),
        NavOutcome::ConfirmationDismissed
    );
    assert_eq!(wizard.state(), NavState::Active);
    assert_eq!(wizard.pending_target(), None);
    assert_eq!(wizard.step_index(), 0);
    assert_eq!(wizard.dismiss_confirmation(), NavOutcome::Ignored);
}

#[test]
fn proceed_without_saving_discards_edits_from_the_current_step() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("0-2"));
    wizard.request_next();

    wizard.edit("smoker", text("yes"));
    assert_eq!(
        wizard.request_jump(2),
        NavOutcome::ConfirmationOpened { target: Some(2) }
    );
    assert_eq!(
        wizard.confirm_proceed_without_saving(),
        NavOutcome::Moved { from: 1, to: 2 }
    );

    assert!(wizard.answers().get("smoker").is_none());
    assert_eq!(wizard.answers().get("hours"), Some(&text("0-2")));
    let persisted = wizard.store().read_answers().expect("read").expect("draft");
    let persisted = AnswerStore::deserialize(&persisted).expect("decode");
    assert_eq!(&persisted, wizard.answers());
}

#[test]
fn save_and_proceed_keeps_edits_and_follows_the_target() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("6+"));
    wizard.request_next();
    wizard.edit("smoker", text("yes"));
    wizard.request_jump(0);

    assert_eq!(
        wizard.confirm_save_and_proceed(),
        NavOutcome::Moved { from: 1, to: 0 }
    );
    assert_eq!(wizard.answers().get("smoker"), Some(&text("yes")));
    let persisted = wizard.store().read_answers().expect("read").expect("draft");
    assert!(persisted.contains("\"smoker\":\"yes\""));
}

#[test]
fn save_and_exit_with_every_visible_answer_exits() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("0-2"));
    assert_eq!(wizard.request_save_and_exit(), NavOutcome::Exited);
    assert_eq!(
        wizard.store().read_step_index().expect("read").as_deref(),
        Some("0")
    );
}

#[test]
fn save_and_exit_with_open_questions_asks_first() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("6+"));
    assert_eq!(
        wizard.request_save_and_exit(),
        NavOutcome::ConfirmationOpened { target: None }
    );
    assert_eq!(wizard.pending_target(), None);
    assert!(wizard.confirmation_open());

    assert_eq!(wizard.confirm_save_and_proceed(), NavOutcome::Exited);
    assert_eq!(wizard.state(), NavState::Active);
    assert_eq!(wizard.step_index(), 0);
}

#[test]
fn exit_without_saving_rolls_back_to_the_checkpoint() {
    let mut seed = AnswerStore::new();
    seed.set("hours", text("3-5"));
    let mut wizard = WizardController::start(survey(), fresh_draft(), seed).expect("controller");
    wizard.edit("hours", text("6+"));
    wizard.request_save_and_exit();

    assert_eq!(wizard.confirm_proceed_without_saving(), NavOutcome::Exited);
    assert_eq!(wizard.answers().get("hours"), Some(&text("3-5")));
}

#[test]
fn submit_is_only_available_on_the_last_step() {
    let mut wizard = start(fresh_draft());
    assert_eq!(wizard.submit(), NavOutcome::Ignored);
    let mut wizard = on_last_step();
    assert_eq!(wizard.request_next(), NavOutcome::Ignored);
    assert_eq!(wizard.submit(), NavOutcome::Blocked { errors: 1 });
    assert!(wizard.field_errors().contains_key("consent"));
    assert!(wizard.store().read_answers().expect("read").is_some());
}

#[test]
fn submit_clears_the_draft_and_resets() {
    let mut wizard = on_last_step();
    wizard.edit("report", AnswerValue::File(FileRef::named("labs.pdf")));
    wizard.edit("consent", text("yes"));

    let NavOutcome::Submitted(submission) = wizard.submit() else {
        panic!("expected submission");
    };
    assert_eq!(submission.form_title, "Health Check-in");
    assert_eq!(submission.answers.get("consent"), Some(&text("yes")));
    assert_eq!(submission.to_json()["answers"]["report"]["name"], "labs.pdf");
    assert!(!submission.to_cbor().expect("cbor").is_empty());

    assert_eq!(wizard.step_index(), 0);
    assert!(wizard.answers().is_empty());
    assert!(wizard.store().read_answers().expect("read").is_none());
    assert!(wizard.store().read_step_index().expect("read").is_none());
}

#[test]
fn rejected_edits_leave_answers_untouched() {
    let mut wizard = start(fresh_draft());
    let outcome = wizard.edit("hours", text("lots"));
    assert!(matches!(outcome, EditOutcome::Rejected(ref error) if error.code == "invalid_option"));
    assert!(wizard.answers().get("hours").is_none());
    assert!(wizard.field_errors().contains_key("hours"));
    assert_eq!(wizard.edit("smoker", text("no")), EditOutcome::Ignored);
}

#[test]
fn resumes_answers_and_step_from_the_draft() {
    let mut wizard = start(fresh_draft());
    wizard.edit("hours", text("6+"));
    wizard.edit("detail", text("  marathon \r"));
    wizard.request_next();
    let draft = wizard.into_store();

    let resumed = start(draft);
    assert_eq!(resumed.step_index(), 1);
    assert_eq!(resumed.answers().get("detail"), Some(&text("marathon")));
}

#[test]
fn malformed_drafts_start_a_new_session() {
    let mut draft = fresh_draft();
    draft.write_answers("{broken").expect("write");
    draft.write_step_index("2").expect("write");

    let mut seed = AnswerStore::new();
    seed.set("hours", text("3-5"));
    let wizard = WizardController::start(survey(), draft, seed).expect("controller");
    assert_eq!(wizard.step_index(), 0);
    assert_eq!(wizard.answers().get("hours"), Some(&text("3-5")));
}

#[test]
fn out_of_range_step_index_falls_back_to_first_step() {
    let mut draft = fresh_draft();
    draft.write_answers(r#"{"hours":"0-2"}"#).expect("write");
    draft.write_step_index("42").expect("write");

    let wizard = start(draft);
    assert_eq!(wizard.step_index(), 0);
    assert_eq!(wizard.answers().get("hours"), Some(&text("0-2")));
}

#[test]
fn write_failures_do_not_stop_the_session() {
    let draft = ScopedDraft::new(ReadOnlyBackend, "survey");
    let mut wizard =
        WizardController::start(survey(), draft, AnswerStore::new()).expect("controller");
    assert_eq!(wizard.edit("hours", text("0-2")), EditOutcome::Applied);
    assert_eq!(wizard.request_next(), NavOutcome::Moved { from: 0, to: 1 });
    assert_eq!(wizard.answers().get("hours"), Some(&text("0-2")));
}

#[test]
fn unreadable_answers_start_from_the_seed() {
    let mut seed = AnswerStore::new();
    seed.set("hours", text("3-5"));
    let wizard = WizardController::start(survey(), draft_failing_on(":answers"), seed)
        .expect("controller");
    assert_eq!(wizard.step_index(), 0);
    assert_eq!(wizard.answers().get("hours"), Some(&text("3-5")));
    assert_eq!(wizard.answers().get("smoker"), None);
}

#[test]
fn unreadable_step_keeps_answers_on_the_first_step() {
    let mut seed = AnswerStore::new();
    seed.set("hours", text("3-5"));
    let wizard = WizardController::start(survey(), draft_failing_on(":step"), seed)
        .expect("controller");
    assert_eq!(wizard.step_index(), 0);
    assert_eq!(wizard.answers().get("hours"), Some(&text("0-2")));
    assert_eq!(wizard.answers().get("smoker"), Some(&text("no")));
}
