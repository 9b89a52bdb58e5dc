mod wizard;

use clap::{Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use std::env;
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use wizard::{CommandParseError, ShellCommand, Verbosity, ViewFormat, WizardPresenter, print_json};
use wizard_spec::{
    AnswerStore, AnswerValue, DraftStore, FieldErrors, FileBackend, FileRef, FormConfig,
    NavOutcome, NavState, QuestionType, ScopedDraft, SpecIssue, WizardController, build_step_view,
    form_schema, render_json_ui, render_text,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

const STATE_DIR_ENV: &str = "WIZARD_STATE_DIR";
const LOG_ENV: &str = "WIZARD_LOG";
const DRAFT_FILE: &str = "wizard-drafts.json";

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Step-by-step questionnaire shell",
    long_about = "Runs questionnaire wizards with resumable drafts and offers form checking and rendering helpers"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

impl From<RenderMode> for ViewFormat {
    fn from(mode: RenderMode) -> Self {
        match mode {
            RenderMode::Text => ViewFormat::Text,
            RenderMode::Json => ViewFormat::Json,
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Run a wizard interactively, resuming a saved draft when one exists.
    Run {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Optional JSON file with answers to start from when there is no draft.
        #[arg(long, value_name = "ANSWERS")]
        initial: Option<PathBuf>,
        /// Directory holding drafts (defaults to WIZARD_STATE_DIR or the current directory).
        #[arg(long, value_name = "DIR")]
        state_dir: Option<PathBuf>,
        /// Draft namespace (defaults to a slug of the form title).
        #[arg(long, value_name = "ID")]
        instance: Option<String>,
        /// Output format for step views.
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
        /// Show verbose output (outcomes, gates, debug logs).
        #[arg(long, alias = "debug")]
        verbose: bool,
        /// Also print the submitted answers as JSON.
        #[arg(long)]
        answers_json: bool,
    },
    /// Check a form definition for structural problems.
    Check {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
    },
    /// Print the JSON Schema of form definitions.
    Schema,
    /// Render one step of a form without starting a session.
    Render {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        /// Optional JSON file with answers.
        #[arg(long, value_name = "ANSWERS")]
        answers: Option<PathBuf>,
        /// Step number, starting at 1.
        #[arg(long, default_value_t = 1)]
        step: usize,
        #[arg(long, value_enum, default_value_t = RenderMode::Json)]
        format: RenderMode,
    },
    /// Remove the saved draft of a form.
    Reset {
        /// Path to the form definition JSON.
        #[arg(long, value_name = "FORM")]
        form: PathBuf,
        #[arg(long, value_name = "DIR")]
        state_dir: Option<PathBuf>,
        #[arg(long, value_name = "ID")]
        instance: Option<String>,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    let verbose = matches!(cli.command, Command::Run { verbose: true, .. });
    init_tracing(verbose);

    match cli.command {
        Command::Run {
            form,
            initial,
            state_dir,
            instance,
            format,
            verbose,
            answers_json,
        } => run_wizard(
            form,
            initial,
            state_dir,
            instance,
            format,
            verbose,
            answers_json,
        ),
        Command::Check { form } => run_check(form),
        Command::Schema => {
            print_json(&form_schema());
            Ok(())
        }
        Command::Render {
            form,
            answers,
            step,
            format,
        } => run_render(form, answers, step, format),
        Command::Reset {
            form,
            state_dir,
            instance,
        } => run_reset(form, state_dir, instance),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn run_wizard(
    form_path: PathBuf,
    initial_path: Option<PathBuf>,
    state_dir: Option<PathBuf>,
    instance: Option<String>,
    format: RenderMode,
    verbose: bool,
    answers_json: bool,
) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let issues = form.check();
    if !issues.is_empty() {
        print_issues(&issues);
        return Err(format!("form '{}' has {} problem(s)", form_path.display(), issues.len()).into());
    }

    let initial = match initial_path {
        Some(path) => load_answers(&path)?,
        None => AnswerStore::new(),
    };
    let draft = open_draft(&form, state_dir, instance);
    info!(path = %draft.backend().path().display(), "using draft storage");

    let mut controller = WizardController::start(form, draft, initial)?;
    let mut presenter = WizardPresenter::new(
        Verbosity::from_verbose(verbose),
        format.into(),
        answers_json,
    );
    presenter.show_header();
    presenter.show_view(&controller.view());

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let command = match ShellCommand::parse(&line) {
            Ok(command) => command,
            Err(err) => {
                presenter.show_parse_error(&err);
                continue;
            }
        };
        debug!(?command, "shell command");

        let outcome = match command {
            ShellCommand::Edit { question_id, raw } => {
                let value = match answer_for(&controller, &question_id, &raw) {
                    Ok(value) => value,
                    Err(err) => {
                        presenter.show_parse_error(&err);
                        continue;
                    }
                };
                let outcome = controller.edit(&question_id, value);
                presenter.show_edit(&question_id, &outcome, controller.confirmation_open());
                presenter.show_view(&controller.view());
                continue;
            }
            ShellCommand::Show => {
                presenter.show_view(&controller.view());
                continue;
            }
            ShellCommand::Quit => break,
            ShellCommand::Next => controller.request_next(),
            ShellCommand::Prev => controller.request_prev(),
            ShellCommand::Jump(target) => controller.request_jump(target),
            ShellCommand::Submit => controller.submit(),
            ShellCommand::Save if controller.confirmation_open() => {
                controller.confirm_save_and_proceed()
            }
            ShellCommand::Save => controller.request_save_and_exit(),
            ShellCommand::Discard => controller.confirm_proceed_without_saving(),
            ShellCommand::Cancel => controller.dismiss_confirmation(),
        };

        presenter.show_outcome(&outcome);
        match outcome {
            NavOutcome::Exited => break,
            NavOutcome::Submitted(submission) => {
                presenter.show_completion(&submission);
                break;
            }
            _ => presenter.show_view(&controller.view()),
        }
    }

    Ok(())
}

/// Turns raw shell input into an answer for `question_id` on the active step.
/// On file questions `@path` attaches the named file.
fn answer_for<S: DraftStore>(
    controller: &WizardController<S>,
    question_id: &str,
    raw: &str,
) -> Result<AnswerValue, CommandParseError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(AnswerValue::Empty);
    }
    let is_file = controller
        .current_step()
        .question(question_id)
        .is_some_and(|question| question.kind == QuestionType::File);
    match raw.strip_prefix('@') {
        Some(path) if is_file => file_ref_for(Path::new(path.trim())).map(AnswerValue::File),
        _ => Ok(AnswerValue::text(raw)),
    }
}

fn file_ref_for(path: &Path) -> Result<FileRef, CommandParseError> {
    let metadata = fs::metadata(path).map_err(|err| {
        CommandParseError::new(
            format!("cannot attach '{}'", path.display()),
            Some(err.to_string()),
        )
    })?;
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(FileRef {
        name,
        size: Some(metadata.len()),
        media_type: None,
    })
}

fn run_check(form_path: PathBuf) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let issues = form.check();
    if issues.is_empty() {
        let questions = form.questions().count();
        println!(
            "Form '{}' is valid ({} steps, {} questions).",
            form.title,
            form.step_count(),
            questions
        );
        Ok(())
    } else {
        print_issues(&issues);
        Err(format!("form '{}' has {} problem(s)", form_path.display(), issues.len()).into())
    }
}

fn run_render(
    form_path: PathBuf,
    answers_path: Option<PathBuf>,
    step: usize,
    format: RenderMode,
) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let answers = match answers_path {
        Some(path) => load_answers(&path)?,
        None => AnswerStore::new(),
    };
    let view = step
        .checked_sub(1)
        .and_then(|index| {
            build_step_view(&form, index, &answers, &FieldErrors::new(), NavState::Active)
        })
        .ok_or_else(|| format!("step {} is out of range (1-{})", step, form.step_count()))?;
    match format {
        RenderMode::Json => print_json(&render_json_ui(&view)),
        RenderMode::Text => println!("{}", render_text(&view)),
    }
    Ok(())
}

fn run_reset(
    form_path: PathBuf,
    state_dir: Option<PathBuf>,
    instance: Option<String>,
) -> CliResult<()> {
    let form = load_form(&form_path)?;
    let mut draft = open_draft(&form, state_dir, instance);
    draft.clear_answers()?;
    draft.clear_step_index()?;
    println!("Draft for '{}' removed.", form.title);
    Ok(())
}

fn load_form(path: &Path) -> CliResult<FormConfig> {
    let raw = fs::read_to_string(path)?;
    Ok(FormConfig::from_json(&raw)?)
}

fn load_answers(path: &Path) -> CliResult<AnswerStore> {
    let contents = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&contents)?;
    Ok(AnswerStore::from_json(&value)?)
}

fn open_draft(
    form: &FormConfig,
    state_dir: Option<PathBuf>,
    instance: Option<String>,
) -> ScopedDraft<FileBackend> {
    let root = resolve_state_dir(state_dir);
    let instance = instance.unwrap_or_else(|| form.slug());
    ScopedDraft::new(FileBackend::new(root.join(DRAFT_FILE)), &instance)
}

fn resolve_state_dir(dir: Option<PathBuf>) -> PathBuf {
    dir.or_else(|| env::var_os(STATE_DIR_ENV).map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn print_issues(issues: &[SpecIssue]) {
    let report = json!({
        "valid": false,
        "issues": issues.iter().map(ToString::to_string).collect::<Vec<_>>(),
    });
    print_json(&report);
}
