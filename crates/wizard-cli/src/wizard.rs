use std::fmt::Write;

use serde_json::Value;
use wizard_spec::{EditOutcome, NavOutcome, StepView, Submission, render_json_ui, render_text};

/// Controls which bits of state the shell prints.
#[derive(Copy, Clone, Eq, PartialEq)]
pub enum Verbosity {
    /// Clean output: the step view only.
    Clean,
    /// Verbose output: transition outcomes and gate details as well.
    Verbose,
}

impl Verbosity {
    pub fn from_verbose(verbose: bool) -> Self {
        if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Clean
        }
    }

    pub fn is_verbose(&self) -> bool {
        matches!(self, Verbosity::Verbose)
    }
}

/// Output format for step views.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ViewFormat {
    Text,
    Json,
}

/// Prints step views and outcomes for the interactive shell.
pub struct WizardPresenter {
    verbosity: Verbosity,
    format: ViewFormat,
    header_printed: bool,
    show_answers_json: bool,
}

impl WizardPresenter {
    pub fn new(verbosity: Verbosity, format: ViewFormat, show_answers_json: bool) -> Self {
        Self {
            verbosity,
            format,
            header_printed: false,
            show_answers_json,
        }
    }

    pub fn show_header(&mut self) {
        if self.header_printed || self.format == ViewFormat::Json {
            return;
        }
        println!(
            "Commands: <id>=<value>, next, prev, jump <n>, save, discard, cancel, submit, show, quit"
        );
        self.header_printed = true;
    }

    pub fn show_view(&self, view: &StepView) {
        match self.format {
            ViewFormat::Text => println!("{}", render_text(view)),
            ViewFormat::Json => println!("{}", render_json_ui(view)),
        }
        if self.verbosity.is_verbose() {
            println!(
                "Required on this step: {}",
                if view.gates.required_visible.is_empty() {
                    "-".to_string()
                } else {
                    view.gates.required_visible.join(", ")
                }
            );
        }
    }

    /// `confirming` tells why an edit was ignored: the dialog is open, or the
    /// question is not on the active step.
    pub fn show_edit(&self, question_id: &str, outcome: &EditOutcome, confirming: bool) {
        match outcome {
            EditOutcome::Applied => {
                if self.verbosity.is_verbose() {
                    println!("Updated {}", question_id);
                }
            }
            EditOutcome::Rejected(error) => {
                eprintln!("Invalid answer for {}: {}", question_id, error.message);
                if self.verbosity.is_verbose() {
                    eprintln!("  Code: {}", error.code);
                }
            }
            EditOutcome::Ignored if confirming => {
                eprintln!("Answer save, discard or cancel before editing '{}'.", question_id);
            }
            EditOutcome::Ignored => {
                eprintln!("'{}' is not a question on this step.", question_id);
            }
        }
    }

    pub fn show_outcome(&self, outcome: &NavOutcome) {
        match outcome {
            NavOutcome::Moved { to, .. } => {
                if self.verbosity.is_verbose() {
                    println!("Moved to step {}", to + 1);
                }
            }
            NavOutcome::Blocked { errors } => {
                eprintln!("{} required question(s) still need an answer.", errors);
            }
            NavOutcome::ConfirmationOpened { .. } => {
                println!("Unsaved changes: save, discard or cancel?");
            }
            NavOutcome::ConfirmationDismissed => {
                if self.verbosity.is_verbose() {
                    println!("Staying on this step.");
                }
            }
            NavOutcome::Exited => println!("Draft saved. See you later."),
            NavOutcome::Submitted(_) => {}
            NavOutcome::Ignored => eprintln!("That is not available right now."),
        }
    }

    pub fn show_parse_error(&self, error: &CommandParseError) {
        eprintln!("Invalid input: {}", error.user_message);
        if let Some(debug) = &error.debug_message {
            eprintln!("  Expected: {}", debug);
        }
    }

    pub fn show_completion(&self, submission: &Submission) {
        println!("Done ✅");
        match submission.to_cbor() {
            Ok(bytes) => {
                println!("Answers (CBOR hex): {}", encode_hex(&bytes));
            }
            Err(err) => {
                eprintln!("Failed to serialize answers to CBOR: {}", err);
            }
        }
        if self.show_answers_json {
            match submission.to_json_pretty() {
                Ok(pretty) => println!("{}", pretty),
                Err(err) => {
                    eprintln!("Failed to serialize answers to JSON: {}", err);
                }
            }
        }
    }
}

/// One line of shell input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Edit { question_id: String, raw: String },
    Next,
    Prev,
    Jump(usize),
    Save,
    Submit,
    Discard,
    Cancel,
    Show,
    Quit,
}

impl ShellCommand {
    pub fn parse(line: &str) -> Result<Self, CommandParseError> {
        let line = line.trim();
        if let Some((question_id, raw)) = line.split_once('=') {
            let question_id = question_id.trim();
            if question_id.is_empty() {
                return Err(CommandParseError::new(
                    line,
                    Some("<question_id>=<value>".into()),
                ));
            }
            return Ok(ShellCommand::Edit {
                question_id: question_id.to_string(),
                raw: raw.to_string(),
            });
        }

        let mut words = line.split_whitespace();
        let command = match (words.next(), words.next()) {
            (Some("next"), None) => ShellCommand::Next,
            (Some("prev"), None) => ShellCommand::Prev,
            (Some("jump"), Some(step)) => {
                let step = step.parse::<usize>().ok().filter(|step| *step > 0).ok_or_else(
                    || CommandParseError::new(line, Some("jump <step number, from 1>".into())),
                )?;
                ShellCommand::Jump(step - 1)
            }
            (Some("save"), None) => ShellCommand::Save,
            (Some("submit"), None) => ShellCommand::Submit,
            (Some("discard"), None) => ShellCommand::Discard,
            (Some("cancel"), None) => ShellCommand::Cancel,
            (Some("show"), None) => ShellCommand::Show,
            (Some("quit" | "exit"), None) => ShellCommand::Quit,
            _ => return Err(CommandParseError::new(line, None)),
        };
        if words.next().is_some() {
            return Err(CommandParseError::new(line, None));
        }
        Ok(command)
    }
}

/// Error produced when a shell line cannot be understood.
#[derive(Debug)]
pub struct CommandParseError {
    pub user_message: String,
    pub debug_message: Option<String>,
}

impl CommandParseError {
    pub fn new(user_message: impl Into<String>, debug_message: Option<String>) -> Self {
        Self {
            user_message: user_message.into(),
            debug_message,
        }
    }
}

/// Pretty-prints a JSON value for non-interactive commands.
pub fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => println!("{}", pretty),
        Err(_) => println!("{}", value),
    }
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut encoded = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        write!(&mut encoded, "{:02x}", byte).expect("writing to string cannot fail");
    }
    encoded
}
