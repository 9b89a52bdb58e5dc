use serde_json::{Map, Value, json};

use crate::answers::{AnswerStore, AnswerValue};
use crate::navigation::NavState;
use crate::spec::{FormConfig, Layout, QuestionType};
use crate::validate::{FieldErrors, StepGates, step_gates};
use crate::visibility::is_visible;

/// Describes a single question for render outputs.
#[derive(Debug, Clone)]
pub struct QuestionView {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub kind: QuestionType,
    pub options: Vec<String>,
    pub layout: Layout,
    pub required: bool,
    pub placeholder: Option<String>,
    pub visible: bool,
    pub value: Option<AnswerValue>,
    pub error: Option<String>,
}

/// One entry of the step navigation menu.
#[derive(Debug, Clone)]
pub struct MenuEntry {
    pub index: usize,
    pub title: String,
    pub icon: String,
    pub current: bool,
}

/// Unsaved-changes dialog state. `target` is `None` when the user asked to exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfirmationView {
    pub open: bool,
    pub target: Option<usize>,
}

/// Everything the presentation layer needs to draw the active step.
#[derive(Debug, Clone)]
pub struct StepView {
    pub form_title: String,
    pub step_index: usize,
    pub step_count: usize,
    pub step_id: String,
    pub title: String,
    pub icon: String,
    pub description: Option<String>,
    pub questions: Vec<QuestionView>,
    pub gates: StepGates,
    pub is_first: bool,
    pub is_last: bool,
    pub menu: Vec<MenuEntry>,
    pub confirmation: ConfirmationView,
}

impl StepView {
    pub fn visible_questions(&self) -> impl Iterator<Item = &QuestionView> {
        self.questions.iter().filter(|question| question.visible)
    }

    pub fn question(&self, id: &str) -> Option<&QuestionView> {
        self.questions.iter().find(|question| question.id == id)
    }
}

/// Build the view of `step_index`; `None` when the index is out of range.
pub fn build_step_view(
    form: &FormConfig,
    step_index: usize,
    answers: &AnswerStore,
    errors: &FieldErrors,
    state: NavState,
) -> Option<StepView> {
    let step = form.step(step_index)?;

    let questions = step
        .questions
        .iter()
        .map(|question| QuestionView {
            id: question.id.clone(),
            label: question.label.clone(),
            description: question.description.clone(),
            kind: question.kind,
            options: question.options().to_vec(),
            layout: question.layout,
            required: question.required,
            placeholder: question.placeholder.clone(),
            visible: is_visible(question, answers),
            value: answers.get(&question.id).cloned(),
            error: errors.get(&question.id).map(|error| error.message.clone()),
        })
        .collect::<Vec<_>>();

    let menu = form
        .steps
        .iter()
        .enumerate()
        .map(|(index, entry)| MenuEntry {
            index,
            title: entry.title.clone(),
            icon: entry.icon.clone(),
            current: index == step_index,
        })
        .collect::<Vec<_>>();

    let confirmation = match state {
        NavState::Active => ConfirmationView::default(),
        NavState::ConfirmPending { target } => ConfirmationView { open: true, target },
    };

    Some(StepView {
        form_title: form.title.clone(),
        step_index,
        step_count: form.step_count(),
        step_id: step.id.clone(),
        title: step.title.clone(),
        icon: step.icon.clone(),
        description: step.description.clone(),
        questions,
        gates: step_gates(step, answers),
        is_first: step_index == 0,
        is_last: step_index + 1 == form.step_count(),
        menu,
        confirmation,
    })
}

/// Render the view as a structured JSON-friendly value.
pub fn render_json_ui(view: &StepView) -> Value {
    let questions = view
        .questions
        .iter()
        .map(|question| {
            let mut map = Map::new();
            map.insert("id".into(), Value::String(question.id.clone()));
            map.insert("label".into(), Value::String(question.label.clone()));
            map.insert(
                "description".into(),
                question
                    .description
                    .clone()
                    .map(Value::String)
                    .unwrap_or(Value::Null),
            );
            map.insert("type".into(), Value::String(question.kind.as_str().into()));
            if !question.options.is_empty() {
                map.insert(
                    "options".into(),
                    Value::Array(
                        question
                            .options
                            .iter()
                            .map(|option| Value::String(option.clone()))
                            .collect(),
                    ),
                );
            }
            map.insert(
                "layout".into(),
                Value::String(layout_label(question.layout).into()),
            );
            map.insert("required".into(), Value::Bool(question.required));
            if let Some(placeholder) = &question.placeholder {
                map.insert("placeholder".into(), Value::String(placeholder.clone()));
            }
            map.insert("visible".into(), Value::Bool(question.visible));
            if let Some(value) = &question.value {
                map.insert("value".into(), value.to_json());
            }
            if let Some(error) = &question.error {
                map.insert("error".into(), Value::String(error.clone()));
            }
            Value::Object(map)
        })
        .collect::<Vec<_>>();

    let menu = view
        .menu
        .iter()
        .map(|entry| {
            json!({
                "index": entry.index,
                "title": entry.title,
                "icon": entry.icon,
                "current": entry.current,
            })
        })
        .collect::<Vec<_>>();

    json!({
        "form_title": view.form_title,
        "step": {
            "index": view.step_index,
            "count": view.step_count,
            "id": view.step_id,
            "title": view.title,
            "icon": view.icon,
            "description": view.description,
            "is_first": view.is_first,
            "is_last": view.is_last,
        },
        "gates": {
            "next_enabled": view.gates.next_enabled,
            "save_enabled": view.gates.save_enabled,
            "required_visible": view.gates.required_visible,
        },
        "confirmation": {
            "open": view.confirmation.open,
            "target": view.confirmation.target,
        },
        "menu": menu,
        "questions": questions,
    })
}

/// Render the view as human-friendly text. Hidden questions are left out.
pub fn render_text(view: &StepView) -> String {
    let mut lines = Vec::new();
    lines.push(view.form_title.clone());
    lines.push(format!(
        "Step {}/{}: {}",
        view.step_index + 1,
        view.step_count,
        view.title
    ));
    if let Some(description) = &view.description {
        lines.push(description.clone());
    }

    for (position, question) in view.visible_questions().enumerate() {
        let mut entry = format!(" {}. {} [{}]", position + 1, question.label, question.id);
        if question.required {
            entry.push_str(" *");
        }
        entry.push_str(&format!(" ({})", kind_hint(question)));
        if let Some(value) = &question.value {
            entry.push_str(&format!(" = {}", value_to_display(value)));
        } else if let Some(placeholder) = &question.placeholder {
            entry.push_str(&format!(" e.g. {}", placeholder));
        }
        lines.push(entry);
        if let Some(error) = &question.error {
            lines.push(format!("    ! {}", error));
        }
    }

    lines.push(format!(
        "Next: {} | Save: {}",
        enabled_label(view.gates.next_enabled),
        enabled_label(view.gates.save_enabled)
    ));

    let menu = view
        .menu
        .iter()
        .map(|entry| {
            if entry.current {
                format!("[{}] {} *", entry.index + 1, entry.title)
            } else {
                format!("[{}] {}", entry.index + 1, entry.title)
            }
        })
        .collect::<Vec<_>>();
    lines.push(format!("Steps: {}", menu.join("  ")));

    if view.confirmation.open {
        let destination = match view.confirmation.target {
            Some(target) => format!("go to step {}", target + 1),
            None => "exit".to_string(),
        };
        lines.push(format!(
            "This step is incomplete. Before you {}: save, discard or cancel?",
            destination
        ));
    }

    lines.join("\n")
}

fn kind_hint(question: &QuestionView) -> String {
    if question.options.is_empty() {
        question.kind.as_str().to_string()
    } else {
        format!("{}: {}", question.kind.as_str(), question.options.join("/"))
    }
}

fn layout_label(layout: Layout) -> &'static str {
    match layout {
        Layout::Default => "default",
        Layout::Inline => "inline",
    }
}

fn enabled_label(enabled: bool) -> &'static str {
    if enabled { "enabled" } else { "disabled" }
}

fn value_to_display(value: &AnswerValue) -> String {
    match value {
        AnswerValue::Empty => String::new(),
        AnswerValue::Text(text) => text.clone(),
        AnswerValue::File(file) => format!("<file {}>", file.name),
    }
}
