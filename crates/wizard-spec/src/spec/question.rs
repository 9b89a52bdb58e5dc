use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Number, Value};

/// Supported input kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    Text,
    Radio,
    Select,
    Date,
    File,
}

impl QuestionType {
    /// Radio and select questions pick one of their declared options.
    pub fn has_options(&self) -> bool {
        matches!(self, QuestionType::Radio | QuestionType::Select)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Text => "text",
            QuestionType::Radio => "radio",
            QuestionType::Select => "select",
            QuestionType::Date => "date",
            QuestionType::File => "file",
        }
    }
}

/// Layout hint passed through to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    #[default]
    Default,
    Inline,
}

/// Visibility rule: the question is shown while `field` holds one of `values`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Conditional {
    pub field: String,
    #[serde(rename = "value", deserialize_with = "one_or_many")]
    #[schemars(with = "OneOrMany")]
    pub values: Vec<Value>,
}

impl Conditional {
    pub fn new<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// String forms of the accepted controller values.
    pub fn accepted(&self) -> impl Iterator<Item = String> + '_ {
        self.values.iter().filter_map(scalar_to_string)
    }
}

/// Definition of a single question inside a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct QuestionSpec {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default)]
    pub layout: Layout,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conditional: Option<Conditional>,
}

impl QuestionSpec {
    /// Minimal question of the given kind; the remaining fields take their defaults.
    pub fn new(id: impl Into<String>, label: impl Into<String>, kind: QuestionType) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            kind,
            options: None,
            layout: Layout::Default,
            required: false,
            placeholder: None,
            conditional: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = Some(options.into_iter().map(Into::into).collect());
        self
    }

    pub fn shown_when(mut self, conditional: Conditional) -> Self {
        self.conditional = Some(conditional);
        self
    }

    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or_default()
    }
}

/// Coerces a scalar JSON value to the string it would compare as.
pub(crate) fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Bool(flag) => Some(flag.to_string()),
        Value::Number(num) => Some(number_to_string(num)),
        other => Some(other.to_string()),
    }
}

/// Integral floats print without a fraction, so `1.0` compares as `"1"`.
pub(crate) fn number_to_string(num: &Number) -> String {
    match num.as_f64() {
        Some(float)
            if num.is_f64()
                && float.is_finite()
                && float.fract() == 0.0
                && float.abs() < i64::MAX as f64 =>
        {
            (float as i64).to_string()
        }
        _ => num.to_string(),
    }
}

/// Wire shape of a conditional `value`: one scalar or a list of them.
#[derive(Deserialize, JsonSchema)]
#[serde(untagged)]
enum OneOrMany {
    Many(Vec<Value>),
    One(Value),
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::Many(values) => values,
        OneOrMany::One(value) => vec![value],
    })
}
