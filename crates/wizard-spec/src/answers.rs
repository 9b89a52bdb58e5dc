use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::spec::question::number_to_string;

/// Handle to a file picked during the session. Never written to drafts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl FileRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            media_type: None,
        }
    }
}

/// A single answer as reported by the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerValue {
    Empty,
    Text(String),
    File(FileRef),
}

impl AnswerValue {
    pub fn text(value: impl Into<String>) -> Self {
        AnswerValue::Text(value.into())
    }

    /// Absent, blank text and `Empty` all count as unanswered.
    pub fn is_empty(&self) -> bool {
        match self {
            AnswerValue::Empty => true,
            AnswerValue::Text(text) => text.trim().is_empty(),
            AnswerValue::File(_) => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            AnswerValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// String form used when this answer controls another question's visibility.
    pub fn coerce_string(&self) -> Option<String> {
        match self {
            AnswerValue::Empty => None,
            AnswerValue::Text(text) => Some(text.clone()),
            AnswerValue::File(file) => Some(file.name.clone()),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            AnswerValue::Empty => Value::Null,
            AnswerValue::Text(text) => Value::String(text.clone()),
            AnswerValue::File(file) => {
                let mut map = Map::new();
                map.insert("name".into(), Value::String(file.name.clone()));
                if let Some(size) = file.size {
                    map.insert("size".into(), json!(size));
                }
                if let Some(media_type) = &file.media_type {
                    map.insert("media_type".into(), Value::String(media_type.clone()));
                }
                Value::Object(map)
            }
        }
    }

    fn normalized(self) -> Self {
        match self {
            AnswerValue::Text(text) => AnswerValue::Text(text.trim().to_string()),
            other => other,
        }
    }
}

/// Emptiness predicate over an optional answer.
pub fn is_empty(value: Option<&AnswerValue>) -> bool {
    value.is_none_or(AnswerValue::is_empty)
}

/// Errors raised while decoding a serialized answer store.
#[derive(Debug, Error)]
pub enum AnswerDecodeError {
    #[error("answers are not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("answers must be a JSON object keyed by question id")]
    NotAnObject,
    #[error("answer '{0}' has an unsupported value")]
    UnsupportedValue(String),
}

/// Current answers keyed by question id. A missing key means unanswered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnswerStore {
    values: BTreeMap<String, AnswerValue>,
}

impl AnswerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&AnswerValue> {
        self.values.get(id)
    }

    /// Stores `value` under `id`; text is trimmed and `Empty` removes the entry.
    pub fn set(&mut self, id: impl Into<String>, value: AnswerValue) {
        let id = id.into();
        match value.normalized() {
            AnswerValue::Empty => {
                self.values.remove(&id);
            }
            value => {
                self.values.insert(id, value);
            }
        }
    }

    pub fn remove(&mut self, id: &str) -> Option<AnswerValue> {
        self.values.remove(id)
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnswerValue)> {
        self.values.iter().map(|(id, value)| (id.as_str(), value))
    }

    /// Draft encoding: a JSON object of text answers. File handles are left out.
    pub fn serialize(&self) -> String {
        let map = self
            .values
            .iter()
            .filter_map(|(id, value)| {
                value
                    .as_text()
                    .map(|text| (id.clone(), Value::String(text.to_string())))
            })
            .collect::<Map<_, _>>();
        Value::Object(map).to_string()
    }

    pub fn deserialize(raw: &str) -> Result<Self, AnswerDecodeError> {
        let value: Value = serde_json::from_str(raw)?;
        Self::from_json(&value)
    }

    /// Builds a store from a JSON object, e.g. an initial-data seed.
    ///
    /// Strings are taken as text, booleans and numbers are coerced to text,
    /// `null` and empty arrays are skipped and objects must describe a file.
    pub fn from_json(value: &Value) -> Result<Self, AnswerDecodeError> {
        let object = value.as_object().ok_or(AnswerDecodeError::NotAnObject)?;
        let mut store = Self::new();
        for (id, entry) in object {
            let answer = match entry {
                Value::Null => continue,
                Value::String(text) => AnswerValue::Text(text.clone()),
                Value::Bool(flag) => AnswerValue::Text(flag.to_string()),
                Value::Number(num) => AnswerValue::Text(number_to_string(num)),
                Value::Array(items) if items.is_empty() => continue,
                Value::Object(_) => serde_json::from_value::<FileRef>(entry.clone())
                    .map(AnswerValue::File)
                    .map_err(|_| AnswerDecodeError::UnsupportedValue(id.clone()))?,
                Value::Array(_) => return Err(AnswerDecodeError::UnsupportedValue(id.clone())),
            };
            store.set(id.clone(), answer);
        }
        Ok(store)
    }

    /// Full snapshot including file handles.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(id, value)| (id.clone(), value.to_json()))
                .collect(),
        )
    }
}
