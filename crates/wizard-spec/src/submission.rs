use serde_json::{Value, json};

use crate::answers::AnswerStore;

/// Snapshot handed to the submission collaborator after a successful submit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub form_title: String,
    pub step_count: usize,
    pub answers: AnswerStore,
}

impl Submission {
    pub fn to_json(&self) -> Value {
        json!({
            "form_title": self.form_title,
            "step_count": self.step_count,
            "answers": self.answers.to_json(),
        })
    }

    /// Serializes the snapshot as CBOR bytes.
    pub fn to_cbor(&self) -> Result<Vec<u8>, serde_cbor::Error> {
        serde_cbor::to_vec(&self.to_json())
    }

    /// Serializes the snapshot as indented JSON for debugging.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.to_json())
    }
}
