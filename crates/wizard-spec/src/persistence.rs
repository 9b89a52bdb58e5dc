use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised by persistence backends.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("draft storage i/o failed: {0}")]
    Io(#[from] io::Error),
    #[error("draft storage json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("draft storage at '{0}' is not a key/value document")]
    Corrupt(PathBuf),
}

/// Minimal string key/value capability the drafts are stored in.
pub trait KeyValueBackend {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError>;
    fn remove(&mut self, key: &str) -> Result<(), PersistenceError>;
}

/// Draft persistence consumed by the navigation controller.
pub trait DraftStore {
    fn read_answers(&self) -> Result<Option<String>, PersistenceError>;
    fn write_answers(&mut self, answers: &str) -> Result<(), PersistenceError>;
    fn clear_answers(&mut self) -> Result<(), PersistenceError>;
    fn read_step_index(&self) -> Result<Option<String>, PersistenceError>;
    fn write_step_index(&mut self, index: &str) -> Result<(), PersistenceError>;
    fn clear_step_index(&mut self) -> Result<(), PersistenceError>;
}

/// In-process backend, mostly for tests and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &BTreeMap<String, String> {
        &self.entries
    }
}

impl KeyValueBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Stores every key in one JSON object on disk. Writes replace the file through
/// a sibling temp file so a crash never leaves half a document behind.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<Map<String, Value>, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        match serde_json::from_str(&raw)? {
            Value::Object(map) => Ok(map),
            _ => Err(PersistenceError::Corrupt(self.path.clone())),
        }
    }

    fn store(&self, map: Map<String, Value>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&Value::Object(map))?;
        let staging = self.path.with_extension("tmp");
        fs::write(&staging, contents)?;
        fs::rename(&staging, &self.path)?;
        Ok(())
    }
}

impl KeyValueBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>, PersistenceError> {
        let map = self.load()?;
        match map.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.clone())),
            Some(_) => Err(PersistenceError::Corrupt(self.path.clone())),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), PersistenceError> {
        let mut map = self.load()?;
        map.insert(key.to_string(), Value::String(value.to_string()));
        self.store(map)
    }

    fn remove(&mut self, key: &str) -> Result<(), PersistenceError> {
        let mut map = self.load()?;
        if map.remove(key).is_some() {
            self.store(map)?;
        }
        Ok(())
    }
}

/// Draft store that keeps one wizard instance's keys apart from anything else
/// sharing the backend.
#[derive(Debug, Clone)]
pub struct ScopedDraft<B> {
    backend: B,
    answers_key: String,
    step_key: String,
}

impl<B: KeyValueBackend> ScopedDraft<B> {
    pub fn new(backend: B, instance: &str) -> Self {
        Self {
            backend,
            answers_key: format!("wizard:{instance}:answers"),
            step_key: format!("wizard:{instance}:step"),
        }
    }

    pub fn answers_key(&self) -> &str {
        &self.answers_key
    }

    pub fn step_key(&self) -> &str {
        &self.step_key
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }
}

impl<B: KeyValueBackend> DraftStore for ScopedDraft<B> {
    fn read_answers(&self) -> Result<Option<String>, PersistenceError> {
        self.backend.get(&self.answers_key)
    }

    fn write_answers(&mut self, answers: &str) -> Result<(), PersistenceError> {
        self.backend.set(&self.answers_key, answers)
    }

    fn clear_answers(&mut self) -> Result<(), PersistenceError> {
        self.backend.remove(&self.answers_key)
    }

    fn read_step_index(&self) -> Result<Option<String>, PersistenceError> {
        self.backend.get(&self.step_key)
    }

    fn write_step_index(&mut self, index: &str) -> Result<(), PersistenceError> {
        self.backend.set(&self.step_key, index)
    }

    fn clear_step_index(&mut self) -> Result<(), PersistenceError> {
        self.backend.remove(&self.step_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_keys_do_not_collide() {
        let mut first = ScopedDraft::new(MemoryBackend::new(), "intake");
        first.write_answers("{}").expect("write");
        first.backend_mut().set("unrelated", "keep").expect("set");

        let mut backend = first.into_backend();
        let mut second = ScopedDraft::new(backend.clone(), "followup");
        assert!(second.read_answers().expect("read").is_none());
        second.write_step_index("2").expect("write");
        backend = second.into_backend();

        assert_eq!(
            backend.entries().get("wizard:intake:answers").map(String::as_str),
            Some("{}")
        );
        assert_eq!(
            backend.entries().get("wizard:followup:step").map(String::as_str),
            Some("2")
        );
        assert_eq!(
            backend.entries().get("unrelated").map(String::as_str),
            Some("keep")
        );
    }

    #[test]
    fn file_backend_roundtrips_and_removes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut backend = FileBackend::new(dir.path().join("nested").join("drafts.json"));
        assert!(backend.get("k").expect("get").is_none());

        backend.set("k", "v").expect("set");
        backend.set("other", "w").expect("set");
        assert_eq!(backend.get("k").expect("get").as_deref(), Some("v"));

        backend.remove("k").expect("remove");
        assert!(backend.get("k").expect("get").is_none());
        assert_eq!(backend.get("other").expect("get").as_deref(), Some("w"));
    }

    #[test]
    fn file_backend_reports_corrupt_documents() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("drafts.json");
        fs::write(&path, "[1, 2]").expect("write");
        let backend = FileBackend::new(&path);
        assert!(matches!(
            backend.get("k"),
            Err(PersistenceError::Corrupt(_))
        ));
    }
}
