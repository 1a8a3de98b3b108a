//! Generic key/value access over a document.
//!
//! `_id` and `_rev` route through the identity accessors. `_attachments` can
//! be read and removed here, but not written: writes must go through the
//! attachment API so order and payloads stay consistent.

use serde_json::Value;

use crate::error::{DocumentError, Result};

use super::{Document, ATTACHMENTS_FIELD, ID_FIELD, REV_FIELD};

/// Result of a `get_and_update` callback.
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Store the second value under the key and report the first.
    Replace(Option<Value>, Value),
    /// Remove the key and report the removed value.
    Pop,
}

/// Key/value access with copy-on-write semantics.
pub trait FieldStore: Sized {
    fn fetch(&self, key: &str) -> Option<Value>;

    fn get(&self, key: &str, default: Value) -> Value {
        self.fetch(key).unwrap_or(default)
    }

    fn put(&self, key: &str, value: Value) -> Result<Self>;

    fn pop(&self, key: &str) -> (Option<Value>, Self);

    fn delete(&self, key: &str) -> Self {
        self.pop(key).1
    }

    /// Call `f` with the current value of `key` (or `None`) and apply the
    /// returned `Update`.
    fn get_and_update<F>(&self, key: &str, f: F) -> Result<(Option<Value>, Self)>
    where
        F: FnOnce(Option<Value>) -> Update,
    {
        match f(self.fetch(key)) {
            Update::Replace(observed, value) => Ok((observed, self.put(key, value)?)),
            Update::Pop => Ok(self.pop(key)),
        }
    }
}

impl FieldStore for Document {
    fn fetch(&self, key: &str) -> Option<Value> {
        match key {
            ID_FIELD => self.id.clone().map(Value::String),
            REV_FIELD => self.rev.clone().map(Value::String),
            _ => self.fields.get(key).cloned(),
        }
    }

    fn put(&self, key: &str, value: Value) -> Result<Self> {
        match key {
            ID_FIELD => Ok(self.set_id(identity_value(key, &value)?)),
            REV_FIELD => Ok(self.set_rev(identity_value(key, &value)?)),
            ATTACHMENTS_FIELD => Err(DocumentError::UnsupportedOperation(format!(
                "cannot put \"{}\" directly; use the attachment API",
                ATTACHMENTS_FIELD
            ))),
            _ => {
                let mut doc = self.clone();
                doc.fields.insert(key.to_string(), value);
                Ok(doc)
            }
        }
    }

    fn pop(&self, key: &str) -> (Option<Value>, Self) {
        match key {
            ID_FIELD => (self.fetch(key), self.set_id(None)),
            REV_FIELD => (self.fetch(key), self.set_rev(None)),
            ATTACHMENTS_FIELD => (self.fetch(key), self.delete_attachments()),
            _ => {
                let mut doc = self.clone();
                let removed = doc.fields.shift_remove(key);
                (removed, doc)
            }
        }
    }
}

/// `_id`/`_rev` accept a string, or null to clear.
fn identity_value<'a>(key: &str, value: &'a Value) -> Result<Option<&'a str>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.as_str())),
        other => Err(DocumentError::InvalidValue(format!(
            "\"{}\" must be a string or null, got {}",
            key, other
        ))),
    }
}
