//! Wire payload to `Document`.

use std::collections::HashMap;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{meta, Document, ATTACHMENTS_FIELD};
use crate::error::{DocumentError, Result};

impl Document {
    /// Decode a document from JSON text.
    pub fn from_wire(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Decode a document from UTF-8 JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_value(serde_json::from_slice(bytes)?)
    }

    /// Decode a document from an already-parsed JSON value.
    ///
    /// Inline `data` is base64-decoded into the payload table and replaced
    /// by `stub: true` plus the decoded `length`. `follows` placeholders
    /// become stubs without payload. Attachment order is the order of the
    /// `_attachments` object.
    ///
    /// An attachment whose `data` is not valid base64 keeps its raw metadata
    /// and gets no payload; the rest of the document still decodes.
    pub fn from_value(value: Value) -> Result<Self> {
        let mut fields = match value {
            Value::Object(fields) => fields,
            other => {
                return Err(DocumentError::Decode(format!(
                    "top-level value must be a JSON object, got {}",
                    kind(&other)
                )))
            }
        };

        let attachments = match fields.get_mut(ATTACHMENTS_FIELD) {
            Some(Value::Object(attachments)) if !attachments.is_empty() => {
                std::mem::take(attachments)
            }
            _ => return Ok(Document::from_fields(fields)),
        };

        let mut normalized = Map::new();
        let mut order = Vec::with_capacity(attachments.len());
        let mut data: HashMap<String, Arc<[u8]>> = HashMap::new();

        for (name, info) in attachments {
            let (info, payload) = normalize_attachment(&name, info);
            if let Some(payload) = payload {
                data.insert(name.clone(), payload.into());
            }
            order.push(name.clone());
            normalized.insert(name, info);
        }

        debug!(
            attachments = order.len(),
            with_data = data.len(),
            "decoded document attachments"
        );

        // The key is still present, so this keeps its position.
        fields.insert(ATTACHMENTS_FIELD.to_string(), Value::Object(normalized));
        Ok(Document::from_parts(fields, order, data))
    }
}

/// Normalize one incoming attachment entry, splitting out its payload.
fn normalize_attachment(name: &str, info: Value) -> (Value, Option<Vec<u8>>) {
    let mut info = match info {
        Value::Object(info) => info,
        other => return (other, None),
    };

    let decoded = info
        .get(meta::DATA)
        .map(|data| data.as_str().and_then(|s| STANDARD.decode(s).ok()));

    match decoded {
        None => {
            if info.get(meta::STUB) != Some(&Value::Bool(true)) {
                info.shift_remove(meta::FOLLOWS);
                info.insert(meta::STUB.to_string(), Value::Bool(true));
            }
            (Value::Object(info), None)
        }
        Some(Some(bytes)) => {
            info.shift_remove(meta::DATA);
            info.insert(meta::STUB.to_string(), Value::Bool(true));
            info.insert(meta::LENGTH.to_string(), Value::from(bytes.len()));
            (Value::Object(info), Some(bytes))
        }
        Some(None) => {
            warn!(
                attachment = name,
                "inline attachment data is not valid base64, keeping raw metadata"
            );
            (Value::Object(info), None)
        }
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Document::from_value(value).map_err(serde::de::Error::custom)
    }
}
