//! `Document` to wire payload.

use std::collections::HashSet;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{meta, Document, ATTACHMENTS_FIELD};
use crate::error::{DocumentError, Result};

// ============================================================================
// EncodeOptions
// ============================================================================

/// Options controlling wire encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodeOptions {
    /// Indent the JSON text. Never changes field or attachment order.
    pub pretty: bool,
    /// Mark cached payloads `follows: true` instead of inlining them as
    /// base64 `data`. The bytes are then sent as separate body parts, one per
    /// attachment, in attachment order.
    pub multipart: bool,
}

// ============================================================================
// Encoding
// ============================================================================

impl Document {
    /// Encode to JSON text.
    pub fn to_wire(&self, opts: &EncodeOptions) -> Result<String> {
        let value = self.to_value(opts)?;
        let text = if opts.pretty {
            serde_json::to_string_pretty(&value)
        } else {
            serde_json::to_string(&value)
        };
        text.map_err(|e| DocumentError::Encode(format!("{}", e)))
    }

    /// Encode to a JSON value.
    ///
    /// Fields keep their own order, except `_attachments`, whose entries are
    /// emitted in attachment order. Fails with `InconsistentDocument` when
    /// that order is not a permutation of the attachment names.
    pub fn to_value(&self, opts: &EncodeOptions) -> Result<Value> {
        self.check_attachment_order()?;

        debug!(
            attachments = self.attachment_order.len(),
            multipart = opts.multipart,
            "encoding document"
        );

        let mut out = Map::new();
        for (key, value) in &self.fields {
            let value = match value {
                Value::Object(attachments) if key == ATTACHMENTS_FIELD => {
                    Value::Object(self.encode_attachments(attachments, opts.multipart))
                }
                other => other.clone(),
            };
            out.insert(key.clone(), value);
        }
        Ok(Value::Object(out))
    }

    fn check_attachment_order(&self) -> Result<()> {
        let count = self.attachment_count();
        if self.attachment_order.len() != count {
            warn!(
                ordered = self.attachment_order.len(),
                attachments = count,
                "refusing to encode document with mismatched attachment order"
            );
            return Err(DocumentError::InconsistentDocument(format!(
                "{} ordered attachment names for {} attachments",
                self.attachment_order.len(),
                count
            )));
        }

        let mut seen = HashSet::with_capacity(count);
        for name in &self.attachment_order {
            if !self.has_attachment(name) {
                warn!(attachment = %name, "ordered attachment has no metadata");
                return Err(DocumentError::InconsistentDocument(format!(
                    "attachment \"{}\" is ordered but has no metadata",
                    name
                )));
            }
            if !seen.insert(name.as_str()) {
                warn!(attachment = %name, "attachment ordered twice");
                return Err(DocumentError::InconsistentDocument(format!(
                    "attachment \"{}\" appears twice in the order",
                    name
                )));
            }
        }
        Ok(())
    }

    fn encode_attachments(
        &self,
        attachments: &Map<String, Value>,
        multipart: bool,
    ) -> Map<String, Value> {
        let mut out = Map::new();
        for name in &self.attachment_order {
            let Some(info) = attachments.get(name) else {
                continue;
            };
            let encoded = match (info, self.attachment_data.get(name)) {
                (Value::Object(info), Some(_)) if multipart => follows_entry(info),
                (Value::Object(info), Some(data)) => inline_entry(info, data),
                (Value::Object(info), None) if info.contains_key(meta::FOLLOWS) => {
                    stub_entry(info)
                }
                _ => info.clone(),
            };
            out.insert(name.clone(), encoded);
        }
        out
    }
}

/// Payload goes in its own body part: drop `stub`, mark `follows`.
fn follows_entry(info: &Map<String, Value>) -> Value {
    let mut info = info.clone();
    info.shift_remove(meta::STUB);
    info.shift_remove(meta::DATA);
    info.insert(meta::FOLLOWS.to_string(), Value::Bool(true));
    Value::Object(info)
}

/// No payload to send: a stray `follows` becomes a stub, as on decode.
fn stub_entry(info: &Map<String, Value>) -> Value {
    let mut info = info.clone();
    info.shift_remove(meta::FOLLOWS);
    info.insert(meta::STUB.to_string(), Value::Bool(true));
    Value::Object(info)
}

/// Payload goes inline: drop `stub` and `length`, add base64 `data`.
fn inline_entry(info: &Map<String, Value>, data: &[u8]) -> Value {
    let mut info = info.clone();
    info.shift_remove(meta::STUB);
    info.shift_remove(meta::LENGTH);
    info.shift_remove(meta::FOLLOWS);
    info.insert(meta::DATA.to_string(), Value::String(STANDARD.encode(data)));
    Value::Object(info)
}

impl Serialize for Document {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.to_value(&EncodeOptions::default())
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}
