//! Attachment metadata, order, and payloads.
//!
//! Metadata lives in `fields["_attachments"]`, order in `attachment_order`,
//! bytes in `attachment_data`. New attachments are always appended to the
//! order; updating an existing one never moves it.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{DocumentError, Result};

use super::{meta, Document, ATTACHMENTS_FIELD};

// ============================================================================
// Queries
// ============================================================================

impl Document {
    fn attachments(&self) -> Option<&Map<String, Value>> {
        self.fields.get(ATTACHMENTS_FIELD).and_then(Value::as_object)
    }

    /// Attachment names in wire order.
    pub fn attachment_names(&self) -> &[String] {
        &self.attachment_order
    }

    /// Number of metadata entries under `_attachments`.
    pub fn attachment_count(&self) -> usize {
        self.attachments().map_or(0, Map::len)
    }

    pub fn get_attachment_info(&self, name: &str) -> Option<&Value> {
        self.attachments().and_then(|a| a.get(name))
    }

    pub fn has_attachment(&self, name: &str) -> bool {
        self.get_attachment_info(name).is_some()
    }

    /// Cached payload for `name`, if this document holds its bytes.
    pub fn get_attachment_data(&self, name: &str) -> Option<&[u8]> {
        self.attachment_data.get(name).map(|d| &d[..])
    }

    /// Every attachment in wire order, paired with its cached payload.
    pub fn get_all_attachment_data(&self) -> Vec<(&str, Option<&[u8]>)> {
        self.attachment_order
            .iter()
            .map(|name| (name.as_str(), self.get_attachment_data(name)))
            .collect()
    }

    pub fn get_attachment(&self, name: &str) -> Option<(&Value, Option<&[u8]>)> {
        self.get_attachment_info(name)
            .map(|info| (info, self.get_attachment_data(name)))
    }
}

// ============================================================================
// Mutators
// ============================================================================

impl Document {
    /// Insert or replace metadata for `name`. A new name is appended to the
    /// order; cached payloads are untouched.
    pub fn put_attachment_info(&self, name: &str, info: Value) -> Self {
        let mut doc = self.clone();
        doc.upsert_attachment_info(name, info);
        doc
    }

    /// Replace the cached payload of an existing attachment.
    ///
    /// Fails with `MissingAttachment` when `name` has no metadata.
    pub fn put_attachment_data(&self, name: &str, data: impl Into<Arc<[u8]>>) -> Result<Self> {
        if !self.has_attachment(name) {
            return Err(DocumentError::MissingAttachment(name.to_string()));
        }
        let mut doc = self.clone();
        doc.attachment_data.insert(name.to_string(), data.into());
        Ok(doc)
    }

    /// Add or replace an attachment together with its content.
    ///
    /// Metadata is rebuilt as `{content_type, length, stub: true, digest?}`.
    pub fn put_attachment(
        &self,
        name: &str,
        data: impl Into<Arc<[u8]>>,
        content_type: &str,
        digest: Option<&str>,
    ) -> Self {
        let data: Arc<[u8]> = data.into();

        let mut info = Map::new();
        info.insert(meta::CONTENT_TYPE.to_string(), Value::from(content_type));
        info.insert(meta::LENGTH.to_string(), Value::from(data.len()));
        info.insert(meta::STUB.to_string(), Value::Bool(true));
        if let Some(digest) = digest {
            info.insert(meta::DIGEST.to_string(), Value::from(digest));
        }

        let mut doc = self.clone();
        doc.upsert_attachment_info(name, Value::Object(info));
        doc.attachment_data.insert(name.to_string(), data);
        doc
    }

    /// Remove an attachment's metadata, order entry and payload. Removing
    /// the last attachment drops the `_attachments` field.
    pub fn delete_attachment(&self, name: &str) -> Self {
        if !self.has_attachment(name) {
            return self.clone();
        }
        let mut doc = self.clone();
        let now_empty = match doc.fields.get_mut(ATTACHMENTS_FIELD) {
            Some(Value::Object(attachments)) => {
                attachments.shift_remove(name);
                attachments.is_empty()
            }
            _ => false,
        };
        if now_empty {
            doc.fields.shift_remove(ATTACHMENTS_FIELD);
        }
        doc.attachment_order.retain(|n| n != name);
        doc.attachment_data.remove(name);
        doc
    }

    /// Drop the cached payload for `name`, keeping its metadata and position.
    pub fn delete_attachment_data(&self, name: &str) -> Self {
        let mut doc = self.clone();
        doc.attachment_data.remove(name);
        doc
    }

    pub fn delete_all_attachment_data(&self) -> Self {
        let mut doc = self.clone();
        doc.attachment_data.clear();
        doc
    }

    /// Remove `_attachments` together with the order and every payload.
    pub fn delete_attachments(&self) -> Self {
        let mut doc = self.clone();
        doc.fields.shift_remove(ATTACHMENTS_FIELD);
        doc.attachment_order.clear();
        doc.attachment_data.clear();
        doc
    }

    fn upsert_attachment_info(&mut self, name: &str, info: Value) {
        let mut attachments = match self.fields.get_mut(ATTACHMENTS_FIELD) {
            Some(Value::Object(attachments)) => std::mem::take(attachments),
            _ => Map::new(),
        };

        let is_new = attachments.insert(name.to_string(), info).is_none();
        // An existing key keeps its position in the field map.
        self.fields
            .insert(ATTACHMENTS_FIELD.to_string(), Value::Object(attachments));
        if is_new && !self.attachment_order.iter().any(|n| n == name) {
            self.attachment_order.push(name.to_string());
        }
    }
}
