//! The `Document` aggregate: a JSON field store with `_id`/`_rev` promoted to
//! identity accessors, plus the attachment order and payload side-table.
//!
//! Documents are values. Every mutator borrows `self` and returns a new
//! `Document`; payload buffers are shared through `Arc<[u8]>` and never
//! written after construction.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{Map, Value};

pub mod attachments;
pub mod fields;

pub use fields::{FieldStore, Update};

// ============================================================================
// Reserved keys
// ============================================================================

pub const ID_FIELD: &str = "_id";
pub const REV_FIELD: &str = "_rev";
pub const ATTACHMENTS_FIELD: &str = "_attachments";

/// Keys of a single attachment's metadata object.
pub mod meta {
    pub const CONTENT_TYPE: &str = "content_type";
    pub const LENGTH: &str = "length";
    pub const DIGEST: &str = "digest";
    pub const STUB: &str = "stub";
    pub const DATA: &str = "data";
    pub const FOLLOWS: &str = "follows";
}

// ============================================================================
// Document
// ============================================================================

/// A semi-structured document with ordered binary attachments.
///
/// `fields` is the authoritative store and holds `_id`, `_rev` and
/// `_attachments` when present. `id`/`rev` mirror the first two and are kept
/// in sync by every mutator. `attachment_order` fixes the wire order of
/// `_attachments`; `attachment_data` caches payloads by attachment name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub(crate) id: Option<String>,
    pub(crate) rev: Option<String>,
    pub(crate) fields: Map<String, Value>,
    pub(crate) attachment_order: Vec<String>,
    pub(crate) attachment_data: HashMap<String, Arc<[u8]>>,
}

impl Document {
    /// An empty document with no identity and no attachments.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(id: Option<&str>, rev: Option<&str>) -> Self {
        Self::new().set_id(id).set_rev(rev)
    }

    /// Assemble a document from raw parts without validating them.
    ///
    /// Identity is read from `_id`/`_rev`. Nothing checks that
    /// `attachment_order` matches `_attachments`; a mismatch is reported
    /// when the document is encoded.
    pub fn from_parts(
        fields: Map<String, Value>,
        attachment_order: Vec<String>,
        attachment_data: HashMap<String, Arc<[u8]>>,
    ) -> Self {
        let mut doc = Self::from_fields(fields);
        doc.attachment_order = attachment_order;
        doc.attachment_data = attachment_data;
        doc
    }

    /// A document over `fields` with no attachment order or payloads.
    pub(crate) fn from_fields(fields: Map<String, Value>) -> Self {
        let id = string_field(&fields, ID_FIELD);
        let rev = string_field(&fields, REV_FIELD);
        Self {
            id,
            rev,
            fields,
            attachment_order: Vec::new(),
            attachment_data: HashMap::new(),
        }
    }

    // ------------------------------------------------------------------------
    // Identity
    // ------------------------------------------------------------------------

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn rev(&self) -> Option<&str> {
        self.rev.as_deref()
    }

    /// Set or clear `_id`. The field and the accessor change together.
    pub fn set_id(&self, id: Option<&str>) -> Self {
        let mut doc = self.clone();
        doc.id = write_identity(&mut doc.fields, ID_FIELD, id);
        doc
    }

    /// Set or clear `_rev`. The field and the accessor change together.
    pub fn set_rev(&self, rev: Option<&str>) -> Self {
        let mut doc = self.clone();
        doc.rev = write_identity(&mut doc.fields, REV_FIELD, rev);
        doc
    }

    // ------------------------------------------------------------------------
    // Read-only field access
    // ------------------------------------------------------------------------

    /// The raw field map, in insertion order.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn contains_key(&self, key: &str) -> bool {
        match key {
            ID_FIELD => self.id.is_some(),
            REV_FIELD => self.rev.is_some(),
            _ => self.fields.contains_key(key),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn string_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    fields.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Write an identity field and return the new accessor value.
fn write_identity(fields: &mut Map<String, Value>, key: &str, value: Option<&str>) -> Option<String> {
    match value {
        Some(v) => {
            fields.insert(key.to_string(), Value::String(v.to_string()));
            Some(v.to_string())
        }
        None => {
            fields.shift_remove(key);
            None
        }
    }
}
