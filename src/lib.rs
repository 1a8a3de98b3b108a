//! Semi-structured JSON documents with ordered binary attachments.

pub mod codec;
pub mod document;
pub mod error;

pub use codec::{EncodeOptions, MultipartBody, MultipartOptions};
pub use document::{Document, FieldStore, Update, ATTACHMENTS_FIELD, ID_FIELD, REV_FIELD};
pub use error::{DocumentError, Result};
