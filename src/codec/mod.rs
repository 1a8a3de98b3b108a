//! Wire codec: JSON text (or a parsed `Value`) to `Document` and back.
//!
//! Decoding moves inline base64 payloads into the side-table and records the
//! attachment order. Encoding walks that order, re-inlining payloads as
//! `data` or marking them `follows` for multipart transmission.

pub mod decode;
pub mod encode;
pub mod multipart;

pub use encode::EncodeOptions;
pub use multipart::{MultipartBody, MultipartOptions};
