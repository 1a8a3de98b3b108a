//! `multipart/related` body assembly.
//!
//! Layout: one `application/json` part holding the multipart-mode encoding,
//! then one part per cached payload whose entry is marked `follows`, in
//! attachment order.
//!
//! ```text
//! --<boundary>\r\n
//! Content-Type: application/json\r\n
//! \r\n
//! {"_id":...,"_attachments":{"a.txt":{...,"follows":true}}}\r\n
//! --<boundary>\r\n
//! Content-Disposition: attachment; filename="a.txt"\r\n
//! Content-Type: text/plain\r\n
//! Content-Length: 5\r\n
//! \r\n
//! hello\r\n
//! --<boundary>--
//! ```

use serde_json::Value;
use tracing::debug;

use crate::document::{meta, Document, ATTACHMENTS_FIELD};
use crate::error::{DocumentError, Result};

use super::encode::EncodeOptions;

const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Options for `Document::to_multipart`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartOptions {
    /// Indent the JSON part.
    pub pretty: bool,
    /// Part boundary. Defaults to a random UUID when `None`.
    pub boundary: Option<String>,
}

/// An assembled `multipart/related` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultipartBody {
    pub boundary: String,
    pub body: Vec<u8>,
}

impl MultipartBody {
    /// Value for the request's `Content-Type` header.
    pub fn content_type(&self) -> String {
        format!("multipart/related; boundary=\"{}\"", self.boundary)
    }
}

impl Document {
    /// Build a `multipart/related` body: the JSON document with `follows`
    /// markers, followed by one part per entry marked `follows`.
    ///
    /// Fails with `Encode` if the boundary, an attachment name or a content
    /// type contains CR or LF.
    pub fn to_multipart(&self, opts: &MultipartOptions) -> Result<MultipartBody> {
        let encoded = self.to_value(&EncodeOptions {
            pretty: opts.pretty,
            multipart: true,
        })?;
        let json = if opts.pretty {
            serde_json::to_string_pretty(&encoded)
        } else {
            serde_json::to_string(&encoded)
        }
        .map_err(|e| DocumentError::Encode(format!("{}", e)))?;

        let boundary = opts.boundary.clone().unwrap_or_else(generate_boundary);
        header_safe("boundary", &boundary)?;

        let mut body = Vec::with_capacity(json.len() + 128);
        write_part(
            &mut body,
            &boundary,
            &[("Content-Type", "application/json".to_string())],
            json.as_bytes(),
        );

        let entries = encoded.get(ATTACHMENTS_FIELD).and_then(Value::as_object);
        let mut parts = 0usize;
        for (name, data) in self.get_all_attachment_data() {
            let Some(data) = data else {
                continue;
            };
            let Some(info) = entries.and_then(|e| e.get(name)) else {
                continue;
            };
            // Only entries announced as `follows` get a body part.
            if info.get(meta::FOLLOWS) != Some(&Value::Bool(true)) {
                continue;
            }
            let content_type = info
                .get(meta::CONTENT_TYPE)
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_CONTENT_TYPE);
            header_safe("attachment name", name)?;
            header_safe("content type", content_type)?;

            write_part(
                &mut body,
                &boundary,
                &[
                    (
                        "Content-Disposition",
                        format!("attachment; filename=\"{}\"", escape_quoted(name)),
                    ),
                    ("Content-Type", content_type.to_string()),
                    ("Content-Length", data.len().to_string()),
                ],
                data,
            );
            parts += 1;
        }
        body.extend_from_slice(format!("--{}--", boundary).as_bytes());

        debug!(parts, bytes = body.len(), "assembled multipart body");
        Ok(MultipartBody { boundary, body })
    }
}

fn write_part(body: &mut Vec<u8>, boundary: &str, headers: &[(&str, String)], content: &[u8]) {
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    for (name, value) in headers {
        body.extend_from_slice(format!("{}: {}\r\n", name, value).as_bytes());
    }
    body.extend_from_slice(b"\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(b"\r\n");
}

/// Header values cannot carry line breaks.
fn header_safe(what: &str, value: &str) -> Result<()> {
    if value.contains(['\r', '\n']) {
        return Err(DocumentError::Encode(format!(
            "{} contains a line break: {:?}",
            what, value
        )));
    }
    Ok(())
}

fn escape_quoted(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn generate_boundary() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
