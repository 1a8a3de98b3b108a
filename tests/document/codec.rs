use std::collections::HashMap;

use less_doc::{Document, DocumentError, EncodeOptions, FieldStore, MultipartOptions};
use serde_json::{json, Map, Value};

// ============================================================================
// Helpers
// ============================================================================

fn inline() -> EncodeOptions {
    EncodeOptions::default()
}

fn multipart() -> EncodeOptions {
    EncodeOptions {
        multipart: true,
        ..Default::default()
    }
}

fn attachment_keys(value: &Value) -> Vec<String> {
    value["_attachments"]
        .as_object()
        .map(|a| a.keys().cloned().collect())
        .unwrap_or_default()
}

// ============================================================================
// End-to-end scenario
// ============================================================================

const HELLO: &str =
    r#"{"_id":"doc1","_attachments":{"a.txt":{"content_type":"text/plain","data":"aGVsbG8="}}}"#;

#[test]
fn decode_inline_attachment() {
    let doc = Document::from_wire(HELLO).unwrap();
    assert_eq!(doc.id(), Some("doc1"));
    assert_eq!(doc.attachment_names(), &["a.txt".to_string()]);
    assert_eq!(doc.get_attachment_data("a.txt"), Some(&b"hello"[..]));
    assert_eq!(
        doc.get_attachment_info("a.txt"),
        Some(&json!({"content_type": "text/plain", "stub": true, "length": 5}))
    );
}

#[test]
fn reencode_inline_is_byte_identical() {
    let doc = Document::from_wire(HELLO).unwrap();
    assert_eq!(doc.to_wire(&inline()).unwrap(), HELLO);
}

#[test]
fn reencode_multipart_marks_follows() {
    let doc = Document::from_wire(HELLO).unwrap();
    let value: Value = serde_json::from_str(&doc.to_wire(&multipart()).unwrap()).unwrap();
    let info = &value["_attachments"]["a.txt"];
    assert_eq!(info["follows"], json!(true));
    assert!(info.get("data").is_none());
    assert!(info.get("stub").is_none());
}

// ============================================================================
// Round-trip
// ============================================================================

#[test]
fn inline_round_trip_preserves_document() {
    let doc = Document::with_identity(Some("d"), Some("3-abc"))
        .set_id(Some("d"))
        .put_attachment("empty", Vec::new(), "application/octet-stream", None)
        .put_attachment("bin", vec![0, 255, 10, 13, 0], "application/x-bin", Some("md5-q"))
        .put_attachment_info("remote", json!({"content_type": "x/y", "length": 12, "stub": true}));
    let doc = doc.put("tags", json!(["a", "b"])).unwrap();

    let decoded = Document::from_wire(&doc.to_wire(&inline()).unwrap()).unwrap();
    assert_eq!(decoded, doc);
    assert_eq!(decoded.get_attachment_data("empty"), Some(&b""[..]));
}

#[test]
fn serde_round_trip_preserves_document() {
    let doc =
        Document::with_identity(Some("s"), None).put_attachment("a", vec![1, 2, 3], "x/y", None);
    let text = serde_json::to_string(&doc).unwrap();
    let back: Document = serde_json::from_str(&text).unwrap();
    assert_eq!(back, doc);
}

// ============================================================================
// Order preservation
// ============================================================================

#[test]
fn decode_records_wire_order() {
    let text = r#"{"_attachments":{
        "b":{"content_type":"x/y","data":"Yg=="},
        "a":{"content_type":"x/y","stub":true,"length":1},
        "c":{"content_type":"x/y","follows":true,"length":1}
    }}"#;
    let doc = Document::from_wire(text).unwrap();
    assert_eq!(
        doc.attachment_names(),
        &["b".to_string(), "a".to_string(), "c".to_string()]
    );

    for opts in [inline(), multipart()] {
        let value = doc.to_value(&opts).unwrap();
        assert_eq!(attachment_keys(&value), vec!["b", "a", "c"]);
    }
}

#[test]
fn encode_ignores_metadata_map_order() {
    let mut attachments = Map::new();
    for name in ["a", "b", "c"] {
        attachments.insert(name.to_string(), json!({"stub": true}));
    }
    let mut fields = Map::new();
    fields.insert("_attachments".to_string(), Value::Object(attachments));
    let order = vec!["b".to_string(), "a".to_string(), "c".to_string()];
    let doc = Document::from_parts(fields, order, HashMap::new());

    let pretty = EncodeOptions {
        pretty: true,
        ..Default::default()
    };
    let value: Value = serde_json::from_str(&doc.to_wire(&pretty).unwrap()).unwrap();
    assert_eq!(attachment_keys(&value), vec!["b", "a", "c"]);
}

// ============================================================================
// Marker exclusivity
// ============================================================================

#[test]
fn follows_and_data_are_never_both_emitted() {
    let doc = Document::new()
        .put_attachment("a", b"one".to_vec(), "x/y", None)
        .put_attachment("b", b"two".to_vec(), "x/y", None)
        .put_attachment_info("s", json!({"content_type": "x/y", "length": 2, "stub": true}));

    let value = doc.to_value(&multipart()).unwrap();
    for (_, info) in value["_attachments"].as_object().unwrap() {
        assert!(!(info.get("follows").is_some() && info.get("data").is_some()));
    }

    let value = doc.to_value(&inline()).unwrap();
    for (_, info) in value["_attachments"].as_object().unwrap() {
        assert!(info.get("follows").is_none());
    }
}

// ============================================================================
// Consistency guard
// ============================================================================

#[test]
fn mismatched_order_fails_to_encode() {
    let doc = Document::from_wire(HELLO).unwrap();
    let (fields, mut order) = (doc.fields().clone(), doc.attachment_names().to_vec());
    order.push("ghost".to_string());
    let broken = Document::from_parts(fields, order, HashMap::new());

    for opts in [inline(), multipart()] {
        assert!(matches!(
            broken.to_wire(&opts),
            Err(DocumentError::InconsistentDocument(_))
        ));
    }
    assert!(broken.to_multipart(&MultipartOptions::default()).is_err());
}

// ============================================================================
// Multipart body
// ============================================================================

#[test]
fn multipart_parts_follow_attachment_order() {
    let doc = Document::from_wire(
        r#"{"_id":"m","_attachments":{
            "second":{"content_type":"text/plain","data":"Mg=="},
            "first":{"content_type":"text/plain","data":"MQ=="}
        }}"#,
    )
    .unwrap();
    let body = doc
        .to_multipart(&MultipartOptions {
            boundary: Some("sep".to_string()),
            ..Default::default()
        })
        .unwrap();
    let text = String::from_utf8(body.body).unwrap();

    let json_part = text.find("application/json").unwrap();
    let second = text.find("filename=\"second\"").unwrap();
    let first = text.find("filename=\"first\"").unwrap();
    assert!(json_part < second && second < first);
    assert!(text.ends_with("--sep--"));
    assert_eq!(body.boundary, "sep");
}
