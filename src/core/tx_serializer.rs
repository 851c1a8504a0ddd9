//! Canonical serialization of transaction data payloads.
//!
//! The `data` field of a transaction is free-form JSON, but its contribution
//! to the transaction hash must be bit-exact across implementations. This
//! module defines that bridge:
//!
//! - objects: `{` key `.` value pairs `.`-joined in key order `}`
//! - arrays: `[` values `.`-joined `]`
//! - strings and object keys: metacharacters `\ { } [ ] .` escaped with `\`
//! - numbers: their JSON lexeme
//! - booleans: `0x1` / `0x0`
//! - null: nothing
//!
//! Any deviation here changes every transaction hash, so the rules are
//! frozen.

use serde_json::Value;

/// Serializes a parsed JSON value into its canonical hash form.
pub fn serialize_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => {}
        Value::Bool(true) => out.extend_from_slice(b"0x1"),
        Value::Bool(false) => out.extend_from_slice(b"0x0"),
        Value::Number(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::String(s) => escape_into(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b'.');
                }
                serialize_value(item, out);
            }
            out.push(b']');
        }
        Value::Object(map) => {
            // serde_json with `preserve_order` off keeps BTreeMap ordering,
            // but sort explicitly so the canonical form never depends on a
            // feature flag.
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push(b'{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(b'.');
                }
                escape_into(key, out);
                out.push(b'.');
                serialize_value(&map[key], out);
            }
            out.push(b'}');
        }
    }
}

/// Writes `s` with the serializer metacharacters backslash-escaped.
fn escape_into(s: &str, out: &mut Vec<u8>) {
    for byte in s.bytes() {
        if matches!(byte, b'\\' | b'{' | b'}' | b'[' | b']' | b'.') {
            out.push(b'\\');
        }
        out.push(byte);
    }
}
