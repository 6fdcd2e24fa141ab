//! Canonical encoding for hashed payloads (§4.1).
//!
//! Generalizes the teacher kernel's `canonical_json` parser/emitter from a
//! fixed 8-field struct to an open-ended `Value` tree, because a `Request`'s
//! `tool_call.params` and `constraints` are caller-defined mappings, not a
//! frozen schema.
//!
//! # Rules (frozen, per §4.1)
//!
//! 1. Object keys are sorted by byte order of their UTF-8 representation.
//! 2. No insignificant whitespace.
//! 3. Absent/optional fields are emitted as the `null` marker, never omitted,
//!    so that `{a:1}` and `{a:1,b:null}` hash differently.
//! 4. Floating-point values cannot appear: there is no `Value::Float`
//!    variant, so the constraint is enforced by the type system rather than
//!    by a runtime check. Callers who need non-integer magnitudes must widen
//!    to a scaled integer or a string before constructing a `Value`.
//!
//! `BTreeMap` backs every object so iteration order is already sorted —
//! the emitter does not need a second sort pass, matching the kernel-wide
//! discipline of using ordered maps in anything that feeds a hash.

use crate::compat::BTreeMap;

/// A canonical, hashable value. Notably absent: floating point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn object() -> BTreeMap<String, Value> {
        BTreeMap::new()
    }
}

/// Produce the canonical byte encoding of `value`.
///
/// This is a direct emitter, not a parser round-trip: there is no
/// intermediate textual form to re-lex, because callers build `Value` trees
/// directly rather than handing the kernel raw JSON text.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    emit(value, &mut out);
    out
}

fn emit(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"null"),
        Value::Bool(true) => out.extend_from_slice(b"true"),
        Value::Bool(false) => out.extend_from_slice(b"false"),
        Value::Int(n) => out.extend_from_slice(n.to_string().as_bytes()),
        Value::Str(s) => emit_string(s, out),
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                emit(item, out);
            }
            out.push(b']');
        }
        Value::Object(fields) => {
            out.push(b'{');
            for (i, (key, val)) in fields.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                emit_string(key, out);
                out.push(b':');
                emit(val, out);
            }
            out.push(b'}');
        }
    }
}

fn emit_string(s: &str, out: &mut Vec<u8>) {
    out.push(b'"');
    for c in s.chars() {
        match c {
            '"' => out.extend_from_slice(b"\\\""),
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            '\t' => out.extend_from_slice(b"\\t"),
            c if (c as u32) < 0x20 => {
                out.extend_from_slice(format!("\\u{:04x}", c as u32).as_bytes());
            }
            c => {
                let mut buf = [0u8; 4];
                out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            }
        }
    }
    out.push(b'"');
}

/// Build `{ "evidence": [...] }` for `evidence_hash_of_request` (§4.1).
pub fn evidence_wrapper(evidence: &[String]) -> Value {
    let mut obj = Value::object();
    obj.insert(
        "evidence".to_string(),
        Value::Array(evidence.iter().cloned().map(Value::Str).collect()),
    );
    Value::Object(obj)
}
