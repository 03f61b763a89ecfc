//! Response-key derivation.
//!
//! A registered `once` response and an incoming request match when they
//! derive the same key: the request tag joined with a deterministic,
//! JSON-like rendering of the request data after the volatile top-level
//! fields are removed.
//!
//! The rendering walks map entries in wire order, so two structurally
//! equal maps whose fields arrive in different order produce *different*
//! keys. That order sensitivity is observable, tested behavior of the
//! matching rule — see DESIGN.md before changing it.

use std::fmt::Write as _;

use conductor_wire::Value;

/// Top-level request-data fields that never participate in matching.
pub const VOLATILE_FIELDS: [&str; 4] = ["payload", "provenance", "args", "cap"];

/// Derive the matching key for `(tag, data)`.
///
/// Volatile fields are stripped from the top level only; nested maps are
/// rendered in full. Non-map data has nothing to strip and renders as-is
/// (`Nil` renders as the empty map, so tag-only requests key as
/// `"<tag>:{}"`).
pub fn response_key(tag: &str, data: &Value) -> String {
    let mut out = String::with_capacity(tag.len() + 16);
    out.push_str(tag);
    out.push(':');
    match data {
        Value::Map(entries) => render_map(&mut out, entries, true),
        Value::Nil => out.push_str("{}"),
        other => render(&mut out, other),
    }
    out
}

fn render_map(out: &mut String, entries: &[(Value, Value)], omit_volatile: bool) {
    out.push('{');
    let mut first = true;
    for (k, v) in entries {
        if omit_volatile && k.as_str().is_some_and(|name| VOLATILE_FIELDS.contains(&name)) {
            continue;
        }
        if !first {
            out.push(',');
        }
        first = false;
        render(out, k);
        out.push(':');
        render(out, v);
    }
    out.push('}');
}

fn render(out: &mut String, value: &Value) {
    match value {
        Value::Nil => out.push_str("null"),
        Value::Boolean(b) => {
            let _ = write!(out, "{b}");
        }
        Value::Integer(i) => {
            let _ = write!(out, "{i}");
        }
        Value::F32(f) => {
            let _ = write!(out, "{f}");
        }
        Value::F64(f) => {
            let _ = write!(out, "{f}");
        }
        Value::String(s) => match s.as_str() {
            Some(s) => render_str(out, s),
            // Non-UTF-8 msgpack strings: fall back to the raw bytes.
            None => render_bytes(out, s.as_bytes()),
        },
        Value::Binary(bytes) => render_bytes(out, bytes),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                render(out, item);
            }
            out.push(']');
        }
        Value::Map(entries) => render_map(out, entries, false),
        Value::Ext(ty, bytes) => {
            let _ = write!(out, "ext({ty},");
            render_bytes(out, bytes);
            out.push(')');
        }
    }
}

fn render_bytes(out: &mut String, bytes: &[u8]) {
    out.push('[');
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{b}");
    }
    out.push(']');
}

fn render_str(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}
