//! Canonical string forms for request signing
//!
//! Signer and verifier must produce byte-identical output, so every value is
//! rendered compactly with object keys sorted at every depth.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

/// Delimiter between base string segments.
pub const DELIMITER: char = ':';

/// Render a JSON value in canonical form.
///
/// Object keys are sorted byte-wise, no insignificant whitespace is emitted,
/// integers keep their integer form and floats use the shortest round-trip
/// representation.
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();

            out.push('{');
            for (i, key) in keys.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_string(out, key);
                out.push(':');
                write_value(out, &map[key]);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::String(s) => write_string(out, s),
        // null, bool and numbers already have a single compact rendering
        other => out.push_str(&other.to_string()),
    }
}

fn write_string(out: &mut String, s: &str) {
    // serde_json never fails to serialize a str
    out.push_str(&Value::String(s.to_owned()).to_string());
}

/// Canonical form of a raw (still percent-encoded) query string.
///
/// Parameters are grouped by key; a key seen once maps to its string value,
/// a repeated key maps to an array of values in order of appearance. An
/// absent or empty query renders as `{}`.
pub fn canonical_query(raw: Option<&str>) -> Result<String, serde_urlencoded::de::Error> {
    let pairs: Vec<(String, String)> = match raw {
        Some(raw) if !raw.is_empty() => serde_urlencoded::from_str(raw)?,
        _ => Vec::new(),
    };
    Ok(canonical_json(&query_value(pairs)))
}

/// Group decoded query pairs into a JSON object.
pub fn query_value(pairs: impl IntoIterator<Item = (String, String)>) -> Value {
    let mut grouped: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (key, value) in pairs {
        grouped.entry(key).or_default().push(value);
    }

    let map: Map<String, Value> = grouped
        .into_iter()
        .map(|(key, mut values)| {
            let value = if values.len() == 1 {
                Value::String(values.remove(0))
            } else {
                Value::Array(values.into_iter().map(Value::String).collect())
            };
            (key, value)
        })
        .collect();

    Value::Object(map)
}

/// Base string covered by the signature:
/// `clientId:timestamp:canonicalQuery:canonicalBody`.
pub fn base_string(client_id: &str, timestamp: &str, query: &str, body: &str) -> String {
    let mut base =
        String::with_capacity(client_id.len() + timestamp.len() + query.len() + body.len() + 3);
    base.push_str(client_id);
    base.push(DELIMITER);
    base.push_str(timestamp);
    base.push(DELIMITER);
    base.push_str(query);
    base.push(DELIMITER);
    base.push_str(body);
    base
}
