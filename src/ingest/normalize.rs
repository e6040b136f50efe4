// src/ingest/normalize.rs
//! Turns whatever JSON a listing endpoint returns into a flat list of records.
//!
//! Endpoints disagree on the envelope: some return a bare array, some wrap it
//! under `tokens`/`data`/`items`/..., some nest it one level deeper and a few
//! return a single object. The search order is:
//!
//! 1. a priority key holding an array,
//! 2. the first array-valued field in document order,
//! 3. a priority key holding an object, searched the same way (bounded depth),
//! 4. the object itself, if it looks like a token record,
//! 5. nothing.

use metrics::counter;
use serde_json::{Map, Value};

use crate::ingest::identity::{ISSUER_KEYS, SYMBOL_KEYS};
use crate::ingest::types::RawTokenRecord;

/// Envelope keys that usually hold the record list, highest priority first.
pub const LIST_KEYS: &[&str] = &["tokens", "data", "items", "result", "results", "list"];

const MAX_DEPTH: usize = 3;

/// Never fails: unrecognised shapes degrade to an empty list and a warning.
pub fn normalize(source: &str, payload: Value) -> Vec<RawTokenRecord> {
    let out = match payload {
        Value::Array(items) => into_records(source, items),
        Value::Object(obj) => match find_list(obj, 0) {
            Found::List(items) => into_records(source, items),
            Found::Record(obj) => vec![obj],
            Found::Nothing => {
                tracing::warn!(target: "ingest", source, "payload object has no token list");
                Vec::new()
            }
        },
        other => {
            tracing::warn!(
                target: "ingest",
                source,
                kind = json_kind(&other),
                "unexpected payload shape"
            );
            Vec::new()
        }
    };

    if out.is_empty() {
        counter!("discovery_normalize_empty_total").increment(1);
    }
    out
}

enum Found {
    List(Vec<Value>),
    Record(RawTokenRecord),
    Nothing,
}

fn find_list(mut obj: Map<String, Value>, depth: usize) -> Found {
    // 1) priority keys with an array
    for key in LIST_KEYS {
        if obj.get(*key).is_some_and(Value::is_array) {
            if let Some(Value::Array(items)) = obj.remove(*key) {
                return Found::List(items);
            }
        }
    }

    // 2) any array field, document order
    if let Some(key) = obj
        .iter()
        .find(|(_, v)| v.is_array())
        .map(|(k, _)| k.clone())
    {
        if let Some(Value::Array(items)) = obj.remove(&key) {
            return Found::List(items);
        }
    }

    // 3) one level down through the envelope keys
    if depth < MAX_DEPTH {
        for key in LIST_KEYS {
            if let Some(Value::Object(inner)) = obj.get(*key) {
                if let Found::List(items) = find_list(inner.clone(), depth + 1) {
                    return Found::List(items);
                }
            }
        }
    }

    // 4) a lone record
    if looks_like_record(&obj) {
        return Found::Record(obj);
    }

    Found::Nothing
}

fn looks_like_record(obj: &Map<String, Value>) -> bool {
    SYMBOL_KEYS
        .iter()
        .chain(ISSUER_KEYS.iter())
        .any(|k| obj.contains_key(*k))
}

fn into_records(source: &str, items: Vec<Value>) -> Vec<RawTokenRecord> {
    let total = items.len();
    let out: Vec<RawTokenRecord> = items
        .into_iter()
        .filter_map(|v| match v {
            Value::Object(m) => Some(m),
            _ => None,
        })
        .collect();
    if out.len() < total {
        tracing::debug!(
            target: "ingest",
            source,
            dropped = total - out.len(),
            "non-object list entries dropped"
        );
    }
    out
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
