//! Query strings and `application/x-www-form-urlencoded` bodies as JSON trees.
//!
//! - `a=1` gives `{"a": "1"}`
//! - `a=1&a=2` gives `{"a": ["1", "2"]}`
//! - `Address[City]=Orlando&Address[Zip]=1` gives `{"Address": {"City": "Orlando", "Zip": "1"}}`
//! - `color[0]=blue&color[1]=black` gives `{"color": {"0": "blue", "1": "black"}}`
//! - `tags[]=a&tags[]=b` gives `{"tags": ["a", "b"]}`
//!
//! Numeric bracket keys stay object keys; the decomposers turn them into
//! arrays only when the schema asks for one.

use serde_json::{Map, Value};
use tracing::debug;

/// Nesting deeper than this keeps the remaining brackets in the key.
const MAX_DEPTH: usize = 8;

/// Parse everything after `?` (a leading `?` is tolerated).
pub fn parse_query(query: &str) -> Map<String, Value> {
    let query = query.strip_prefix('?').unwrap_or(query);
    let mut root = Map::new();
    for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
        let segments = key_segments(&key);
        insert(&mut root, &segments, Value::String(value.into_owned()));
    }
    debug!(param_count = root.len(), "Query params parsed");
    root
}

/// Query string part of a request target, if any.
pub fn split_target(target: &str) -> (&str, &str) {
    match target.split_once('?') {
        Some((path, query)) => (path, query),
        None => (target, ""),
    }
}

/// `a[b][c]` gives `["a", "b", "c"]`; `a[]` gives `["a", ""]`.
fn key_segments(key: &str) -> Vec<String> {
    let Some(open) = key.find('[') else {
        return vec![key.to_string()];
    };
    if open == 0 {
        return vec![key.to_string()];
    }

    let mut segments = vec![key[..open].to_string()];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            break;
        };
        if segments.len() > MAX_DEPTH {
            break;
        }
        segments.push(inner[..close].to_string());
        rest = &inner[close + 1..];
    }
    if !rest.is_empty() {
        // Malformed or too deep: keep the tail on the last segment.
        let single = segments.len() == 1;
        if let Some(last) = segments.last_mut() {
            if single {
                *last = key.to_string();
            } else {
                last.push_str(rest);
            }
        }
    }
    segments
}

fn insert(target: &mut Map<String, Value>, segments: &[String], value: Value) {
    let Some((head, tail)) = segments.split_first() else {
        return;
    };

    if tail.is_empty() {
        merge_leaf(target, head, value);
        return;
    }

    if tail.len() == 1 && tail[0].is_empty() {
        // `tags[]=x` appends
        merge_leaf(target, head, Value::Array(vec![value]));
        return;
    }

    let slot = target
        .entry(head.clone())
        .or_insert_with(|| Value::Object(Map::new()));
    if !slot.is_object() {
        // `a=1&a[b]=2`: the scalar moves under the empty key
        let previous = std::mem::replace(slot, Value::Object(Map::new()));
        if let Value::Object(map) = slot {
            map.insert(String::new(), previous);
        }
    }
    if let Value::Object(map) = slot {
        insert(map, tail, value);
    }
}

/// Repeated keys collect into an array in arrival order.
fn merge_leaf(target: &mut Map<String, Value>, key: &str, value: Value) {
    match target.get_mut(key) {
        None => {
            target.insert(key.to_string(), value);
        }
        Some(Value::Array(existing)) => match value {
            Value::Array(more) => existing.extend(more),
            other => existing.push(other),
        },
        Some(existing) => {
            let previous = existing.take();
            let mut items = vec![previous];
            match value {
                Value::Array(more) => items.extend(more),
                other => items.push(other),
            }
            *existing = Value::Array(items);
        }
    }
}
