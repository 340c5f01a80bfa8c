//! Dotted-path view of JSON documents.

use serde_json::{Map, Value};

use fieldmap_model::{SourcePath, TargetField, is_meaningful_value};

use crate::error::{MappingError, Result};

/// Flattens a document into its leaves, depth first, in document order.
///
/// Objects and arrays are traversed but never emitted; array entries are
/// addressed by index. Only a scalar root is rejected.
pub fn flatten(document: &Value) -> Result<Vec<SourcePath>> {
    if !matches!(document, Value::Object(_) | Value::Array(_)) {
        return Err(MappingError::MalformedSource {
            found: value_kind(document),
        });
    }
    let mut leaves = Vec::new();
    walk(document, "", &mut leaves);
    Ok(leaves)
}

fn walk(value: &Value, prefix: &str, leaves: &mut Vec<SourcePath>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                walk(child, &join(prefix, key), leaves);
            }
        }
        Value::Array(items) => {
            for (idx, child) in items.iter().enumerate() {
                walk(child, &join(prefix, &idx.to_string()), leaves);
            }
        }
        leaf => leaves.push(SourcePath::new(prefix, leaf.clone())),
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Lists the resolution targets of a skeleton document.
///
/// Every non-object value is a target; nested objects contribute their
/// leaves under a dotted path. Leaves that already hold a value are marked
/// prefilled.
pub fn target_fields(skeleton: &Value) -> Result<Vec<TargetField>> {
    let Value::Object(map) = skeleton else {
        return Err(MappingError::MalformedTarget {
            found: value_kind(skeleton),
        });
    };
    let mut targets = Vec::new();
    collect_targets(map, &mut Vec::new(), &mut targets);
    Ok(targets)
}

// Keys are kept verbatim: a skeleton key may itself contain dots.
fn collect_targets(
    map: &Map<String, Value>,
    keys: &mut Vec<String>,
    targets: &mut Vec<TargetField>,
) {
    for (key, value) in map {
        keys.push(key.clone());
        match value {
            Value::Object(child) if !child.is_empty() => collect_targets(child, keys, targets),
            Value::Object(_) => {}
            leaf => targets.push(TargetField::from_segments(
                keys.clone(),
                is_meaningful_value(leaf),
            )),
        }
        keys.pop();
    }
}

/// Leaf paths of a skeleton in document order.
pub fn target_paths(skeleton: &Value) -> Result<Vec<String>> {
    Ok(target_fields(skeleton)?
        .into_iter()
        .map(|target| target.path)
        .collect())
}

/// Looks up the value at a dotted path.
///
/// Missing keys, out-of-range indices and paths that run through a scalar
/// all yield `None`.
pub fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|idx| items.get(idx)),
        _ => None,
    })
}

/// Writes `value` at a dotted path, creating intermediate objects.
///
/// Returns `false` when an intermediate level is a scalar or an array index
/// is out of range; the document is left unchanged in that case.
pub fn materialize(document: &mut Value, path: &str, value: Value) -> bool {
    let segments: Vec<&str> = path.split('.').collect();
    materialize_segments(document, &segments, value)
}

/// Writes `value` under literal keys, one per level.
///
/// Same rules as [`materialize`], but a key containing a dot addresses a
/// single level.
pub fn materialize_segments<S: AsRef<str>>(
    document: &mut Value,
    segments: &[S],
    value: Value,
) -> bool {
    if !can_materialize(document, segments) {
        return false;
    }
    let Some((last, parents)) = segments.split_last() else {
        return false;
    };
    let last: &str = last.as_ref();
    let mut node = document;
    for segment in parents {
        let segment: &str = segment.as_ref();
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = match node {
            Value::Object(map) => map
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new())),
            Value::Array(items) => {
                match segment.parse::<usize>().ok().and_then(|idx| items.get_mut(idx)) {
                    Some(child) => child,
                    None => return false,
                }
            }
            _ => return false,
        };
    }
    if node.is_null() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => {
            map.insert(last.to_string(), value);
            true
        }
        Value::Array(items) => {
            match last.parse::<usize>().ok().and_then(|idx| items.get_mut(idx)) {
                Some(slot) => {
                    *slot = value;
                    true
                }
                None => false,
            }
        }
        _ => false,
    }
}

// Dry run so a blocked path never leaves half-created levels behind.
fn can_materialize<S: AsRef<str>>(document: &Value, segments: &[S]) -> bool {
    let mut node = Some(document);
    for (depth, segment) in segments.iter().enumerate() {
        let segment: &str = segment.as_ref();
        let is_last = depth + 1 == segments.len();
        match node {
            // Missing or null levels are created on write.
            None | Some(Value::Null) => return true,
            Some(Value::Object(map)) => node = map.get(segment),
            Some(Value::Array(items)) => {
                match segment.parse::<usize>().ok().filter(|idx| *idx < items.len()) {
                    Some(idx) => node = items.get(idx),
                    None => return false,
                }
            }
            Some(_) => return false,
        }
        if is_last {
            return true;
        }
    }
    true
}

pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
