//! Applies `add`/`replace`/`remove` patch ops to a JSON document.
//!
//! `apply_in_place` is atomic: when an op fails the document is left exactly
//! as it was. Missing branches of an `add` are built as a detached subtree and
//! attached in a single step once the whole path is known to be valid.

use std::borrow::Cow;

use chatstream_core::error::{Error, Result};
use chatstream_core::patch::{JsonPath, PatchOp, PathSegment};
use serde_json::{Map, Value};

type Step<T> = std::result::Result<T, String>;

/// Apply one op and return the new document. `document` is not modified.
pub fn apply(document: &Value, op: &PatchOp) -> Result<Value> {
    let mut next = document.clone();
    apply_in_place(&mut next, op)?;
    Ok(next)
}

/// Left-to-right application of `ops`, stopping at the first failure.
pub fn apply_all<'a, I>(document: &Value, ops: I) -> Result<Value>
where
    I: IntoIterator<Item = &'a PatchOp>,
{
    let mut next = document.clone();
    for op in ops {
        apply_in_place(&mut next, op)?;
    }
    Ok(next)
}

pub fn apply_in_place(document: &mut Value, op: &PatchOp) -> Result<()> {
    let outcome = match op {
        PatchOp::Add { path, value } => add(document, path, value.clone()),
        PatchOp::Replace { path, value } => replace(document, path, value.clone()),
        PatchOp::Remove { path } => remove(document, path),
    };
    outcome.map_err(|reason| Error::MalformedPatch {
        op: op.name().to_string(),
        path: op.path().to_string(),
        reason,
    })
}

enum Slot {
    At(usize),
    End,
    Invalid,
}

fn slot(seg: &PathSegment) -> Slot {
    match seg {
        PathSegment::Append => Slot::End,
        PathSegment::Key(k) if k == "-" => Slot::End,
        _ => seg.array_index().map_or(Slot::Invalid, Slot::At),
    }
}

fn key_of(seg: &PathSegment) -> Cow<'_, str> {
    match seg {
        PathSegment::Key(k) => Cow::Borrowed(k.as_str()),
        PathSegment::Index(i) => Cow::Owned(i.to_string()),
        PathSegment::Append => Cow::Borrowed("-"),
    }
}

fn kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn child<'a>(cur: &'a Value, seg: &PathSegment) -> Option<&'a Value> {
    match cur {
        Value::Object(map) => map.get(key_of(seg).as_ref()),
        Value::Array(items) => match slot(seg) {
            Slot::At(i) => items.get(i),
            Slot::End | Slot::Invalid => None,
        },
        _ => None,
    }
}

fn child_mut<'a>(cur: &'a mut Value, seg: &PathSegment) -> Option<&'a mut Value> {
    match cur {
        Value::Object(map) => map.get_mut(key_of(seg).as_ref()),
        Value::Array(items) => match slot(seg) {
            Slot::At(i) => items.get_mut(i),
            Slot::End | Slot::Invalid => None,
        },
        _ => None,
    }
}

fn lookup_mut<'a>(document: &'a mut Value, segments: &[PathSegment]) -> Step<&'a mut Value> {
    let mut cur = document;
    for seg in segments {
        cur = child_mut(cur, seg).ok_or_else(|| format!("no value at segment '{seg}'"))?;
    }
    Ok(cur)
}

/// Wrap `node` in a fresh container addressed by `seg`.
fn wrap(seg: &PathSegment, node: Value) -> Step<Value> {
    match slot(seg) {
        _ if !seg.addresses_array() => {
            let mut map = Map::new();
            map.insert(key_of(seg).into_owned(), node);
            Ok(Value::Object(map))
        }
        Slot::At(0) | Slot::End => Ok(Value::Array(vec![node])),
        Slot::At(i) => Err(format!("index {i} out of bounds for a new array")),
        Slot::Invalid => Err(format!("invalid array index '{seg}'")),
    }
}

/// Build the value that `rest` then `last` address, ending in `value`.
fn build(rest: &[PathSegment], last: &PathSegment, value: Value) -> Step<Value> {
    let mut node = wrap(last, value)?;
    for seg in rest.iter().rev() {
        node = wrap(seg, node)?;
    }
    Ok(node)
}

/// Place `node` under `seg`, either as a new entry or over a `null` one.
fn attach(cur: &mut Value, seg: &PathSegment, node: Value) -> Step<()> {
    if cur.is_null() {
        *cur = wrap(seg, node)?;
        return Ok(());
    }
    match cur {
        Value::Object(map) => {
            map.insert(key_of(seg).into_owned(), node);
            Ok(())
        }
        Value::Array(items) => match slot(seg) {
            Slot::At(i) if i < items.len() => {
                items[i] = node;
                Ok(())
            }
            Slot::At(i) if i == items.len() => {
                items.push(node);
                Ok(())
            }
            Slot::End => {
                items.push(node);
                Ok(())
            }
            Slot::At(i) => Err(format!("index {i} out of bounds for array of length {}", items.len())),
            Slot::Invalid => Err(format!("invalid array index '{seg}'")),
        },
        other => Err(format!("cannot descend into {} at '{seg}'", kind(other))),
    }
}

fn insert(cur: &mut Value, last: &PathSegment, value: Value) -> Step<()> {
    if cur.is_null() {
        *cur = wrap(last, value)?;
        return Ok(());
    }
    match cur {
        Value::Object(map) => {
            map.insert(key_of(last).into_owned(), value);
            Ok(())
        }
        Value::Array(items) => match slot(last) {
            Slot::At(i) if i <= items.len() => {
                items.insert(i, value);
                Ok(())
            }
            Slot::End => {
                items.push(value);
                Ok(())
            }
            Slot::At(i) => Err(format!("index {i} out of bounds for array of length {}", items.len())),
            Slot::Invalid => Err(format!("invalid array index '{last}'")),
        },
        other => Err(format!("cannot add into {}", kind(other))),
    }
}

fn add(document: &mut Value, path: &JsonPath, value: Value) -> Step<()> {
    let Some((parents, last)) = path.split_last() else {
        *document = value;
        return Ok(());
    };
    let mut cur = document;
    for (depth, seg) in parents.iter().enumerate() {
        let present = matches!(child(cur, seg), Some(v) if !v.is_null());
        if !present {
            let subtree = build(&parents[depth + 1..], last, value)?;
            return attach(cur, seg, subtree);
        }
        cur = child_mut(cur, seg).ok_or_else(|| format!("no value at segment '{seg}'"))?;
    }
    insert(cur, last, value)
}

fn replace(document: &mut Value, path: &JsonPath, value: Value) -> Step<()> {
    let target = lookup_mut(document, path.segments())?;
    *target = value;
    Ok(())
}

fn remove(document: &mut Value, path: &JsonPath) -> Step<()> {
    let Some((parents, last)) = path.split_last() else {
        return Err("cannot remove the document root".to_string());
    };
    let parent = lookup_mut(document, parents)?;
    match parent {
        Value::Object(map) => map
            .remove(key_of(last).as_ref())
            .map(drop)
            .ok_or_else(|| format!("no value at segment '{last}'")),
        Value::Array(items) => match slot(last) {
            Slot::At(i) if i < items.len() => {
                items.remove(i);
                Ok(())
            }
            _ => Err(format!("no array element at '{last}'")),
        },
        other => Err(format!("cannot remove from {}", kind(other))),
    }
}
