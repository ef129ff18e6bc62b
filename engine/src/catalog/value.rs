//! Loose readers over dynamically typed YAML values.

use serde_yaml::{Mapping, Value};

/// Scalar as trimmed text; non-scalars (and booleans) read as empty.
pub fn as_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => number_text(n),
        Value::Tagged(t) => as_string(&t.value),
        _ => String::new(),
    }
}

fn number_text(n: &serde_yaml::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
        Some(f) => f.to_string(),
        None => String::new(),
    }
}

/// A scalar or a list of scalars, blanks dropped.
pub fn as_string_list(v: &Value) -> Vec<String> {
    match v {
        Value::Sequence(items) => items
            .iter()
            .map(as_string)
            .filter(|s| !s.is_empty())
            .collect(),
        other => {
            let one = as_string(other);
            if one.is_empty() { Vec::new() } else { vec![one] }
        }
    }
}

/// Integer view; floats truncate, numeric strings parse.
pub fn as_int(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn get<'a>(map: &'a Mapping, key: &str) -> Option<&'a Value> {
    map.get(key).filter(|v| !v.is_null())
}

pub fn string_at(map: &Mapping, key: &str) -> String {
    get(map, key).map(as_string).unwrap_or_default()
}

pub fn flag(map: &Mapping, key: &str) -> bool {
    matches!(get(map, key), Some(Value::Bool(true)))
}

/// `v` itself when scalar, else `v[key]` (for `{type: ...}` / `{cr: ...}`).
pub fn scalar_or_field(v: &Value, key: &str) -> String {
    let direct = as_string(v);
    if !direct.is_empty() {
        return direct;
    }
    match v {
        Value::Mapping(m) => string_at(m, key),
        _ => String::new(),
    }
}

/// Flatten any value into a single line of prose. Mapping keys are sorted.
pub fn plain(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Sequence(items) => items
            .iter()
            .map(plain)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", "),
        Value::Mapping(m) => {
            let mut pairs: Vec<(String, String)> = m
                .iter()
                .map(|(k, v)| (as_string(k), plain(v)))
                .filter(|(_, v)| !v.is_empty())
                .collect();
            pairs.sort();
            pairs
                .into_iter()
                .map(|(k, v)| format!("{k} {v}"))
                .collect::<Vec<_>>()
                .join(", ")
        }
        other => as_string(other),
    }
}
