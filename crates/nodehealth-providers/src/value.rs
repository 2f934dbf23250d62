//! Tolerant accessors for tool JSON, where numbers often arrive as strings.

use serde_json::Value;

pub(crate) fn field<'a>(root: &'a Value, section: &str, label: &str) -> Option<&'a Value> {
    root.get(section)?.get(label)
}

/// Element `index` of a `{"values": [...]}` wrapper.
pub(crate) fn values_at(v: &Value, index: usize) -> Option<&Value> {
    v.get("values")?.get(index)
}

fn is_placeholder(s: &str) -> bool {
    matches!(s, "" | "N/A" | "[N/A]" | "NA")
}

pub(crate) fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            (!is_placeholder(s)).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Object(_) => values_at(v, 0).and_then(as_text),
        _ => None,
    }
}

pub(crate) fn as_f64(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_f64(s),
        _ => None,
    }
}

pub(crate) fn as_i64(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => parse_i64(s),
        _ => None,
    }
}

pub(crate) fn parse_f64(s: &str) -> Option<f64> {
    let s = s.trim();
    if is_placeholder(s) {
        return None;
    }
    s.parse::<f64>().ok().filter(|f| f.is_finite())
}

pub(crate) fn parse_i64(s: &str) -> Option<i64> {
    let s = s.trim();
    if is_placeholder(s) {
        return None;
    }
    s.parse::<i64>()
        .ok()
        .or_else(|| parse_f64(s).map(|f| f as i64))
}
