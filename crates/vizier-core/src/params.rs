//! Parameter sets bound into a document before the visualization script runs.
//!
//! A [`ParameterSet`] is the flat `name -> value` mapping a request carries.
//! It is rendered into Python assignment statements by
//! [`CodeCell::from_parameters`](crate::cell::CodeCell::from_parameters) and
//! can also be bound as a structured `variables` dict
//! (see [`Document::bind_variables`](crate::document::Document::bind_variables)).

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// How string-like parameter values are written into generated source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterQuoting {
    /// Wrap the raw value in double quotes with no escaping.
    ///
    /// A value containing `"` or a newline changes the meaning of the
    /// generated statement. Kept as the default for compatibility with
    /// existing visualization scripts.
    #[default]
    Verbatim,
    /// Escape backslashes, quotes and control characters so the value is
    /// always an inert string literal.
    Escaped,
}

/// Named parameters for one visualization request.
///
/// Keys are kept in a `BTreeMap`, so every rendering iterates them in
/// lexicographic order and generated code is reproducible.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, Value>,
}

impl ParameterSet {
    /// Create an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object such as `{"source": "gs://bucket/data.csv"}`.
    ///
    /// An empty or whitespace-only string is treated as `{}`.
    pub fn from_json(json: &str) -> Result<Self> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }

        match serde_json::from_str::<Value>(json) {
            Ok(Value::Object(map)) => Ok(Self {
                values: map.into_iter().collect(),
            }),
            Ok(other) => Err(Error::InvalidParameters(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(Error::InvalidParameters(e.to_string())),
        }
    }

    /// Insert or replace a parameter.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Number of parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the set has no parameters.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate parameters in sorted key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Render one `key = value` line per parameter, sorted by key.
    ///
    /// `null` and booleans are written as the Python literals `None`,
    /// `True` and `False`. Everything else is written as a double-quoted
    /// string: strings by their contents, other JSON values by the text
    /// Python's `str()` gives them (`{'a': 1}`, `[1, True, None]`).
    pub fn to_assignments(&self, quoting: ParameterQuoting) -> String {
        let mut source = String::new();
        for (key, value) in self.iter() {
            let _ = writeln!(source, "{} = {}", key, python_literal(value, quoting));
        }
        source
    }

    /// The set as a JSON object, used for the structured `variables` binding.
    pub fn to_json_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

fn python_literal(value: &Value, quoting: ParameterQuoting) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => quote(s, quoting),
        other => quote(&python_repr(other), quoting),
    }
}

/// Python `repr()` text of a JSON value.
fn python_repr(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => python_str_repr(s),
        Value::Array(items) => {
            let items: Vec<String> = items.iter().map(python_repr).collect();
            format!("[{}]", items.join(", "))
        }
        Value::Object(map) => {
            let entries: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", python_str_repr(k), python_repr(v)))
                .collect();
            format!("{{{}}}", entries.join(", "))
        }
    }
}

/// Single-quoted unless the text holds `'` and no `"`, as Python does.
fn python_str_repr(s: &str) -> String {
    let delim = if s.contains('\'') && !s.contains('"') { '"' } else { '\'' };
    let mut out = String::with_capacity(s.len() + 2);
    out.push(delim);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == delim => {
                out.push('\\');
                out.push(c);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push(delim);
    out
}

fn quote(raw: &str, quoting: ParameterQuoting) -> String {
    match quoting {
        ParameterQuoting::Verbatim => format!("\"{}\"", raw),
        ParameterQuoting::Escaped => {
            let mut out = String::with_capacity(raw.len() + 2);
            out.push('"');
            for c in raw.chars() {
                match c {
                    '\\' => out.push_str("\\\\"),
                    '"' => out.push_str("\\\""),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\t' => out.push_str("\\t"),
                    c if c.is_control() => {
                        let _ = write!(out, "\\u{:04x}", c as u32);
                    }
                    c => out.push(c),
                }
            }
            out.push('"');
            out
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_set_renders_nothing() {
        let params = ParameterSet::new();
        assert_eq!(params.to_assignments(ParameterQuoting::Verbatim), "");
    }

    #[test]
    fn test_keys_are_sorted() {
        let params: ParameterSet = [("zeta", "z"), ("alpha", "a"), ("mid", "m")]
            .into_iter()
            .collect();
        assert_eq!(
            params.to_assignments(ParameterQuoting::Verbatim),
            "alpha = \"a\"\nmid = \"m\"\nzeta = \"z\"\n"
        );
    }

    #[test]
    fn test_order_independent_of_insertion() {
        let mut forward = ParameterSet::new();
        forward.insert("a", 1).insert("b", 2).insert("c", 3);
        let mut backward = ParameterSet::new();
        backward.insert("c", 3).insert("b", 2).insert("a", 1);
        assert_eq!(
            forward.to_assignments(ParameterQuoting::Verbatim),
            backward.to_assignments(ParameterQuoting::Verbatim)
        );
    }

    #[test]
    fn test_null_and_bool_are_unquoted() {
        let params =
            ParameterSet::from_json(r#"{"flag": true, "off": false, "missing": null}"#).unwrap();
        assert_eq!(
            params.to_assignments(ParameterQuoting::Verbatim),
            "flag = True\nmissing = None\noff = False\n"
        );
    }

    #[test]
    fn test_numbers_are_quoted() {
        let params = ParameterSet::from_json(r#"{"x": 2}"#).unwrap();
        assert_eq!(params.to_assignments(ParameterQuoting::Verbatim), "x = \"2\"\n");
    }

    #[test]
    fn test_structured_values_use_python_repr() {
        let params = ParameterSet::from_json(r#"{"cfg": {"a": 1}, "xs": [1, 2]}"#).unwrap();
        assert_eq!(
            params.to_assignments(ParameterQuoting::Verbatim),
            "cfg = \"{'a': 1}\"\nxs = \"[1, 2]\"\n"
        );
    }

    #[test]
    fn test_nested_literals_match_python() {
        let params =
            ParameterSet::from_json(r#"{"v": [true, null, 1.5, "it's", "a\nb"]}"#).unwrap();
        assert_eq!(
            params.to_assignments(ParameterQuoting::Escaped),
            concat!(r#"v = "[True, None, 1.5, \"it's\", 'a\\nb']""#, "\n")
        );
    }

    #[test]
    fn test_verbatim_does_not_escape_quotes() {
        let params = ParameterSet::from_json(
            r#"{"target_lambda": "lambda x: (x['target'] > x[\"fare\"])"}"#,
        )
        .unwrap();
        assert_eq!(
            params.to_assignments(ParameterQuoting::Verbatim),
            "target_lambda = \"lambda x: (x['target'] > x[\"fare\"])\"\n"
        );
    }

    #[test]
    fn test_escaped_quoting() {
        let mut params = ParameterSet::new();
        params.insert("s", "say \"hi\"\\\nbye");
        assert_eq!(
            params.to_assignments(ParameterQuoting::Escaped),
            "s = \"say \\\"hi\\\"\\\\\\nbye\"\n"
        );
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        for json in ["[1, 2]", "\"text\"", "3", "null"] {
            let err = ParameterSet::from_json(json).unwrap_err();
            assert!(matches!(err, Error::InvalidParameters(_)), "{json}");
        }
    }

    #[test]
    fn test_from_json_rejects_malformed() {
        assert!(matches!(
            ParameterSet::from_json("{not json"),
            Err(Error::InvalidParameters(_))
        ));
    }

    #[test]
    fn test_blank_json_is_empty() {
        assert!(ParameterSet::from_json("  ").unwrap().is_empty());
    }

    #[test]
    fn test_to_json_value_roundtrip() {
        let params = ParameterSet::from_json(r#"{"a": 1, "b": "two"}"#).unwrap();
        let value = params.to_json_value();
        assert_eq!(value["a"], 1);
        assert_eq!(value["b"], "two");
    }
}
