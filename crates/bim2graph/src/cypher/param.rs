//! Driver-independent Cypher parameter values.

use crate::error::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;

/// A Cypher parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Param>),
    Map(BTreeMap<String, Param>),
}

impl Param {
    /// Convert any serializable record into a parameter (structs become maps).
    pub fn from_record<T: Serialize>(record: &T) -> Result<Self> {
        Ok(serde_json::to_value(record)?.into())
    }

    /// Convert a slice of records into a list parameter.
    pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self> {
        records
            .iter()
            .map(Param::from_record)
            .collect::<Result<Vec<_>>>()
            .map(Param::List)
    }

    /// Render as a Cypher literal, e.g. for `:param` lines in a script.
    pub fn to_cypher_literal(&self) -> String {
        let mut out = String::new();
        self.write_literal(&mut out);
        out
    }

    fn write_literal(&self, out: &mut String) {
        match self {
            Param::Null => out.push_str("null"),
            Param::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
            Param::Int(i) => {
                let _ = write!(out, "{}", i);
            }
            Param::Float(f) => {
                let _ = write!(out, "{:?}", f);
            }
            Param::String(s) => {
                out.push('\'');
                for ch in s.chars() {
                    match ch {
                        '\\' => out.push_str("\\\\"),
                        '\'' => out.push_str("\\'"),
                        '\n' => out.push_str("\\n"),
                        '\r' => out.push_str("\\r"),
                        '\t' => out.push_str("\\t"),
                        c => out.push(c),
                    }
                }
                out.push('\'');
            }
            Param::List(items) => {
                out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    item.write_literal(out);
                }
                out.push(']');
            }
            Param::Map(entries) => {
                out.push('{');
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    out.push_str(&map_key(key));
                    out.push_str(": ");
                    value.write_literal(out);
                }
                out.push('}');
            }
        }
    }
}

/// Backtick-quote keys that are not plain identifiers.
fn map_key(key: &str) -> String {
    let plain = key
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        key.to_string()
    } else {
        format!("`{}`", key.replace('`', "``"))
    }
}

impl From<serde_json::Value> for Param {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match value {
            Json::Null => Param::Null,
            Json::Bool(b) => Param::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Param::Int(i),
                None => Param::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Param::String(s),
            Json::Array(items) => Param::List(items.into_iter().map(Param::from).collect()),
            Json::Object(entries) => Param::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Param::from(v)))
                    .collect(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    #[serde(rename_all = "camelCase")]
    struct Row {
        id: String,
        long_name: Option<String>,
        thickness: f64,
        layer_index: i64,
    }

    #[test]
    fn test_from_record() {
        let row = Row {
            id: "a".into(),
            long_name: None,
            thickness: 0.2,
            layer_index: 3,
        };
        let Param::Map(map) = Param::from_record(&row).unwrap() else {
            panic!("expected map");
        };
        assert_eq!(map["id"], Param::String("a".into()));
        assert_eq!(map["longName"], Param::Null);
        assert_eq!(map["thickness"], Param::Float(0.2));
        assert_eq!(map["layerIndex"], Param::Int(3));
    }

    #[test]
    fn test_literal_rendering() {
        let mut map = BTreeMap::new();
        map.insert("name".to_string(), Param::String("O'Brien\\".into()));
        map.insert("wall_id".to_string(), Param::Null);
        map.insert("odd key".to_string(), Param::Float(1.0));
        let param = Param::List(vec![Param::Map(map), Param::Bool(true), Param::Int(-4)]);
        assert_eq!(
            param.to_cypher_literal(),
            "[{name: 'O\\'Brien\\\\', `odd key`: 1.0, wall_id: null}, true, -4]"
        );
    }
}
