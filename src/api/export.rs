// Export format module
// CSV and XML renderings of the user list. Values are interpolated as text
// without quoting or escaping.

use serde_json::{Number, Value};

use crate::store::User;

/// Text of a reserved field that never got a value
const UNDEFINED: &str = "undefined";

/// Requested export format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Xml,
}

impl ExportFormat {
    /// Unknown names fall back to JSON
    pub fn from_name(name: &str) -> Self {
        match name {
            "csv" => Self::Csv,
            "xml" => Self::Xml,
            _ => Self::Json,
        }
    }
}

/// Render a value the way string interpolation would show it
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => value_text(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

/// Whole floats print without a fraction (`1.0` -> `1`)
fn number_text(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{f:.0}")
            }
        }
        _ => n.to_string(),
    }
}

fn field_text(value: Option<&Value>) -> String {
    value.map_or_else(|| UNDEFINED.to_string(), value_text)
}

/// Header from the first record's keys, then one quoted row per record
pub fn to_csv(users: &[User]) -> String {
    let Some(first) = users.first() else {
        return String::new();
    };

    let header = first.keys().collect::<Vec<_>>().join(",");
    let rows = users
        .iter()
        .map(|user| {
            user.entries()
                .map(|(_, value)| format!("\"{}\"", field_text(value)))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!("{header}\n{rows}")
}

pub fn to_xml(users: &[User]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<users>\n");
    for user in users {
        xml.push_str("  <user>\n");
        for (key, value) in user.entries() {
            xml.push_str(&format!("    <{key}>{}</{key}>\n", field_text(value)));
        }
        xml.push_str("  </user>\n");
    }
    xml.push_str("</users>");
    xml
}
