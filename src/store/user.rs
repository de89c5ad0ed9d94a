// Stored user module
// Ordered fields where a key may hold its position without a value

use serde::ser::{Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;

use super::Record;

/// A stored user.
///
/// Reserved keys keep their place in the field order but hold no value.
/// They are left out of JSON output and read as `undefined` in exports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct User {
    fields: Record,
    unset: BTreeSet<String>,
}

impl User {
    /// Set `key`, keeping its position if it already exists
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        self.unset.remove(&key);
        self.fields.insert(key, value);
    }

    /// Reserve a position for `key` without giving it a value
    pub fn reserve(&mut self, key: impl Into<String>) {
        let key = key.into();
        if !self.fields.contains_key(&key) {
            self.fields.insert(key.clone(), Value::Null);
            self.unset.insert(key);
        }
    }

    /// Value of `key`; `None` when absent or only reserved
    pub fn get(&self, key: &str) -> Option<&Value> {
        if self.unset.contains(key) {
            return None;
        }
        self.fields.get(key)
    }

    /// Every key in order, reserved ones included
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Every field in order; reserved keys yield `None`
    pub fn entries(&self) -> impl Iterator<Item = (&str, Option<&Value>)> {
        self.fields
            .iter()
            .map(|(key, value)| (key.as_str(), (!self.unset.contains(key)).then_some(value)))
    }

    /// Fields that hold a value, as a JSON object
    pub fn to_record(&self) -> Record {
        self.entries()
            .filter_map(|(key, value)| Some((key.to_string(), value?.clone())))
            .collect()
    }
}

impl From<Record> for User {
    fn from(fields: Record) -> Self {
        Self {
            fields,
            unset: BTreeSet::new(),
        }
    }
}

impl Serialize for User {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.entries()
                .filter_map(|(key, value)| Some((key, value?))),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reserved_key_keeps_position() {
        let mut user = User::default();
        user.set("id", json!("4"));
        user.reserve("username");
        user.set("isAdmin", json!(true));

        assert_eq!(user.keys().collect::<Vec<_>>(), ["id", "username", "isAdmin"]);
        assert!(user.get("username").is_none());
        assert_eq!(serde_json::to_string(&user).unwrap(), r#"{"id":"4","isAdmin":true}"#);

        user.set("username", json!(null));
        assert_eq!(user.get("username"), Some(&Value::Null));
        assert_eq!(
            serde_json::to_string(&user).unwrap(),
            r#"{"id":"4","username":null,"isAdmin":true}"#
        );
    }

    #[test]
    fn test_reserve_does_not_clear_a_value() {
        let mut user = User::default();
        user.set("email", json!("a@b.c"));
        user.reserve("email");
        assert_eq!(user.get("email"), Some(&json!("a@b.c")));
    }

    #[test]
    fn test_to_record_skips_reserved() {
        let mut user = User::default();
        user.reserve("password");
        user.set("id", json!("9"));
        let record = user.to_record();
        assert_eq!(record.len(), 1);
        assert_eq!(record["id"], "9");
    }
}
