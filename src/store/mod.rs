//! In-memory mock dataset
//!
//! Users are kept as ordered JSON objects so that whatever a caller sends is
//! stored as-is, key order included. Nothing here validates a record.

mod seed;
mod user;

pub use seed::{builtin_users, load_seed_file, MockSecrets, SeedError};
pub use user::User;

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A JSON object. Keys keep insertion order.
pub type Record = serde_json::Map<String, Value>;

/// Store handle shared between connection tasks
pub type SharedStore = Arc<RwLock<UserStore>>;

/// Current time as an ISO-8601 string with millisecond precision (`2024-01-01T00:00:00.000Z`)
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Process-lifetime user store
#[derive(Debug, Clone)]
pub struct UserStore {
    users: Vec<User>,
    seed: Vec<Record>,
    secrets: MockSecrets,
}

impl UserStore {
    /// Build a store from seed records; `createdAt` is stamped where missing
    pub fn new(seed: Vec<Record>, secrets: MockSecrets) -> Self {
        let mut store = Self {
            users: Vec::with_capacity(seed.len()),
            seed,
            secrets,
        };
        store.reset();
        store
    }

    /// Store holding the three built-in demo users
    pub fn seeded() -> Self {
        Self::new(builtin_users(), MockSecrets::default())
    }

    /// Drop every change and reload the seed records
    pub fn reset(&mut self) {
        let created_at = timestamp_now();
        self.users = self
            .seed
            .iter()
            .cloned()
            .map(|mut record| {
                record
                    .entry("createdAt")
                    .or_insert_with(|| Value::String(created_at.clone()));
                User::from(record)
            })
            .collect();
    }

    pub fn all(&self) -> &[User] {
        &self.users
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Index of the first user whose `id` is the string `id`
    pub fn position(&self, id: &str) -> Option<usize> {
        self.users
            .iter()
            .position(|user| user.get("id").and_then(Value::as_str) == Some(id))
    }

    pub fn find(&self, id: &str) -> Option<&User> {
        self.position(id).map(|idx| &self.users[idx])
    }

    /// Append a user and return the stored copy
    pub fn push(&mut self, user: User) -> &User {
        self.users.push(user);
        &self.users[self.users.len() - 1]
    }

    /// Shallow-merge `patch` into the user at `index`.
    ///
    /// Existing keys keep their position and take the patched value, new keys
    /// are appended. Returns `None` when `index` is out of range.
    pub fn merge(&mut self, index: usize, patch: Record) -> Option<&User> {
        let user = self.users.get_mut(index)?;
        for (key, value) in patch {
            user.set(key, value);
        }
        Some(&*user)
    }

    pub const fn secrets(&self) -> &MockSecrets {
        &self.secrets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn test_seeded_users_are_stamped() {
        let store = UserStore::seeded();
        assert_eq!(store.len(), 3);
        for user in store.all() {
            let created = user.get("createdAt").and_then(Value::as_str).unwrap();
            assert!(created.ends_with('Z'), "unexpected timestamp {created}");
        }
        let keys: Vec<&str> = store.all()[0].keys().collect();
        assert_eq!(
            keys,
            [
                "id",
                "username",
                "password",
                "email",
                "isAdmin",
                "ssn",
                "creditCard",
                "createdAt"
            ]
        );
    }

    #[test]
    fn test_find_matches_string_ids_only() {
        let mut store = UserStore::seeded();
        assert_eq!(store.find("2").unwrap().get("username").unwrap(), "john_doe");
        assert!(store.find("99").is_none());

        store.push(User::from(record(json!({"id": 7, "username": "numeric"}))));
        assert!(store.find("7").is_none());
    }

    #[test]
    fn test_merge_keeps_key_positions() {
        let mut store = UserStore::seeded();
        let merged = store
            .merge(1, record(json!({"email": "x@y.z", "role": "owner"})))
            .unwrap();
        let keys: Vec<&str> = merged.keys().collect();
        assert_eq!(keys[3], "email");
        assert_eq!(keys.last(), Some(&"role"));
        assert_eq!(merged.get("email").unwrap(), "x@y.z");
        assert_eq!(merged.get("password").unwrap(), "password123");

        assert!(store.merge(10, Record::new()).is_none());
    }

    #[test]
    fn test_reset_discards_changes() {
        let mut store = UserStore::seeded();
        store.push(User::from(record(json!({"id": "4", "username": "mallory"}))));
        store.merge(0, record(json!({"isAdmin": false})));
        store.reset();
        assert_eq!(store.len(), 3);
        assert_eq!(store.all()[0].get("isAdmin").unwrap(), true);
    }
}
