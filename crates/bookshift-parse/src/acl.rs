//! Parse access-control lists.
//!
//! Parse stores only granted bits: `{"<userId>": {"read": true, "write": true}}`.
//! Revoking a bit removes it, and an entry left without bits is removed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::PUBLIC_ACL_KEY;

/// Permission bits for one ACL key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AclEntry {
    #[serde(default, skip_serializing_if = "is_false")]
    pub read: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub write: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl AclEntry {
    fn is_empty(&self) -> bool {
        !self.read && !self.write
    }
}

/// An access-control list keyed by user id or `*`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl(BTreeMap<String, AclEntry>);

impl Acl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `key` may write.
    pub fn write_access(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|e| e.write)
    }

    /// Whether `key` may read.
    pub fn read_access(&self, key: &str) -> bool {
        self.0.get(key).is_some_and(|e| e.read)
    }

    pub fn public_read_access(&self) -> bool {
        self.read_access(PUBLIC_ACL_KEY)
    }

    pub fn set_write_access(&mut self, key: &str, allowed: bool) {
        self.update(key, |e| e.write = allowed);
    }

    pub fn set_read_access(&mut self, key: &str, allowed: bool) {
        self.update(key, |e| e.read = allowed);
    }

    pub fn set_public_read_access(&mut self, allowed: bool) {
        self.set_read_access(PUBLIC_ACL_KEY, allowed);
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &AclEntry)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn update(&mut self, key: &str, f: impl FnOnce(&mut AclEntry)) {
        let mut entry = self.0.get(key).copied().unwrap_or_default();
        f(&mut entry);
        if entry.is_empty() {
            self.0.remove(key);
        } else {
            self.0.insert(key.to_string(), entry);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_grant_and_revoke_write() {
        let mut acl = Acl::new();
        acl.set_write_access("u1", true);
        assert!(acl.write_access("u1"));
        assert!(!acl.read_access("u1"));

        acl.set_write_access("u1", false);
        assert!(!acl.write_access("u1"));
        assert!(acl.is_empty());
    }

    #[test]
    fn test_revoke_keeps_other_bits() {
        let mut acl: Acl = serde_json::from_value(json!({
            "u1": {"read": true, "write": true}
        }))
        .unwrap();

        acl.set_write_access("u1", false);
        assert!(acl.read_access("u1"));
        assert_eq!(serde_json::to_value(&acl).unwrap(), json!({"u1": {"read": true}}));
    }

    #[test]
    fn test_revoking_absent_key_is_noop() {
        let mut acl = Acl::new();
        acl.set_public_read_access(true);
        let before = acl.clone();
        acl.set_write_access("nobody", false);
        assert_eq!(acl, before);
    }

    #[test]
    fn test_wire_format() {
        let mut acl = Acl::new();
        acl.set_public_read_access(true);
        acl.set_write_access("u2", true);

        assert_eq!(
            serde_json::to_value(&acl).unwrap(),
            json!({"*": {"read": true}, "u2": {"write": true}})
        );
        assert!(acl.public_read_access());
        assert_eq!(acl.entries().count(), 2);
    }

    #[test]
    fn test_explicit_false_bits_deserialize() {
        let acl: Acl = serde_json::from_value(json!({"u1": {"read": true, "write": false}})).unwrap();
        assert!(!acl.write_access("u1"));
        assert_eq!(serde_json::to_value(&acl).unwrap(), json!({"u1": {"read": true}}));
    }
}
