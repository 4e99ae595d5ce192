//! Property-based tests for ACLs and query matching.

use std::collections::BTreeMap;

use bookshift_parse::{Acl, Book, Pointer, Query};
use proptest::prelude::*;
use serde_json::Value;

#[derive(Debug, Clone)]
enum AclOp {
    Read(String, bool),
    Write(String, bool),
}

fn acl_key() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("*".to_string()),
        "[a-zA-Z0-9]{1,10}".prop_map(|s| s.to_string()),
    ]
}

fn acl_op() -> impl Strategy<Value = AclOp> {
    prop_oneof![
        (acl_key(), any::<bool>()).prop_map(|(k, v)| AclOp::Read(k, v)),
        (acl_key(), any::<bool>()).prop_map(|(k, v)| AclOp::Write(k, v)),
    ]
}

proptest! {
    #[test]
    fn acl_matches_model_and_stores_only_granted_bits(
        ops in prop::collection::vec(acl_op(), 0..20),
    ) {
        let mut acl = Acl::new();
        let mut model: BTreeMap<String, (bool, bool)> = BTreeMap::new();

        for op in &ops {
            match op {
                AclOp::Read(key, allowed) => {
                    acl.set_read_access(key, *allowed);
                    model.entry(key.clone()).or_default().0 = *allowed;
                }
                AclOp::Write(key, allowed) => {
                    acl.set_write_access(key, *allowed);
                    model.entry(key.clone()).or_default().1 = *allowed;
                }
            }
        }

        for (key, (read, write)) in &model {
            prop_assert_eq!(acl.read_access(key), *read);
            prop_assert_eq!(acl.write_access(key), *write);
        }

        let json = serde_json::to_value(&acl).unwrap();
        for (_, entry) in json.as_object().unwrap() {
            let bits = entry.as_object().unwrap();
            prop_assert!(!bits.is_empty());
            prop_assert!(bits.values().all(|v| *v == Value::Bool(true)));
        }

        let decoded: Acl = serde_json::from_value(json).unwrap();
        prop_assert_eq!(decoded, acl);
    }

    #[test]
    fn uploader_query_matches_only_that_uploader(
        owner in "[a-zA-Z0-9]{10}",
        other in "[a-zA-Z0-9]{10}",
    ) {
        prop_assume!(owner != other);
        let query = Query::new("books").equal_to("uploader", Pointer::user(owner.clone()));

        let mine = serde_json::to_value(Book::new("b1", &owner)).unwrap();
        let theirs = serde_json::to_value(Book::new("b2", &other)).unwrap();

        prop_assert!(query.matches(&mine));
        prop_assert!(!query.matches(&theirs));
    }
}
