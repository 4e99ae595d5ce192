//! Write-access transfer between uploaders.

use bookshift_parse::Acl;

/// Revoke write access from `old_uploader` and grant it to `new_uploader`,
/// starting from an empty ACL when the record has none. Every other entry is
/// left as it was.
pub fn transfer_write_access(acl: Option<Acl>, old_uploader: &str, new_uploader: &str) -> Acl {
    let mut acl = acl.unwrap_or_default();
    acl.set_write_access(old_uploader, false);
    acl.set_write_access(new_uploader, true);
    acl
}

/// Whether `acl` already reflects a completed transfer.
pub fn write_access_transferred(acl: Option<&Acl>, old_uploader: &str, new_uploader: &str) -> bool {
    acl.is_some_and(|acl| !acl.write_access(old_uploader) && acl.write_access(new_uploader))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_from_missing_acl() {
        let acl = transfer_write_access(None, "old", "new");
        assert!(!acl.write_access("old"));
        assert!(acl.write_access("new"));
        assert_eq!(serde_json::to_value(&acl).unwrap(), json!({"new": {"write": true}}));
    }

    #[test]
    fn test_other_entries_untouched() {
        let before: Acl = serde_json::from_value(json!({
            "*": {"read": true},
            "old": {"read": true, "write": true},
            "editor": {"write": true}
        }))
        .unwrap();

        let after = transfer_write_access(Some(before), "old", "new");
        assert_eq!(
            serde_json::to_value(&after).unwrap(),
            json!({
                "*": {"read": true},
                "old": {"read": true},
                "editor": {"write": true},
                "new": {"write": true}
            })
        );
    }

    #[test]
    fn test_transfer_is_idempotent() {
        let once = transfer_write_access(None, "old", "new");
        let twice = transfer_write_access(Some(once.clone()), "old", "new");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_transferred_check() {
        assert!(!write_access_transferred(None, "old", "new"));
        let acl = transfer_write_access(None, "old", "new");
        assert!(write_access_transferred(Some(&acl), "old", "new"));
        assert!(!write_access_transferred(Some(&acl), "new", "old"));
    }
}
