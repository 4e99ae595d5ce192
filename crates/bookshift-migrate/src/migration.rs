//! Named migrations with dry-run support.
//!
//! Every data migration implements [`Migration`], so the CLI can list, preview
//! and apply them uniformly:
//! - `transfer-ownership`: move books to a new uploader (see [`crate::engine`])
//! - `repair-acl`: fix write access on already transferred books

use async_trait::async_trait;
use bookshift_parse::{MasterKey, RecordStore};

use crate::engine::{OwnershipTransfer, UrlOutcome};
use crate::error::MigrateError;
use crate::repair::AclRepair;

/// Preview of what a migration would change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationPreview {
    /// Number of records that would be updated.
    pub records_to_update: usize,
    /// Human-readable descriptions of changes.
    pub changes: Vec<String>,
}

/// Result of applying a migration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationResult {
    pub records_processed: usize,
    pub base_urls_rewritten: usize,
    pub base_urls_unmatched: usize,
}

/// A migration that can be applied to the store.
#[async_trait]
pub trait Migration: Send + Sync {
    /// Unique name for this migration.
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Check if this migration needs to be applied.
    async fn needs_migration(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<bool, MigrateError>;

    /// Preview what would change (dry-run).
    async fn preview(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<MigrationPreview, MigrateError>;

    /// Apply the migration.
    async fn apply(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<MigrationResult, MigrateError>;
}

// =============================================================================
// Migration: Transfer Ownership
// =============================================================================

struct TransferOwnership(OwnershipTransfer);

#[async_trait]
impl Migration for TransferOwnership {
    fn name(&self) -> &'static str {
        "transfer-ownership"
    }

    fn description(&self) -> &'static str {
        "Move books to the new uploader, rewriting base URLs and write access"
    }

    async fn needs_migration(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<bool, MigrateError> {
        self.0.is_pending(store, master_key).await
    }

    async fn preview(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<MigrationPreview, MigrateError> {
        let plan = self.0.plan(store, master_key).await?;
        let changes = plan
            .transfers
            .iter()
            .map(|transfer| match &transfer.base_url {
                UrlOutcome::Rewritten { from, to } => format!(
                    "Book {}: transfer to {}, baseUrl {} -> {}",
                    transfer.object_id,
                    self.0.new_uploader(),
                    from,
                    to
                ),
                UrlOutcome::Unmatched => format!(
                    "Book {}: transfer to {}, baseUrl unchanged (no token match)",
                    transfer.object_id,
                    self.0.new_uploader()
                ),
                UrlOutcome::Untouched => format!(
                    "Book {}: transfer to {}",
                    transfer.object_id,
                    self.0.new_uploader()
                ),
            })
            .collect();

        Ok(MigrationPreview {
            records_to_update: plan.records_processed,
            changes,
        })
    }

    async fn apply(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<MigrationResult, MigrateError> {
        let report = self.0.run(store, master_key).await?;
        Ok(MigrationResult {
            records_processed: report.records_processed,
            base_urls_rewritten: report.base_urls_rewritten,
            base_urls_unmatched: report.base_urls_unmatched,
        })
    }
}

// =============================================================================
// Migration: Repair ACL
// =============================================================================

struct RepairAcl(AclRepair);

#[async_trait]
impl Migration for RepairAcl {
    fn name(&self) -> &'static str {
        "repair-acl"
    }

    fn description(&self) -> &'static str {
        "Revoke the old uploader's write access on books already transferred"
    }

    async fn needs_migration(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<bool, MigrateError> {
        Ok(!self.0.pending(store, master_key).await?.is_empty())
    }

    async fn preview(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<MigrationPreview, MigrateError> {
        let pending = self.0.pending(store, master_key).await?;
        Ok(MigrationPreview {
            records_to_update: pending.len(),
            changes: pending
                .into_iter()
                .map(|id| format!("Book {}: reassert write access", id))
                .collect(),
        })
    }

    async fn apply(
        &self,
        store: &dyn RecordStore,
        master_key: &MasterKey,
    ) -> Result<MigrationResult, MigrateError> {
        let repaired = self.0.run(store, master_key).await?;
        Ok(MigrationResult {
            records_processed: repaired,
            ..MigrationResult::default()
        })
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Get all available migrations for one pair of uploaders.
pub fn available_migrations(
    old_uploader: &str,
    new_uploader: &str,
    rewrite_base_url: bool,
) -> Vec<Box<dyn Migration>> {
    vec![
        Box::new(TransferOwnership(
            OwnershipTransfer::new(old_uploader, new_uploader).rewrite_base_url(rewrite_base_url),
        )),
        Box::new(RepairAcl(AclRepair::new(old_uploader, new_uploader))),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshift_parse::{Book, MemoryStore, User};
    use pretty_assertions::assert_eq;
    use serde_json::Value;

    async fn store_with_users() -> (MemoryStore, MasterKey) {
        let key = MasterKey::new("master");
        let store = MemoryStore::new(key.clone());
        for (id, email) in [("old", "old@example.com"), ("new", "new@example.com")] {
            store
                .insert_user(User {
                    object_id: id.to_string(),
                    email: Some(email.to_string()),
                    username: None,
                })
                .await;
        }
        (store, key)
    }

    fn find<'a>(migrations: &'a [Box<dyn Migration>], name: &str) -> &'a dyn Migration {
        migrations
            .iter()
            .find(|m| m.name() == name)
            .map(|m| m.as_ref())
            .unwrap()
    }

    #[test]
    fn test_registry_names() {
        let names: Vec<_> = available_migrations("old", "new", true)
            .iter()
            .map(|m| m.name())
            .collect();
        assert_eq!(names, vec!["transfer-ownership", "repair-acl"]);
    }

    #[tokio::test]
    async fn test_transfer_preview_saves_nothing() {
        let (store, key) = store_with_users().await;
        let mut book = Book::new("b1", "old");
        book.base_url = Some(Value::from("https://x/u/old%40example.com/file"));
        store.insert_book(book).await;
        store.insert_book(Book::new("b2", "old")).await;

        let migrations = available_migrations("old", "new", true);
        let transfer = find(&migrations, "transfer-ownership");

        assert!(transfer.needs_migration(&store, &key).await.unwrap());
        let preview = transfer.preview(&store, &key).await.unwrap();
        assert_eq!(preview.records_to_update, 2);
        assert_eq!(
            preview.changes,
            vec![
                "Book b1: transfer to new, baseUrl https://x/u/old%40example.com/file -> https://x/u/new%40example.com/file",
                "Book b2: transfer to new",
            ]
        );
        assert!(store.saves().await.is_empty());
    }

    #[tokio::test]
    async fn test_transfer_then_repair_has_nothing_pending() {
        let (store, key) = store_with_users().await;
        store.insert_book(Book::new("b1", "old")).await;

        let migrations = available_migrations("old", "new", true);
        let transfer = find(&migrations, "transfer-ownership");
        let repair = find(&migrations, "repair-acl");

        let result = transfer.apply(&store, &key).await.unwrap();
        assert_eq!(result.records_processed, 1);
        assert!(!transfer.needs_migration(&store, &key).await.unwrap());
        assert!(!repair.needs_migration(&store, &key).await.unwrap());
        assert_eq!(repair.preview(&store, &key).await.unwrap().records_to_update, 0);
    }
}
