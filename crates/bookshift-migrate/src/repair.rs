//! ACL repair for books that were already transferred.
//!
//! Books moved by a transfer that predates ACL handling still grant write
//! access to the old uploader. This pass walks every book the bulk update
//! marked as belonging to the new uploader and reasserts the write bits.

use bookshift_parse::{BOOK_CLASS, BULK_UPDATE_SOURCE, MasterKey, RecordStore};
use tracing::info;

use crate::access::{transfer_write_access, write_access_transferred};
use crate::error::MigrateError;
use crate::selector::{select, uploader_query};

/// Reasserts write access on books already transferred to a new uploader.
#[derive(Debug, Clone)]
pub struct AclRepair {
    old_uploader: String,
    new_uploader: String,
}

impl AclRepair {
    pub fn new(old_uploader: impl Into<String>, new_uploader: impl Into<String>) -> Self {
        Self {
            old_uploader: old_uploader.into(),
            new_uploader: new_uploader.into(),
        }
    }

    /// Save every marked book with corrected write access.
    ///
    /// Returns the number of books visited, whether or not their ACL needed
    /// changing, so repeated runs report the same count.
    pub async fn run<S>(&self, store: &S, master_key: &MasterKey) -> Result<usize, MigrateError>
    where
        S: RecordStore + ?Sized,
    {
        info!(
            old_uploader = %self.old_uploader,
            new_uploader = %self.new_uploader,
            "starting ACL repair"
        );

        let mut repaired = 0;
        let mut books = select(
            store,
            uploader_query(&self.new_uploader, Some(BULK_UPDATE_SOURCE)),
            master_key.elevated(),
        );

        while let Some(mut book) = books.next().await? {
            book.acl = Some(transfer_write_access(
                book.acl.take(),
                &self.old_uploader,
                &self.new_uploader,
            ));
            store.save(BOOK_CLASS, &book, master_key.elevated()).await?;
            info!(object_id = %book.object_id, "repaired ACL");
            repaired += 1;
        }

        info!(records = repaired, "ACL repair complete");
        Ok(repaired)
    }

    /// Ids of marked books whose ACL does not yet reflect the transfer.
    pub async fn pending<S>(
        &self,
        store: &S,
        master_key: &MasterKey,
    ) -> Result<Vec<String>, MigrateError>
    where
        S: RecordStore + ?Sized,
    {
        let mut pending = Vec::new();
        let mut books = select(
            store,
            uploader_query(&self.new_uploader, Some(BULK_UPDATE_SOURCE)),
            master_key.elevated(),
        );

        while let Some(book) = books.next().await? {
            if !write_access_transferred(book.acl.as_ref(), &self.old_uploader, &self.new_uploader)
            {
                pending.push(book.object_id);
            }
        }
        Ok(pending)
    }
}

/// Repair write access on every book transferred from `old_uploader` to
/// `new_uploader`, returning the number of books visited.
pub async fn repair_acl<S>(
    store: &S,
    master_key: &MasterKey,
    old_uploader: &str,
    new_uploader: &str,
) -> Result<usize, MigrateError>
where
    S: RecordStore + ?Sized,
{
    AclRepair::new(old_uploader, new_uploader)
        .run(store, master_key)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshift_parse::{Acl, Book, MemoryStore};
    use pretty_assertions::assert_eq;

    fn marked(id: &str, acl: Option<Acl>) -> Book {
        let mut book = Book::new(id, "new");
        book.update_source = Some(BULK_UPDATE_SOURCE.to_string());
        book.acl = acl;
        book
    }

    #[tokio::test]
    async fn test_only_marked_books_of_new_uploader() {
        let key = MasterKey::new("master");
        let store = MemoryStore::new(key.clone());
        store.insert_book(marked("b1", None)).await;
        store.insert_book(Book::new("b2", "new")).await;
        store.insert_book(Book::new("b3", "old")).await;

        let count = repair_acl(&store, &key, "old", "new").await.unwrap();
        assert_eq!(count, 1);
        assert_eq!(store.saves().await, vec!["b1".to_string()]);
        assert!(store.book("b2").await.unwrap().acl.is_none());
    }

    #[tokio::test]
    async fn test_pending_lists_unrepaired_books() {
        let key = MasterKey::new("master");
        let store = MemoryStore::new(key.clone());
        let mut stale = Acl::new();
        stale.set_write_access("old", true);
        store.insert_book(marked("b1", Some(stale))).await;
        store
            .insert_book(marked(
                "b2",
                Some(transfer_write_access(None, "old", "new")),
            ))
            .await;

        let repair = AclRepair::new("old", "new");
        assert_eq!(repair.pending(&store, &key).await.unwrap(), vec!["b1"]);

        repair.run(&store, &key).await.unwrap();
        assert!(repair.pending(&store, &key).await.unwrap().is_empty());
    }
}
