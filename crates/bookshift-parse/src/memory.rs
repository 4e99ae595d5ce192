//! In-process record store.
//!
//! Implements [`RecordStore`] over ordered maps with the same query, ordering,
//! and privilege rules as the REST client:
//!
//! - `find` returns matches in ascending `objectId` order, after the cursor
//! - without elevation, `find` only sees objects with no ACL or public read
//! - `save` and `fetch_user` require the configured master key
//!
//! Every call is counted and every save is logged so callers can assert on
//! exactly which round-trips a migration made.

use std::collections::{BTreeMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    BOOK_CLASS, Book, DEFAULT_PAGE_SIZE, MasterKey, ParseError, Privilege, Query, RecordStore,
    USER_CLASS, User,
};

#[derive(Default)]
struct State {
    books: BTreeMap<String, Book>,
    users: BTreeMap<String, User>,
    saves: Vec<String>,
    find_calls: usize,
    failing_saves: HashSet<String>,
}

/// In-memory implementation of [`RecordStore`].
pub struct MemoryStore {
    master_key: MasterKey,
    state: RwLock<State>,
}

impl MemoryStore {
    /// Create an empty store that accepts `master_key` for elevated calls.
    pub fn new(master_key: MasterKey) -> Self {
        Self {
            master_key,
            state: RwLock::new(State::default()),
        }
    }

    /// Insert or replace a book.
    pub async fn insert_book(&self, book: Book) {
        self.state
            .write()
            .await
            .books
            .insert(book.object_id.clone(), book);
    }

    /// Insert or replace a user.
    pub async fn insert_user(&self, user: User) {
        self.state
            .write()
            .await
            .users
            .insert(user.object_id.clone(), user);
    }

    /// Current state of a book.
    pub async fn book(&self, object_id: &str) -> Option<Book> {
        self.state.read().await.books.get(object_id).cloned()
    }

    /// All books in `objectId` order.
    pub async fn books(&self) -> Vec<Book> {
        self.state.read().await.books.values().cloned().collect()
    }

    /// Object ids of every successful save, in order.
    pub async fn saves(&self) -> Vec<String> {
        self.state.read().await.saves.clone()
    }

    /// Number of `find` round-trips served.
    pub async fn find_calls(&self) -> usize {
        self.state.read().await.find_calls
    }

    /// Make every save of `object_id` fail with a server error.
    pub async fn fail_saves_for(&self, object_id: impl Into<String>) {
        self.state
            .write()
            .await
            .failing_saves
            .insert(object_id.into());
    }

    fn require_elevated(&self, privilege: Privilege<'_>) -> Result<(), ParseError> {
        match privilege.master_key() {
            Some(key) if *key == self.master_key => Ok(()),
            Some(_) => Err(ParseError::Auth("invalid master key".to_string())),
            None => Err(ParseError::Auth("master key required".to_string())),
        }
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn find(
        &self,
        query: &Query,
        after: Option<&str>,
        limit: u32,
        privilege: Privilege<'_>,
    ) -> Result<Vec<Book>, ParseError> {
        let elevated = match privilege {
            Privilege::Standard => false,
            Privilege::Elevated(_) => {
                self.require_elevated(privilege)?;
                true
            }
        };

        let mut state = self.state.write().await;
        state.find_calls += 1;

        if query.class_name() != BOOK_CLASS {
            return Ok(Vec::new());
        }

        let limit = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
        let mut page = Vec::new();
        for (object_id, book) in &state.books {
            if after.is_some_and(|after| object_id.as_str() <= after) {
                continue;
            }
            if !elevated && book.acl.as_ref().is_some_and(|acl| !acl.public_read_access()) {
                continue;
            }
            if query.matches(&serde_json::to_value(book)?) {
                page.push(book.clone());
                if page.len() as u32 >= limit {
                    break;
                }
            }
        }

        debug!(count = page.len(), after = ?after, "memory store page");
        Ok(page)
    }

    async fn fetch_user(
        &self,
        user_id: &str,
        privilege: Privilege<'_>,
    ) -> Result<User, ParseError> {
        self.require_elevated(privilege)?;
        self.state
            .read()
            .await
            .users
            .get(user_id)
            .cloned()
            .ok_or_else(|| ParseError::NotFound {
                class_name: USER_CLASS.to_string(),
                object_id: user_id.to_string(),
            })
    }

    async fn save(
        &self,
        class_name: &str,
        book: &Book,
        privilege: Privilege<'_>,
    ) -> Result<(), ParseError> {
        self.require_elevated(privilege)?;

        let mut state = self.state.write().await;
        if state.failing_saves.contains(&book.object_id) {
            return Err(ParseError::Server {
                code: 1,
                message: format!("injected failure saving {}", book.object_id),
            });
        }

        let not_found = || ParseError::NotFound {
            class_name: class_name.to_string(),
            object_id: book.object_id.clone(),
        };
        if class_name != BOOK_CLASS {
            return Err(not_found());
        }
        let stored = state.books.get_mut(&book.object_id).ok_or_else(not_found)?;

        // Same field subset as the REST body; absent fields are left alone.
        let changes = book.changes();
        if let Some(uploader) = changes.uploader {
            stored.uploader = Some(uploader.clone());
        }
        if let Some(base_url) = changes.base_url {
            stored.base_url = Some(base_url.clone());
        }
        if let Some(update_source) = changes.update_source {
            stored.update_source = Some(update_source.to_string());
        }
        if let Some(acl) = changes.acl {
            stored.acl = Some(acl.clone());
        }

        state.saves.push(book.object_id.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Acl, Pointer};
    use pretty_assertions::assert_eq;

    fn store() -> MemoryStore {
        MemoryStore::new(MasterKey::new("master"))
    }

    fn uploader_query(user_id: &str) -> Query {
        Query::new(BOOK_CLASS).equal_to("uploader", Pointer::user(user_id))
    }

    #[tokio::test]
    async fn test_find_orders_and_pages() {
        let store = store();
        for id in ["b3", "b1", "b2", "b4"] {
            store.insert_book(Book::new(id, "old")).await;
        }
        store.insert_book(Book::new("b0", "someone-else")).await;

        let key = MasterKey::new("master");
        let first = store
            .find(&uploader_query("old"), None, 2, key.elevated())
            .await
            .unwrap();
        let ids: Vec<_> = first.iter().map(|b| b.object_id.as_str()).collect();
        assert_eq!(ids, vec!["b1", "b2"]);

        let second = store
            .find(&uploader_query("old"), Some("b2"), 2, key.elevated())
            .await
            .unwrap();
        let ids: Vec<_> = second.iter().map(|b| b.object_id.as_str()).collect();
        assert_eq!(ids, vec!["b3", "b4"]);
        assert_eq!(store.find_calls().await, 2);
    }

    #[tokio::test]
    async fn test_standard_find_hides_private_books() {
        let store = store();
        let mut private = Book::new("b1", "old");
        let mut acl = Acl::new();
        acl.set_write_access("old", true);
        private.acl = Some(acl);
        store.insert_book(private).await;
        store.insert_book(Book::new("b2", "old")).await;

        let visible = store
            .find(&uploader_query("old"), None, 100, Privilege::Standard)
            .await
            .unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].object_id, "b2");
    }

    #[tokio::test]
    async fn test_save_requires_master_key() {
        let store = store();
        store.insert_book(Book::new("b1", "old")).await;

        let result = store
            .save(BOOK_CLASS, &Book::new("b1", "new"), Privilege::Standard)
            .await;
        assert!(matches!(result, Err(ParseError::Auth(_))));

        let wrong = MasterKey::new("wrong");
        let result = store
            .save(BOOK_CLASS, &Book::new("b1", "new"), wrong.elevated())
            .await;
        assert!(matches!(result, Err(ParseError::Auth(_))));
        assert!(store.saves().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_keeps_untouched_fields() {
        let store = store();
        let mut book = Book::new("b1", "old");
        book.extra
            .insert("title".to_string(), serde_json::json!("Moby Dick"));
        store.insert_book(book).await;

        let key = MasterKey::new("master");
        let mut update = Book::new("b1", "new");
        update.update_source = Some("bulkUpdateScript".to_string());
        store.save(BOOK_CLASS, &update, key.elevated()).await.unwrap();

        let stored = store.book("b1").await.unwrap();
        assert!(stored.uploader.unwrap().is_user("new"));
        assert_eq!(stored.extra["title"], "Moby Dick");
        assert_eq!(store.saves().await, vec!["b1".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_user_not_found() {
        let store = store();
        let key = MasterKey::new("master");
        let result = store.fetch_user("nobody", key.elevated()).await;
        assert!(matches!(result, Err(ParseError::NotFound { .. })));
    }
}
