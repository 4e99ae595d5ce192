//! Record selection: equality queries and a pull-based cursor over them.

use std::collections::VecDeque;

use bookshift_parse::{
    BOOK_CLASS, Book, DEFAULT_PAGE_SIZE, ParseError, Pointer, Privilege, Query, RecordStore,
    UPDATE_SOURCE_FIELD, UPLOADER_FIELD,
};
use tracing::debug;

/// Books uploaded by `uploader_id`, optionally restricted to a given
/// `updateSource` marker.
pub fn uploader_query(uploader_id: &str, update_source: Option<&str>) -> Query {
    let query = Query::new(BOOK_CLASS).equal_to(UPLOADER_FIELD, Pointer::user(uploader_id));
    match update_source {
        Some(marker) => query.equal_to(UPDATE_SOURCE_FIELD, marker),
        None => query,
    }
}

/// Lazily iterates the objects matching a query.
///
/// Pages are fetched on demand in ascending `objectId` order, each page
/// starting after the last id seen. Keying on ids rather than offsets means a
/// record that stops matching after being saved never shifts later records
/// out of view. Dropping the cursor stops all further fetches.
pub struct RecordCursor<'a, S: ?Sized> {
    store: &'a S,
    query: Query,
    privilege: Privilege<'a>,
    page_size: u32,
    buffered: VecDeque<Book>,
    last_seen: Option<String>,
    exhausted: bool,
}

impl<'a, S> RecordCursor<'a, S>
where
    S: RecordStore + ?Sized,
{
    pub fn new(store: &'a S, query: Query, privilege: Privilege<'a>) -> Self {
        Self {
            store,
            query,
            privilege,
            page_size: DEFAULT_PAGE_SIZE,
            buffered: VecDeque::new(),
            last_seen: None,
            exhausted: false,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The next matching record, or `None` once the selection is exhausted.
    pub async fn next(&mut self) -> Result<Option<Book>, ParseError> {
        if self.buffered.is_empty() && !self.exhausted {
            self.fetch_page().await?;
        }

        let book = self.buffered.pop_front();
        if let Some(ref book) = book {
            self.last_seen = Some(book.object_id.clone());
        }
        Ok(book)
    }

    async fn fetch_page(&mut self) -> Result<(), ParseError> {
        let page = self
            .store
            .find(
                &self.query,
                self.last_seen.as_deref(),
                self.page_size,
                self.privilege,
            )
            .await?;

        debug!(
            class = %self.query.class_name(),
            count = page.len(),
            after = ?self.last_seen,
            "fetched selection page"
        );

        if (page.len() as u32) < self.page_size {
            self.exhausted = true;
        }
        self.buffered.extend(page);
        Ok(())
    }
}

/// Select every record matching `query`.
pub fn select<'a, S>(store: &'a S, query: Query, privilege: Privilege<'a>) -> RecordCursor<'a, S>
where
    S: RecordStore + ?Sized,
{
    RecordCursor::new(store, query, privilege)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookshift_parse::{BULK_UPDATE_SOURCE, MasterKey, MemoryStore};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn seeded(count: usize) -> (MemoryStore, MasterKey) {
        let key = MasterKey::new("master");
        let store = MemoryStore::new(key.clone());
        for i in 0..count {
            store.insert_book(Book::new(format!("b{:03}", i), "old")).await;
        }
        store.insert_book(Book::new("zzz", "other")).await;
        (store, key)
    }

    async fn drain<S: RecordStore + ?Sized>(cursor: &mut RecordCursor<'_, S>) -> Vec<String> {
        let mut ids = Vec::new();
        while let Some(book) = cursor.next().await.unwrap() {
            ids.push(book.object_id);
        }
        ids
    }

    #[test]
    fn test_uploader_query_shape() {
        let query = uploader_query("u1", Some(BULK_UPDATE_SOURCE));
        assert_eq!(
            query.where_clause(None),
            json!({
                "uploader": {"__type": "Pointer", "className": "_User", "objectId": "u1"},
                "updateSource": "bulkUpdateScript"
            })
        );
        assert_eq!(uploader_query("u1", None).constraints().count(), 1);
    }

    #[tokio::test]
    async fn test_cursor_spans_pages() {
        let (store, key) = seeded(7).await;
        let mut cursor =
            select(&store, uploader_query("old", None), key.elevated()).with_page_size(3);

        let ids = drain(&mut cursor).await;
        assert_eq!(ids.len(), 7);
        assert_eq!(ids.first().map(String::as_str), Some("b000"));
        assert_eq!(ids.last().map(String::as_str), Some("b006"));
        // 3 + 3 + 1: the short page ends the selection
        assert_eq!(store.find_calls().await, 3);
    }

    #[tokio::test]
    async fn test_exact_page_multiple_needs_one_empty_fetch() {
        let (store, key) = seeded(4).await;
        let mut cursor =
            select(&store, uploader_query("old", None), key.elevated()).with_page_size(2);

        assert_eq!(drain(&mut cursor).await.len(), 4);
        assert_eq!(store.find_calls().await, 3);
        assert!(cursor.next().await.unwrap().is_none());
        assert_eq!(store.find_calls().await, 3);
    }

    #[tokio::test]
    async fn test_saving_out_of_selection_skips_nothing() {
        let (store, key) = seeded(5).await;
        let mut cursor =
            select(&store, uploader_query("old", None), key.elevated()).with_page_size(2);

        let mut seen = Vec::new();
        while let Some(mut book) = cursor.next().await.unwrap() {
            book.uploader = Some(Pointer::user("new"));
            store.save(BOOK_CLASS, &book, key.elevated()).await.unwrap();
            seen.push(book.object_id);
        }

        assert_eq!(seen, vec!["b000", "b001", "b002", "b003", "b004"]);
    }

    #[tokio::test]
    async fn test_empty_selection() {
        let (store, key) = seeded(0).await;
        let mut cursor = select(&store, uploader_query("old", None), key.elevated());
        assert!(cursor.next().await.unwrap().is_none());
        assert_eq!(store.find_calls().await, 1);
    }
}
