//! Ownership transfer: reassign books from one uploader to another.
//!
//! For every book whose `uploader` is the old user, in the store's order:
//!
//! 1. the `baseUrl` is rewritten when it embeds the old uploader's encoded
//!    display token (see [`crate::rewrite`]);
//! 2. `uploader` and `updateSource` are set;
//! 3. write access moves from the old uploader to the new one;
//! 4. the book is saved with the master key.
//!
//! Any failure aborts the run at the current book. Books already saved stay
//! migrated and no longer match the selection, so re-running the transfer
//! picks up exactly where the failed run stopped.

use bookshift_parse::{
    BOOK_CLASS, BULK_UPDATE_SOURCE, Book, MasterKey, Pointer, RecordStore,
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::access::transfer_write_access;
use crate::error::{MigrateError, Role};
use crate::resolver::resolve_display_token;
use crate::rewrite::{BaseUrlChange, TokenRewrite};
use crate::selector::{select, uploader_query};

/// What happened to a book's base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlOutcome {
    /// No textual base URL, or rewriting is disabled.
    Untouched,
    /// The base URL does not mention the old uploader.
    Unmatched,
    Rewritten { from: String, to: String },
}

/// The change made (or, in a dry run, planned) for one book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookTransfer {
    pub object_id: String,
    pub base_url: UrlOutcome,
}

/// Totals for one transfer run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferReport {
    pub records_processed: usize,
    pub base_urls_rewritten: usize,
    pub base_urls_unmatched: usize,
    /// Per-book changes, in processing order.
    pub transfers: Vec<BookTransfer>,
}

impl TransferReport {
    fn record(&mut self, transfer: BookTransfer) {
        self.records_processed += 1;
        match transfer.base_url {
            UrlOutcome::Rewritten { .. } => self.base_urls_rewritten += 1,
            UrlOutcome::Unmatched => self.base_urls_unmatched += 1,
            UrlOutcome::Untouched => {}
        }
        self.transfers.push(transfer);
    }
}

/// Moves every book of one uploader to another.
#[derive(Debug, Clone)]
pub struct OwnershipTransfer {
    old_uploader: String,
    new_uploader: String,
    rewrite_base_url: bool,
}

impl OwnershipTransfer {
    /// A transfer that also rewrites base URLs.
    pub fn new(old_uploader: impl Into<String>, new_uploader: impl Into<String>) -> Self {
        Self {
            old_uploader: old_uploader.into(),
            new_uploader: new_uploader.into(),
            rewrite_base_url: true,
        }
    }

    /// Enable or disable base URL rewriting. Without it, identities are not
    /// resolved and `baseUrl` is never read or written.
    pub fn rewrite_base_url(mut self, enabled: bool) -> Self {
        self.rewrite_base_url = enabled;
        self
    }

    pub fn new_uploader(&self) -> &str {
        &self.new_uploader
    }

    /// Whether any book still belongs to the old uploader.
    pub async fn is_pending<S>(&self, store: &S, master_key: &MasterKey) -> Result<bool, MigrateError>
    where
        S: RecordStore + ?Sized,
    {
        let query = uploader_query(&self.old_uploader, None);
        let page = store.find(&query, None, 1, master_key.elevated()).await?;
        Ok(!page.is_empty())
    }

    /// Migrate every matching book and save it.
    pub async fn run<S>(&self, store: &S, master_key: &MasterKey) -> Result<TransferReport, MigrateError>
    where
        S: RecordStore + ?Sized,
    {
        self.process(store, master_key, true).await
    }

    /// Compute every change without saving anything.
    ///
    /// Validation failures abort exactly as they would during [`Self::run`].
    pub async fn plan<S>(&self, store: &S, master_key: &MasterKey) -> Result<TransferReport, MigrateError>
    where
        S: RecordStore + ?Sized,
    {
        self.process(store, master_key, false).await
    }

    async fn process<S>(
        &self,
        store: &S,
        master_key: &MasterKey,
        persist: bool,
    ) -> Result<TransferReport, MigrateError>
    where
        S: RecordStore + ?Sized,
    {
        let rewrite = self.token_rewrite(store, master_key).await?;

        info!(
            old_uploader = %self.old_uploader,
            new_uploader = %self.new_uploader,
            rewrite_base_url = rewrite.is_some(),
            dry_run = !persist,
            "starting ownership transfer"
        );

        let mut report = TransferReport::default();
        let mut books = select(
            store,
            uploader_query(&self.old_uploader, None),
            master_key.elevated(),
        );

        while let Some(mut book) = books.next().await? {
            let base_url = self.transform(&mut book, rewrite.as_ref())?;

            if persist {
                store.save(BOOK_CLASS, &book, master_key.elevated()).await?;
                info!(object_id = %book.object_id, "transferred book");
            } else {
                debug!(object_id = %book.object_id, "planned book transfer");
            }

            report.record(BookTransfer {
                object_id: book.object_id,
                base_url,
            });
        }

        info!(
            records = report.records_processed,
            base_urls_rewritten = report.base_urls_rewritten,
            base_urls_unmatched = report.base_urls_unmatched,
            "ownership transfer complete"
        );
        Ok(report)
    }

    /// Resolve both display tokens, before any book is read.
    async fn token_rewrite<S>(
        &self,
        store: &S,
        master_key: &MasterKey,
    ) -> Result<Option<TokenRewrite>, MigrateError>
    where
        S: RecordStore + ?Sized,
    {
        if !self.rewrite_base_url {
            return Ok(None);
        }

        let old_token = resolve_display_token(store, master_key, &self.old_uploader)
            .await
            .map_err(|source| MigrateError::MissingDisplayToken {
                role: Role::OldUploader,
                user_id: self.old_uploader.clone(),
                source,
            })?;
        let new_token = resolve_display_token(store, master_key, &self.new_uploader)
            .await
            .map_err(|source| MigrateError::MissingDisplayToken {
                role: Role::NewUploader,
                user_id: self.new_uploader.clone(),
                source,
            })?;

        Ok(Some(TokenRewrite::new(old_token, new_token)))
    }

    /// Apply the transfer to one book in memory.
    ///
    /// The base URL is validated first, so a rejected book is left exactly as
    /// it was fetched.
    fn transform(
        &self,
        book: &mut Book,
        rewrite: Option<&TokenRewrite>,
    ) -> Result<UrlOutcome, MigrateError> {
        let outcome = match (rewrite, book.base_url_str()) {
            (Some(rewrite), Some(base_url)) => match rewrite
                .apply(base_url)
                .map_err(|e| MigrateError::rewrite(&book.object_id, e))?
            {
                BaseUrlChange::Rewritten(updated) => UrlOutcome::Rewritten {
                    from: base_url.to_string(),
                    to: updated,
                },
                BaseUrlChange::Unmatched => {
                    warn!(
                        object_id = %book.object_id,
                        base_url,
                        token = rewrite.old_encoded(),
                        "base URL does not contain the old uploader's token, leaving it unchanged"
                    );
                    UrlOutcome::Unmatched
                }
            },
            _ => UrlOutcome::Untouched,
        };

        if let UrlOutcome::Rewritten { ref from, ref to } = outcome {
            debug!(object_id = %book.object_id, %from, %to, "rewrote base URL");
            book.base_url = Some(Value::String(to.clone()));
        }

        book.uploader = Some(Pointer::user(&self.new_uploader));
        book.update_source = Some(BULK_UPDATE_SOURCE.to_string());
        book.acl = Some(transfer_write_access(
            book.acl.take(),
            &self.old_uploader,
            &self.new_uploader,
        ));

        Ok(outcome)
    }
}

/// Transfer every book of `old_uploader` to `new_uploader`, rewriting base
/// URLs, and return the number of books processed.
pub async fn migrate_ownership<S>(
    store: &S,
    master_key: &MasterKey,
    old_uploader: &str,
    new_uploader: &str,
) -> Result<usize, MigrateError>
where
    S: RecordStore + ?Sized,
{
    let report = OwnershipTransfer::new(old_uploader, new_uploader)
        .run(store, master_key)
        .await?;
    Ok(report.records_processed)
}
