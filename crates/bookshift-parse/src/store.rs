//! Record store abstraction.

use std::fmt;

use async_trait::async_trait;

use crate::{Book, ParseError, Query, User};

/// The Parse master key.
///
/// Holding one is the only way to build [`Privilege::Elevated`], which makes
/// every elevated call visible at its call site.
#[derive(Clone, PartialEq, Eq)]
pub struct MasterKey(String);

impl MasterKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    /// Elevated privilege backed by this key.
    pub fn elevated(&self) -> Privilege<'_> {
        Privilege::Elevated(self)
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}

/// Access mode for a single store call.
#[derive(Debug, Clone, Copy)]
pub enum Privilege<'a> {
    /// Normal per-object permission checks apply.
    Standard,
    /// Bypasses per-object permission checks.
    Elevated(&'a MasterKey),
}

impl Privilege<'_> {
    pub fn master_key(&self) -> Option<&MasterKey> {
        match self {
            Self::Standard => None,
            Self::Elevated(key) => Some(key),
        }
    }
}

/// The operations a migration needs from the store.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch one page of objects matching `query`, in ascending `objectId`
    /// order, restricted to ids strictly greater than `after`.
    async fn find(
        &self,
        query: &Query,
        after: Option<&str>,
        limit: u32,
        privilege: Privilege<'_>,
    ) -> Result<Vec<Book>, ParseError>;

    /// Fetch a user by id.
    async fn fetch_user(&self, user_id: &str, privilege: Privilege<'_>)
    -> Result<User, ParseError>;

    /// Persist the migrated fields of `book` (see [`Book::changes`]).
    async fn save(
        &self,
        class_name: &str,
        book: &Book,
        privilege: Privilege<'_>,
    ) -> Result<(), ParseError>;
}
