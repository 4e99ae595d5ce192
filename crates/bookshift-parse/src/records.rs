//! Class names and field constants.

/// Parse class holding the migrated book records.
pub const BOOK_CLASS: &str = "books";

/// Parse's built-in user class.
pub const USER_CLASS: &str = "_User";

/// Value of `updateSource` stamped on every record touched by a migration.
pub const BULK_UPDATE_SOURCE: &str = "bulkUpdateScript";

/// ACL key granting permissions to everyone.
pub const PUBLIC_ACL_KEY: &str = "*";

/// Page size used when iterating query results.
pub const DEFAULT_PAGE_SIZE: u32 = 100;

// =============================================================================
// Field names
// =============================================================================

pub const OBJECT_ID_FIELD: &str = "objectId";
pub const UPLOADER_FIELD: &str = "uploader";
pub const UPDATE_SOURCE_FIELD: &str = "updateSource";
