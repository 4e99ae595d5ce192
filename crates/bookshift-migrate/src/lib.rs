//! Ownership-transfer migrations for bookshift.
//!
//! Reassigns every book uploaded by one user to another: the `uploader`
//! pointer, the provenance marker, write access, and the identity embedded in
//! each book's `baseUrl`. All work goes through a [`RecordStore`], so the same
//! code runs against Parse Server or [`bookshift_parse::MemoryStore`].
//!
//! ## Modules
//!
//! - **resolver**: user id to display token (email, else username)
//! - **rewrite**: percent-encoded token substitution with a structural check
//! - **selector**: id-keyed paging over equality queries
//! - **engine**: the ownership transfer itself
//! - **repair**: ACL repair for books transferred without ACL updates
//! - **migration**: named migrations with dry-run previews
//!
//! [`RecordStore`]: bookshift_parse::RecordStore

mod access;
pub mod engine;
mod error;
pub mod migration;
pub mod repair;
pub mod resolver;
pub mod rewrite;
pub mod selector;

pub use access::{transfer_write_access, write_access_transferred};
pub use engine::{BookTransfer, OwnershipTransfer, TransferReport, UrlOutcome, migrate_ownership};
pub use error::{MigrateError, ResolveError, RewriteError, Role, StructuralMismatch};
pub use migration::{Migration, MigrationPreview, MigrationResult, available_migrations};
pub use repair::{AclRepair, repair_acl};
pub use resolver::{display_token, resolve_display_token};
pub use rewrite::{BaseUrlChange, TokenRewrite, encode_token, rewrite_encoded_token};
pub use selector::{RecordCursor, select, uploader_query};
