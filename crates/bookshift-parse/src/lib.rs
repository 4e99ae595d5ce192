//! Parse Server client for bookshift.
//!
//! This crate provides access to the `books` and `_User` classes of a Parse
//! Server, behind the [`RecordStore`] trait so migrations can run against
//! either the REST API or an in-process store.
//!
//! ## Features
//!
//! - **HTTP Client**: REST client with master-key elevation and transient retry
//! - **Query**: Equality constraints compiled to Parse `where` clauses
//! - **ACL**: Parse access-control lists with Parse's grant/revoke semantics
//! - **Memory Store**: In-process store with the same query and privilege rules

mod acl;
mod client;
mod error;
pub mod memory;
mod query;
mod records;
mod store;
mod types;

pub use acl::{Acl, AclEntry};
pub use client::ParseClient;
pub use error::ParseError;
pub use memory::MemoryStore;
pub use query::Query;
pub use records::*;
pub use store::{MasterKey, Privilege, RecordStore};
pub use types::*;
