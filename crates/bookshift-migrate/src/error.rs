//! Error types for the migration engine.

use std::fmt;

use bookshift_parse::ParseError;
use thiserror::Error;

/// Which side of an ownership transfer an identity is on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    OldUploader,
    NewUploader,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OldUploader => f.write_str("old uploader"),
            Self::NewUploader => f.write_str("new uploader"),
        }
    }
}

/// Errors from resolving an identity to its display token.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Neither email nor username is set.
    #[error("user {user_id} has neither an email nor a username")]
    NoDisplayToken { user_id: String },

    /// The user could not be fetched.
    #[error("failed to fetch user: {0}")]
    Store(#[from] ParseError),
}

/// A base URL rewrite that changed more than the identity token.
///
/// Carries both URLs and both sentinel-masked forms so the divergence can be
/// read straight off the error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "base URL rewrite changed more than the identity token\n  \
     original:          {original}\n  \
     updated:           {updated}\n  \
     original (masked): {original_masked}\n  \
     updated (masked):  {updated_masked}"
)]
pub struct StructuralMismatch {
    pub original: String,
    pub updated: String,
    pub original_masked: String,
    pub updated_masked: String,
}

/// Why a base URL could not be rewritten.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    #[error(transparent)]
    Mismatch(#[from] StructuralMismatch),

    /// The display token appears without percent-encoding.
    #[error("base URL {base_url} contains unencoded token {token}")]
    UnsupportedEncoding { base_url: String, token: String },

    /// The encoded token appears more than once.
    #[error("base URL {base_url} contains encoded token {token} {occurrences} times")]
    RepeatedToken {
        base_url: String,
        token: String,
        occurrences: usize,
    },
}

/// Errors that abort a migration run.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// An identity's display token could not be determined.
    #[error("cannot determine display token for {role} {user_id}: {source}")]
    MissingDisplayToken {
        role: Role,
        user_id: String,
        #[source]
        source: ResolveError,
    },

    /// A base URL rewrite failed the structural-equivalence check.
    #[error("book {object_id}: {mismatch}")]
    StructuralMismatch {
        object_id: String,
        mismatch: StructuralMismatch,
    },

    /// A base URL embeds the identity without percent-encoding.
    #[error(
        "book {object_id}: base URL contains unencoded token {token}, refusing to rewrite: {base_url}"
    )]
    UnsupportedEncoding {
        object_id: String,
        base_url: String,
        token: String,
    },

    /// A base URL embeds the encoded identity more than once.
    #[error(
        "book {object_id}: base URL contains encoded token {token} {occurrences} times, refusing to rewrite: {base_url}"
    )]
    RepeatedToken {
        object_id: String,
        base_url: String,
        token: String,
        occurrences: usize,
    },

    /// Store-level failure.
    #[error("store error: {0}")]
    Store(#[from] ParseError),
}

impl MigrateError {
    /// Attach the record a rewrite failed on.
    pub(crate) fn rewrite(object_id: &str, error: RewriteError) -> Self {
        let object_id = object_id.to_string();
        match error {
            RewriteError::Mismatch(mismatch) => Self::StructuralMismatch {
                object_id,
                mismatch,
            },
            RewriteError::UnsupportedEncoding { base_url, token } => Self::UnsupportedEncoding {
                object_id,
                base_url,
                token,
            },
            RewriteError::RepeatedToken {
                base_url,
                token,
                occurrences,
            } => Self::RepeatedToken {
                object_id,
                base_url,
                token,
                occurrences,
            },
        }
    }
}
