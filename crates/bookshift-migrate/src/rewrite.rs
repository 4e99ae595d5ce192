//! Base URL rewriting with structural-equivalence validation.
//!
//! A book's `baseUrl` may embed the uploader's display token as a
//! percent-encoded URL component, for example
//! `https://x/u/old%40example.com/file`. Rewriting swaps that component for
//! the new uploader's token and then proves nothing else moved: the old
//! token in the original and the new token in the result are both masked by
//! the same sentinel, and the masked strings must be byte-identical.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use uuid::Uuid;

use crate::error::{RewriteError, StructuralMismatch};

/// Characters left unescaped when encoding a URI component: alphanumerics
/// and `- _ . ! ~ * ' ( )`.
const URI_COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

const SENTINEL: &str = "{{IDENTITY_TOKEN}}";

/// Percent-encode a display token as a URI component.
pub fn encode_token(token: &str) -> String {
    utf8_percent_encode(token, URI_COMPONENT_ENCODE_SET).to_string()
}

/// A sentinel that occurs in neither string.
fn sentinel_for(original: &str, updated: &str) -> String {
    let mut sentinel = SENTINEL.to_string();
    while original.contains(&sentinel) || updated.contains(&sentinel) {
        sentinel = format!("{{{{{}}}}}", Uuid::new_v4().simple());
    }
    sentinel
}

/// Check that `updated` differs from `original` only by `old_encoded`
/// having become `new_encoded`.
///
/// The first occurrence of `old_encoded` in `original` and the first
/// occurrence of `new_encoded` in `updated` are masked with a common sentinel;
/// the masked forms must match exactly.
pub fn verify_structure(
    original: &str,
    updated: &str,
    old_encoded: &str,
    new_encoded: &str,
) -> Result<(), StructuralMismatch> {
    let sentinel = sentinel_for(original, updated);
    let original_masked = original.replacen(old_encoded, &sentinel, 1);
    let updated_masked = updated.replacen(new_encoded, &sentinel, 1);

    if original_masked == updated_masked {
        Ok(())
    } else {
        Err(StructuralMismatch {
            original: original.to_string(),
            updated: updated.to_string(),
            original_masked,
            updated_masked,
        })
    }
}

/// Replace the first occurrence of `old_encoded` with `new_encoded` and
/// verify the result with [`verify_structure`].
pub fn rewrite_encoded_token(
    original: &str,
    old_encoded: &str,
    new_encoded: &str,
) -> Result<String, StructuralMismatch> {
    let updated = original.replacen(old_encoded, new_encoded, 1);
    verify_structure(original, &updated, old_encoded, new_encoded)?;
    Ok(updated)
}

/// Outcome of rewriting one base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaseUrlChange {
    /// The encoded old token was replaced.
    Rewritten(String),
    /// Neither form of the old token occurs; the URL is left alone.
    Unmatched,
}

/// The old uploader's display token, and the encoded forms of both tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRewrite {
    old_token: String,
    old_encoded: String,
    new_encoded: String,
}

impl TokenRewrite {
    pub fn new(old_token: impl Into<String>, new_token: impl Into<String>) -> Self {
        let old_token = old_token.into();
        let new_token: String = new_token.into();
        Self {
            old_encoded: encode_token(&old_token),
            new_encoded: encode_token(&new_token),
            old_token,
        }
    }

    pub fn old_encoded(&self) -> &str {
        &self.old_encoded
    }

    /// Rewrite `base_url`.
    ///
    /// Fails when the encoded token occurs more than once, when only the
    /// unencoded token occurs, or when the rewrite fails the structural check.
    pub fn apply(&self, base_url: &str) -> Result<BaseUrlChange, RewriteError> {
        let occurrences = base_url.matches(self.old_encoded.as_str()).count();

        if occurrences > 1 {
            return Err(RewriteError::RepeatedToken {
                base_url: base_url.to_string(),
                token: self.old_encoded.clone(),
                occurrences,
            });
        }

        if occurrences == 1 {
            let updated = rewrite_encoded_token(base_url, &self.old_encoded, &self.new_encoded)?;
            return Ok(BaseUrlChange::Rewritten(updated));
        }

        if base_url.contains(self.old_token.as_str()) {
            return Err(RewriteError::UnsupportedEncoding {
                base_url: base_url.to_string(),
                token: self.old_token.clone(),
            });
        }

        Ok(BaseUrlChange::Unmatched)
    }
}
